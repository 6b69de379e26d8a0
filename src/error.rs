// Error types: `ApiError` for calls to the backend REST API, `AppError` for
// page handlers (converted into HTTP responses).

use std::collections::HashMap;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use thiserror::Error;

use crate::{models::FieldError, session};

pub const GENERIC_MESSAGE: &str = "An unexpected error occurred. Please try again.";
pub const NETWORK_MESSAGE: &str = "Unable to connect to server. Please check your internet connection.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

// Everything a backend call can fail with
#[derive(Debug, Error)]
pub enum ApiError {
    // No response received (connection refused, DNS, reset, ...)
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    // 401; the session has already been cleared when this is returned
    #[error("authentication required")]
    Unauthorized { server_message: Option<String> },
    #[error("resource not found")]
    NotFound { server_message: Option<String> },
    // 400/422 carrying field-level detail
    #[error("validation failed ({status})")]
    Validation {
        status: u16,
        server_message: Option<String>,
        field_errors: Vec<FieldError>,
    },
    #[error("HTTP {status}")]
    Http { status: u16, server_message: Option<String> },
    // 2xx response whose envelope says `success: false` or carries no data
    #[error("request was not successful")]
    Rejected { message: Option<String> },
    #[error("unreadable response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { status, .. } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }

    fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { server_message }
            | ApiError::NotFound { server_message }
            | ApiError::Validation { server_message, .. }
            | ApiError::Http { server_message, .. } => server_message.as_deref(),
            ApiError::Rejected { message } => message.as_deref(),
            _ => None,
        }
        .filter(|m| !m.trim().is_empty())
    }

    /// Human-readable message: the server's own message, else the fixed text
    /// for the status, else the raw error text, else a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => return NETWORK_MESSAGE.to_string(),
            ApiError::Timeout => return TIMEOUT_MESSAGE.to_string(),
            _ => {}
        }
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        if let Some(status) = self.status() {
            return status_message(status);
        }
        match self {
            ApiError::Decode(raw) if !raw.trim().is_empty() => raw.clone(),
            _ => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Per-field messages for highlighting form inputs. Empty unless this is
    /// a validation failure.
    pub fn field_errors(&self) -> HashMap<String, String> {
        match self {
            ApiError::Validation { field_errors, .. } => field_errors
                .iter()
                .map(|e| (e.field.clone(), e.message.clone()))
                .collect(),
            _ => HashMap::new(),
        }
    }
}

// Fallback text per HTTP status when the server sent no message
pub fn status_message(status: u16) -> String {
    match status {
        400 => "Invalid request. Please check your input.".to_string(),
        401 => "Authentication failed. Please log in again.".to_string(),
        403 => "You do not have permission to perform this action.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        409 => "A conflict occurred. The resource may already exist.".to_string(),
        413 => "File too large. Please use a smaller file.".to_string(),
        422 => "Validation failed. Please check your input.".to_string(),
        429 => "Too many requests. Please try again later.".to_string(),
        500 => "Internal server error. Please try again later.".to_string(),
        502 => "Server is temporarily unavailable. Please try again later.".to_string(),
        503 => "Service is temporarily unavailable. Please try again later.".to_string(),
        s if s >= 500 => "The server encountered an error. Please try again later.".to_string(),
        s => format!("An error occurred ({}). Please try again.", s),
    }
}

// --- Page-level errors ---

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    NotFound(String),
    // Backend answered 401: drop the stored session and send the user to log in
    SessionExpired,
    // Anonymous visitor on a page that needs a session
    LoginRequired { return_to: String },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

impl From<askama::Error> for AppError {
    fn from(error: askama::Error) -> Self {
        AppError::InternalServerError(anyhow::Error::new(error).context("Failed to render template"))
    }
}

impl From<ApiError> for AppError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. } => AppError::SessionExpired,
            ApiError::NotFound { server_message } => {
                AppError::NotFound(server_message.unwrap_or_else(|| status_message(404)))
            }
            other => AppError::InternalServerError(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InternalServerError(e) => {
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (StatusCode::INTERNAL_SERVER_ERROR, error_page("Something went wrong", GENERIC_MESSAGE)).into_response()
            }
            AppError::NotFound(message) => {
                tracing::info!("Not found: {}", message);
                (StatusCode::NOT_FOUND, error_page("Not found", &message)).into_response()
            }
            AppError::SessionExpired => {
                tracing::warn!("Backend rejected the session token; clearing session cookies");
                let jar = session::remove_cookies(CookieJar::new());
                (jar, Redirect::to("/login")).into_response()
            }
            AppError::LoginRequired { return_to } => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("redirect", &return_to)
                    .finish();
                Redirect::to(&format!("/login?{}", query)).into_response()
            }
        }
    }
}

// Standalone page: no layout, so it renders even when the site templates can't
#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    title: &'a str,
    message: &'a str,
}

const FALLBACK_PAGE: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Error</title></head>\
     <body><h1>Something went wrong</h1><p><a href=\"/\">Go home</a></p></body></html>";

fn error_page(title: &str, message: &str) -> Html<String> {
    match (ErrorTemplate { title, message }).render() {
        Ok(html) => Html(html),
        Err(e) => {
            tracing::error!("Failed to render error page: {}", e);
            Html(FALLBACK_PAGE.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
