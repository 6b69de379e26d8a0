// Client for the marketplace REST backend (`/api/cars`, `/api/auth`).
//
// Every call reads the bearer token from the injected `Session` right before
// sending, and every response is normalized through the `{ success, data,
// message, errors, pagination }` envelope into `Result<_, ApiError>`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, header::ACCEPT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    error::ApiError,
    filters::CarFilters,
    models::{
        ApiResponse, AuthResponse, CarStats, Listing, ListingDraft, LoginCredentials, Page,
        PasswordChange, ProfileUpdate, Registration, User, UserPayload,
    },
    session::Session,
};

/// The listing reads the fetch controllers depend on.
#[async_trait]
pub trait CarsApi: Send + Sync {
    async fn get_cars(&self, filters: &CarFilters) -> Result<Page<Listing>, ApiError>;
    async fn get_car(&self, id: &str) -> Result<Listing, ApiError>;
    async fn get_my_cars(&self) -> Result<Vec<Listing>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(http: Client, base_url: Url, session: Arc<Session>) -> Self {
        Self { http, base_url, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // --- cars ---

    pub async fn list_cars(&self, filters: &CarFilters) -> Result<Page<Listing>, ApiError> {
        let request = self.request(Method::GET, &["api", "cars"]).query(&filters.serialize());
        let envelope = self.execute::<Vec<Listing>>(request, "list cars").await?;
        let pagination = envelope.pagination;
        let items = require_data(envelope)?;
        Ok(Page { items, pagination })
    }

    pub async fn car(&self, id: &str) -> Result<Listing, ApiError> {
        let request = self.request(Method::GET, &["api", "cars", id]);
        require_data(self.execute(request, "get car").await?)
    }

    pub async fn create_car(&self, draft: &ListingDraft) -> Result<Listing, ApiError> {
        let request = self.request(Method::POST, &["api", "cars"]).json(draft);
        require_data(self.execute(request, "create car").await?)
    }

    pub async fn update_car(&self, id: &str, draft: &ListingDraft) -> Result<Listing, ApiError> {
        let request = self.request(Method::PUT, &["api", "cars", id]).json(draft);
        require_data(self.execute(request, "update car").await?)
    }

    pub async fn delete_car(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &["api", "cars", id]);
        self.execute::<serde_json::Value>(request, "delete car").await?;
        Ok(())
    }

    pub async fn my_cars(&self) -> Result<Vec<Listing>, ApiError> {
        let request = self.request(Method::GET, &["api", "cars", "my-listings"]);
        require_data(self.execute(request, "my listings").await?)
    }

    pub async fn stats(&self) -> Result<CarStats, ApiError> {
        let request = self.request(Method::GET, &["api", "cars", "stats"]);
        require_data(self.execute(request, "car stats").await?)
    }

    // --- auth ---

    // Successful registration and login both start a session
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let request = self.request(Method::POST, &["api", "auth", "register"]).json(registration);
        let auth: AuthResponse = require_data(self.execute(request, "register").await?)?;
        self.session.establish(&auth);
        tracing::info!("Registered and signed in user {}", auth.user.username);
        Ok(auth)
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let request = self.request(Method::POST, &["api", "auth", "login"]).json(credentials);
        let auth: AuthResponse = require_data(self.execute(request, "login").await?)?;
        self.session.establish(&auth);
        tracing::info!("Signed in user {}", auth.user.username);
        Ok(auth)
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let request = self.request(Method::GET, &["api", "auth", "me"]);
        let user = require_data::<UserPayload>(self.execute(request, "current user").await?)?.into_user();
        self.session.update_user(user.clone());
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let request = self.request(Method::PUT, &["api", "auth", "profile"]).json(update);
        let user = require_data::<UserPayload>(self.execute(request, "update profile").await?)?.into_user();
        self.session.update_user(user.clone());
        Ok(user)
    }

    // Returns the server's confirmation message, if any
    pub async fn change_password(&self, change: &PasswordChange) -> Result<Option<String>, ApiError> {
        let request = self.request(Method::PUT, &["api", "auth", "password"]).json(change);
        let envelope = self.execute::<serde_json::Value>(request, "change password").await?;
        Ok(envelope.message)
    }

    // --- plumbing ---

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.endpoint(segments))
            .header(ACCEPT, "application/json");
        // Read at send time so a logout or 401 earlier in the request is honoured
        match self.session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        tracing::debug!("[API] {} - sending request", operation);
        let response = request.send().await.map_err(|e| {
            let err = transport_error(e);
            tracing::error!("[API] {} - no response: {}", operation, err);
            err
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            if body.is_empty() {
                // 204 and friends: nothing to unwrap
                return Ok(ApiResponse {
                    success: true,
                    message: None,
                    data: None,
                    errors: None,
                    pagination: None,
                    count: None,
                });
            }
            let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
                tracing::error!("[API] {} - undecodable {} response: {}", operation, status, e);
                ApiError::Decode(e.to_string())
            })?;
            if !envelope.success {
                tracing::warn!("[API] {} - backend reported failure: {:?}", operation, envelope.message);
                return Err(ApiError::Rejected { message: envelope.message });
            }
            tracing::debug!("[API] {} - {}", operation, status);
            return Ok(envelope);
        }

        // Error bodies usually follow the envelope; anything else is treated as message-less
        let error_body = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body).ok();
        let server_message = error_body.as_ref().and_then(|b| b.message.clone());
        let field_errors = error_body.and_then(|b| b.errors).unwrap_or_default();

        let err = match status.as_u16() {
            401 => {
                self.session.clear();
                ApiError::Unauthorized { server_message }
            }
            404 => ApiError::NotFound { server_message },
            code @ (400 | 422) if !field_errors.is_empty() => ApiError::Validation {
                status: code,
                server_message,
                field_errors,
            },
            code => ApiError::Http { status: code, server_message },
        };

        if err.is_server_error() {
            tracing::error!("[API] {} - {}: {}", operation, status, err.user_message());
        } else {
            tracing::warn!("[API] {} - {}: {}", operation, status, err.user_message());
        }
        Err(err)
    }
}

#[async_trait]
impl CarsApi for ApiClient {
    async fn get_cars(&self, filters: &CarFilters) -> Result<Page<Listing>, ApiError> {
        self.list_cars(filters).await
    }

    async fn get_car(&self, id: &str) -> Result<Listing, ApiError> {
        self.car(id).await
    }

    async fn get_my_cars(&self) -> Result<Vec<Listing>, ApiError> {
        self.my_cars().await
    }
}

fn require_data<T>(envelope: ApiResponse<T>) -> Result<T, ApiError> {
    envelope
        .data
        .ok_or(ApiError::Rejected { message: envelope.message })
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}
