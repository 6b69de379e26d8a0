// --- Request extractors ---
//
// `Backend` gives a handler an API client bound to the visitor's session
// (restored from cookies). `SignedIn` additionally requires a session and
// sends anonymous visitors to the login page.

use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    api::{ApiClient, CarsApi},
    error::AppError,
    models::User,
    session::Session,
};

pub struct Backend {
    pub api: ApiClient,
    jar: CookieJar,
    secure_cookies: bool,
}

impl Backend {
    pub fn session(&self) -> &Arc<Session> {
        self.api.session()
    }

    pub fn user(&self) -> Option<User> {
        self.session().user()
    }

    // The listing reads as a trait object, for the fetch controllers
    pub fn cars(&self) -> Arc<dyn CarsApi> {
        Arc::new(self.api.clone())
    }

    /// Finishes a request: writes any session change back to the cookies, or
    /// turns the response into a trip to the login page if the backend
    /// rejected the token along the way.
    pub fn respond(self, body: impl IntoResponse) -> Response {
        let session = Arc::clone(self.session());
        if session.was_cleared() && !session.is_authenticated() {
            return AppError::SessionExpired.into_response();
        }
        let jar = session.persist(self.jar, self.secure_cookies);
        (jar, body).into_response()
    }

    /// Like `respond`, for the login, registration and logout flows where an
    /// emptied session is the expected outcome.
    pub fn respond_unchecked(self, body: impl IntoResponse) -> Response {
        let session = Arc::clone(self.session());
        let jar = session.persist(self.jar, self.secure_cookies);
        (jar, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Backend
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let session = Arc::new(Session::from_cookies(&jar));
        let api = ApiClient::new(app_state.http_client.clone(), app_state.api_base.clone(), session);

        Ok(Backend { api, jar, secure_cookies: app_state.settings.secure_cookies })
    }
}

pub struct SignedIn {
    pub backend: Backend,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let return_to = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let backend = match Backend::from_request_parts(parts, state).await {
            Ok(backend) => backend,
            Err(never) => match never {},
        };

        if !backend.session().is_authenticated() {
            tracing::info!("[AUTH] anonymous request for {}, sending to login", return_to);
            return Err(AppError::LoginRequired { return_to });
        }

        // The profile cookie can be missing or unreadable while the token is fine
        let user = match backend.user() {
            Some(user) => user,
            None => backend.api.me().await?,
        };
        Ok(SignedIn { backend, user })
    }
}
