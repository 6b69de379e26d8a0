// Session context: the bearer token, refresh token and cached user profile.
//
// One `Session` is built per incoming request from the browser's cookies and
// injected into the API client, which reads the token before every backend
// call. Writers are login/registration (`establish`), profile edits
// (`update_user`) and logout or a backend 401 (`clear`).

use std::sync::{
    PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::models::{AuthResponse, User};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const USER_COOKIE: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
}

#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<Option<SessionData>>,
    cleared: AtomicBool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_data(data: SessionData) -> Self {
        Session { state: RwLock::new(Some(data)), cleared: AtomicBool::new(false) }
    }

    /// Restores the session stored in the browser. A missing access token
    /// means anonymous; an unreadable user cookie is dropped, not fatal.
    pub fn from_cookies(jar: &CookieJar) -> Self {
        let Some(access_token) = jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
        else {
            return Self::anonymous();
        };

        let refresh_token = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());
        let user = jar.get(USER_COOKIE).and_then(|c| match decode_user(c.value()) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Discarding unreadable user cookie: {}", e);
                None
            }
        });

        Self::from_data(SessionData { access_token, refresh_token, user })
    }

    // --- readers ---

    pub fn access_token(&self) -> Option<String> {
        self.read(|state| state.as_ref().map(|s| s.access_token.clone()))
    }

    pub fn user(&self) -> Option<User> {
        self.read(|state| state.as_ref().and_then(|s| s.user.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.is_some())
    }

    // True once `clear` has run during this request
    pub fn was_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }

    // --- writers ---

    pub fn establish(&self, auth: &AuthResponse) {
        self.write(Some(SessionData {
            access_token: auth.access_token.clone(),
            refresh_token: Some(auth.refresh_token.clone()),
            user: Some(auth.user.clone()),
        }));
        self.cleared.store(false, Ordering::SeqCst);
    }

    pub fn update_user(&self, user: User) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(data) = guard.as_mut() {
            data.user = Some(user);
        }
    }

    pub fn clear(&self) {
        self.write(None);
        self.cleared.store(true, Ordering::SeqCst);
    }

    /// Writes the current session into the cookie jar, or removes the
    /// session cookies when there is none.
    pub fn persist(&self, jar: CookieJar, secure: bool) -> CookieJar {
        let Some(data) = self.read(|state| state.clone()) else {
            return remove_cookies(jar);
        };

        let mut jar = jar.add(session_cookie(ACCESS_TOKEN_COOKIE, data.access_token, secure));
        jar = match data.refresh_token {
            Some(token) => jar.add(session_cookie(REFRESH_TOKEN_COOKIE, token, secure)),
            None => jar.add(removal_cookie(REFRESH_TOKEN_COOKIE)),
        };
        match data.user.as_ref().map(encode_user) {
            Some(Ok(encoded)) => jar.add(session_cookie(USER_COOKIE, encoded, secure)),
            Some(Err(e)) => {
                tracing::warn!("Could not serialize user for the session cookie: {}", e);
                jar
            }
            None => jar.add(removal_cookie(USER_COOKIE)),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Option<SessionData>) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, value: Option<SessionData>) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = value;
    }
}

// Expires every session cookie in the browser
pub fn remove_cookies(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE))
        .add(removal_cookie(USER_COOKIE))
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

// Added explicitly (rather than `CookieJar::remove`) so the removal is sent
// even when the request did not carry the cookie.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}

fn encode_user(user: &User) -> Result<String, serde_json::Error> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(user)?))
}

fn decode_user(value: &str) -> anyhow::Result<User> {
    let bytes = URL_SAFE_NO_PAD.decode(value)?;
    Ok(serde_json::from_slice(&bytes)?)
}
