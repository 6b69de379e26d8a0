// Login, registration, logout and the profile page

use askama::Template;
use axum::{
    extract::{Form, Query, State},
    http::{StatusCode, Uri},
    response::{Redirect, Response},
};
use serde::Deserialize;

use super::{Layout, render};
use crate::{
    AppState,
    auth_middleware::{Backend, SignedIn},
    error::{AppError, AppResult},
    format,
    models::User,
    seo::{self, PageMeta},
    validation::{FieldErrors, LoginForm, PasswordForm, ProfileForm, RegisterForm},
};

/// Only same-site paths are followed after login; anything else goes home.
///
/// Browsers drop tabs and newlines from URLs, so a path with control
/// characters could still turn into `//host`. The target also has to be a
/// valid path-only URI so it fits in the `Location` header.
pub fn safe_redirect(target: Option<&str>) -> String {
    let Some(path) = target.map(str::trim) else {
        return "/".to_string();
    };
    let local = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && path.is_ascii()
        && !path.chars().any(char::is_control);
    let path_only = || {
        path.parse::<Uri>()
            .is_ok_and(|uri| uri.scheme().is_none() && uri.authority().is_none())
    };
    if local && path_only() { path.to_string() } else { "/".to_string() }
}

// --- Login ---

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    redirect: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    layout: Layout,
    email: String,
    redirect: String,
    errors: FieldErrors,
    banner: Option<String>,
}

impl LoginTemplate {
    fn new(state: &AppState, email: String, redirect: String, errors: FieldErrors, banner: Option<String>) -> Self {
        LoginTemplate {
            layout: Layout::new(PageMeta::for_page(&state.settings, &seo::LOGIN, "/login"), None),
            email,
            redirect,
            errors,
            banner,
        }
    }
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    backend: Backend,
) -> AppResult<Response> {
    let redirect = safe_redirect(query.redirect.as_deref());
    if backend.session().is_authenticated() {
        return Ok(backend.respond(Redirect::to(&redirect)));
    }
    let html = render(&LoginTemplate::new(&state, String::new(), redirect, FieldErrors::new(), None))?;
    Ok(backend.respond_unchecked(html))
}

pub async fn login(State(state): State<AppState>, backend: Backend, Form(form): Form<LoginForm>) -> AppResult<Response> {
    let redirect = safe_redirect(form.redirect.as_deref());
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let template = LoginTemplate::new(&state, form.email.clone(), redirect, errors, None);
            return Ok(backend.respond_unchecked((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)));
        }
    };

    match backend.api.login(&credentials).await {
        Ok(auth) => {
            tracing::info!("[HANDLER] login succeeded for {}", auth.user.username);
            Ok(backend.respond_unchecked(Redirect::to(&redirect)))
        }
        Err(e) => {
            tracing::warn!("[HANDLER] login failed for {}: {}", credentials.email, e);
            let template = LoginTemplate::new(&state, credentials.email, redirect, e.field_errors(), Some(e.user_message()));
            Ok(backend.respond_unchecked((StatusCode::UNAUTHORIZED, render(&template)?)))
        }
    }
}

// --- Registration ---

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    layout: Layout,
    form: RegisterForm,
    errors: FieldErrors,
    banner: Option<String>,
}

impl RegisterTemplate {
    fn new(state: &AppState, mut form: RegisterForm, errors: FieldErrors, banner: Option<String>) -> Self {
        // Never echo passwords back into the page
        form.password.clear();
        form.confirm_password.clear();
        RegisterTemplate {
            layout: Layout::new(PageMeta::for_page(&state.settings, &seo::REGISTER, "/register"), None),
            form,
            errors,
            banner,
        }
    }
}

pub async fn register_page(State(state): State<AppState>, backend: Backend) -> AppResult<Response> {
    if backend.session().is_authenticated() {
        return Ok(backend.respond(Redirect::to("/")));
    }
    let html = render(&RegisterTemplate::new(&state, RegisterForm::default(), FieldErrors::new(), None))?;
    Ok(backend.respond_unchecked(html))
}

pub async fn register(
    State(state): State<AppState>,
    backend: Backend,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => {
            let template = RegisterTemplate::new(&state, form, errors, None);
            return Ok(backend.respond_unchecked((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)));
        }
    };

    match backend.api.register(&registration).await {
        Ok(_) => Ok(backend.respond_unchecked(Redirect::to("/"))),
        Err(e) => {
            tracing::warn!("[HANDLER] registration failed: {}", e);
            let template = RegisterTemplate::new(&state, form, e.field_errors(), Some(e.user_message()));
            Ok(backend.respond_unchecked((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)))
        }
    }
}

pub async fn logout(backend: Backend) -> Response {
    if let Some(user) = backend.user() {
        tracing::info!("[HANDLER] {} signed out", user.username);
    }
    backend.api.logout();
    backend.respond_unchecked(Redirect::to("/"))
}

// --- Profile ---

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    updated: Option<String>,
    password: Option<String>,
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    layout: Layout,
    username: String,
    email: String,
    role: &'static str,
    member_since: Option<String>,
    form: ProfileForm,
    profile_errors: FieldErrors,
    password_errors: FieldErrors,
    banner: Option<String>,
    notice: Option<&'static str>,
}

impl ProfileTemplate {
    fn new(state: &AppState, user: &User, form: ProfileForm) -> Self {
        ProfileTemplate {
            layout: Layout::new(PageMeta::for_page(&state.settings, &seo::PROFILE, "/profile"), Some(user)),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.label(),
            member_since: user.created_at.as_ref().map(format::date),
            form,
            profile_errors: FieldErrors::new(),
            password_errors: FieldErrors::new(),
            banner: None,
            notice: None,
        }
    }
}

pub async fn profile_page(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Query(query): Query<ProfileQuery>,
) -> AppResult<Response> {
    // Refresh the cached profile; the cookie copy is good enough if this fails
    let user = match backend.api.me().await {
        Ok(fresh) => fresh,
        Err(e) if e.is_unauthorized() => return Err(AppError::SessionExpired),
        Err(e) => {
            tracing::warn!("[HANDLER] could not refresh profile: {}", e);
            user
        }
    };

    let mut template = ProfileTemplate::new(&state, &user, ProfileForm::from_user(&user));
    template.notice = if query.updated.is_some() {
        Some("Your profile has been updated.")
    } else if query.password.is_some() {
        Some("Your password has been changed.")
    } else {
        None
    };
    let html = render(&template)?;
    Ok(backend.respond(html))
}

pub async fn update_profile(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => {
            let mut template = ProfileTemplate::new(&state, &user, form);
            template.profile_errors = errors;
            return Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)));
        }
    };

    match backend.api.update_profile(&update).await {
        Ok(updated) => {
            tracing::info!("[HANDLER] {} updated their profile", updated.username);
            Ok(backend.respond(Redirect::to("/profile?updated=1")))
        }
        Err(e) if e.is_unauthorized() => Err(e.into()),
        Err(e) => {
            let mut template = ProfileTemplate::new(&state, &user, form);
            template.profile_errors = e.field_errors();
            template.banner = Some(e.user_message());
            Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)))
        }
    }
}

pub async fn change_password(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Form(form): Form<PasswordForm>,
) -> AppResult<Response> {
    let change = match form.validate() {
        Ok(change) => change,
        Err(errors) => {
            let mut template = ProfileTemplate::new(&state, &user, ProfileForm::from_user(&user));
            template.password_errors = errors;
            return Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)));
        }
    };

    match backend.api.change_password(&change).await {
        Ok(message) => {
            tracing::info!("[HANDLER] {} changed their password ({:?})", user.username, message);
            Ok(backend.respond(Redirect::to("/profile?password=1")))
        }
        Err(e) if e.is_unauthorized() => Err(e.into()),
        Err(e) => {
            let mut template = ProfileTemplate::new(&state, &user, ProfileForm::from_user(&user));
            template.password_errors = e.field_errors();
            template.banner = Some(e.user_message());
            Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::safe_redirect;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(safe_redirect(Some("/my-listings")), "/my-listings");
        assert_eq!(safe_redirect(Some("/cars?make=Kia")), "/cars?make=Kia");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/");
        assert_eq!(safe_redirect(None), "/");
    }

    #[test]
    fn control_characters_are_refused() {
        // A browser strips the tab and lands on //evil.example
        assert_eq!(safe_redirect(Some("/\t/evil.example")), "/");
        assert_eq!(safe_redirect(Some("/a\nb")), "/");
        assert_eq!(safe_redirect(Some("/a\r\nSet-Cookie: x=1")), "/");
        assert_eq!(safe_redirect(Some("/\u{7f}")), "/");
        assert_eq!(safe_redirect(Some("/cars?city=Pün")), "/");
    }
}
