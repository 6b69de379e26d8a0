// Signed-in pages for managing one's own listings: create, edit, list, delete

use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Redirect, Response},
};
use serde::Deserialize;

use super::{CarCard, Layout, SelectOption, cards, render};
use crate::{
    AppState,
    auth_middleware::SignedIn,
    error::{AppError, AppResult},
    models::{Listing, User},
    my_listings::{ListingSource, MyListingsStrategy},
    seo::{self, PageMeta},
    validation::{CarForm, FieldErrors},
};

// --- Create / edit ---

#[derive(Template)]
#[template(path = "car_form.html")]
struct CarFormTemplate {
    layout: Layout,
    heading: String,
    intro: &'static str,
    action: String,
    submit_label: &'static str,
    form: CarForm,
    errors: FieldErrors,
    banner: Option<String>,
    year_options: Vec<SelectOption>,
    fuel_options: Vec<SelectOption>,
    transmission_options: Vec<SelectOption>,
    body_options: Vec<SelectOption>,
}

enum FormMode<'a> {
    Create,
    Edit(&'a str),
}

impl CarFormTemplate {
    fn new(
        state: &AppState,
        user: &User,
        mode: FormMode<'_>,
        form: CarForm,
        errors: FieldErrors,
        banner: Option<String>,
    ) -> Self {
        let (meta, heading, intro, action, submit_label) = match mode {
            FormMode::Create => (
                PageMeta::for_page(&state.settings, &seo::SELL_CAR, "/cars/new"),
                "Sell Your Car".to_string(),
                "Fill in the details below to list your car for sale.",
                "/cars/new".to_string(),
                "Create Listing",
            ),
            FormMode::Edit(id) => (
                PageMeta::build(
                    &state.settings,
                    "Edit Listing",
                    "Update the details of your car listing.",
                    &[],
                    &format!("/cars/edit/{}", id),
                    true,
                ),
                format!("Edit {} {}", form.make, form.model).trim().to_string(),
                "Update the details of your listing and save your changes.",
                format!("/cars/edit/{}", id),
                "Save Changes",
            ),
        };
        CarFormTemplate {
            layout: Layout::new(meta, Some(user)),
            heading,
            intro,
            action,
            submit_label,
            year_options: SelectOption::years(form.year.trim().parse().ok()),
            fuel_options: SelectOption::fuel_types(form.fuel_type.parse().ok()),
            transmission_options: SelectOption::transmissions(form.transmission.parse().ok()),
            body_options: SelectOption::body_types(form.body_type.parse().ok()),
            form,
            errors,
            banner,
        }
    }
}

pub async fn new_listing(State(state): State<AppState>, SignedIn { backend, user }: SignedIn) -> AppResult<Response> {
    tracing::info!("[HANDLER] new listing form for {}", user.username);
    let form = CarForm::for_user(Some(&user));
    let html = render(&CarFormTemplate::new(&state, &user, FormMode::Create, form, FieldErrors::new(), None))?;
    Ok(backend.respond(html))
}

fn success_href(car: &Listing) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("id", &car.id);
    if let Ok(slug) = car.slug() {
        query.append_pair("slug", &slug);
    }
    format!("/cars/success?{}", query.finish())
}

pub async fn create_listing(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Form(form): Form<CarForm>,
) -> AppResult<Response> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            let template = CarFormTemplate::new(&state, &user, FormMode::Create, form, errors, None);
            return Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)));
        }
    };

    match backend.api.create_car(&draft).await {
        Ok(car) => {
            tracing::info!("[HANDLER] {} listed car {}", user.username, car.id);
            Ok(backend.respond(Redirect::to(&success_href(&car))))
        }
        Err(e) if e.is_unauthorized() => Err(e.into()),
        Err(e) => {
            let template =
                CarFormTemplate::new(&state, &user, FormMode::Create, form, e.field_errors(), Some(e.user_message()));
            Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)))
        }
    }
}

pub async fn edit_listing(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Path(id): Path<String>,
) -> AppResult<Response> {
    tracing::info!("[HANDLER] edit listing {}", id);
    let car = backend.api.car(&id).await?;
    let form = CarForm::from_listing(&car);
    let html = render(&CarFormTemplate::new(&state, &user, FormMode::Edit(&id), form, FieldErrors::new(), None))?;
    Ok(backend.respond(html))
}

pub async fn update_listing(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Path(id): Path<String>,
    Form(form): Form<CarForm>,
) -> AppResult<Response> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            let template = CarFormTemplate::new(&state, &user, FormMode::Edit(&id), form, errors, None);
            return Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)));
        }
    };

    match backend.api.update_car(&id, &draft).await {
        Ok(car) => {
            tracing::info!("[HANDLER] {} updated car {}", user.username, car.id);
            Ok(backend.respond(Redirect::to(&car.detail_path())))
        }
        Err(e) if e.is_unauthorized() || e.is_not_found() => Err(e.into()),
        Err(e) => {
            let template =
                CarFormTemplate::new(&state, &user, FormMode::Edit(&id), form, e.field_errors(), Some(e.user_message()));
            Ok(backend.respond((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?)))
        }
    }
}

// --- My listings ---

#[derive(Debug, Default, Deserialize)]
pub struct MyListingsQuery {
    deleted: Option<String>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "my_listings.html")]
struct MyListingsTemplate {
    layout: Layout,
    cars: Vec<CarCard>,
    error: Option<String>,
    notice: Option<&'static str>,
    action_error: Option<String>,
    from_fallback: bool,
}

pub async fn my_listings(
    State(state): State<AppState>,
    SignedIn { backend, user }: SignedIn,
    Query(query): Query<MyListingsQuery>,
) -> AppResult<Response> {
    tracing::info!("[HANDLER] my listings for {}", user.username);
    let strategy = MyListingsStrategy::new(backend.cars());
    let (cars, error, from_fallback) = match strategy.load(&user).await {
        Ok(mine) => (mine.cars, None, mine.source == ListingSource::FilteredFallback),
        Err(e) if e.is_unauthorized() => return Err(AppError::SessionExpired),
        Err(e) => {
            tracing::warn!("[HANDLER] my listings failed: {}", e);
            (Vec::new(), Some(e.user_message()), false)
        }
    };

    let template = MyListingsTemplate {
        layout: Layout::new(PageMeta::for_page(&state.settings, &seo::MY_LISTINGS, "/my-listings"), Some(&user)),
        cars: cards(&cars),
        error,
        notice: query.deleted.is_some().then_some("Your listing has been deleted."),
        action_error: query.error.filter(|e| !e.trim().is_empty()),
        from_fallback,
    };
    let html = render(&template)?;
    Ok(backend.respond(html))
}

pub async fn delete_listing(SignedIn { backend, user }: SignedIn, Path(id): Path<String>) -> AppResult<Response> {
    match backend.api.delete_car(&id).await {
        Ok(()) => {
            tracing::info!("[HANDLER] {} deleted car {}", user.username, id);
            Ok(backend.respond(Redirect::to("/my-listings?deleted=1")))
        }
        Err(e) if e.is_unauthorized() => Err(e.into()),
        Err(e) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("error", &e.user_message())
                .finish();
            Ok(backend.respond(Redirect::to(&format!("/my-listings?{}", query))))
        }
    }
}

