// Route definitions and the view data shared by page templates

use askama::Template;
use axum::{
    Router,
    response::Html,
    routing::{get, post},
};
use chrono::{Datelike, Utc};

use crate::{
    AppState,
    error::{AppError, AppResult},
    format,
    models::{BodyType, FuelType, Listing, Transmission, User},
    seo::PageMeta,
    validation,
};

mod auth;
mod listings;
mod pages;
mod site;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/cars", get(pages::browse))
        .route("/cars/new", get(listings::new_listing).post(listings::create_listing))
        .route("/cars/success", get(pages::listing_created))
        .route("/cars/edit/:id", get(listings::edit_listing).post(listings::update_listing))
        .route("/cars/:slug", get(pages::car_detail))
        .route("/my-listings", get(listings::my_listings))
        .route("/my-listings/:id/delete", post(listings::delete_listing))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile_page).post(auth::update_profile))
        .route("/profile/password", post(auth::change_password))
        .route("/robots.txt", get(site::robots))
        .route("/sitemap.xml", get(site::sitemap))
        .fallback(pages::not_found)
        .with_state(app_state)
}

pub(crate) fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Failed to render template: {}", e);
        AppError::from(e)
    })
}

// --- View data ---

/// The parts of every page that come from the layout: <head> metadata and
/// the navigation bar.
pub struct Layout {
    pub meta: PageMeta,
    pub signed_in_as: Option<String>,
    pub year: i32,
}

impl Layout {
    pub fn new(meta: PageMeta, user: Option<&User>) -> Self {
        Layout { meta, signed_in_as: user.map(User::display_name), year: Utc::now().year() }
    }
}

pub struct CarCard {
    pub id: String,
    pub href: String,
    pub title: String,
    pub price: String,
    pub mileage: String,
    pub fuel: &'static str,
    pub transmission: &'static str,
    pub location: String,
    pub image: Option<String>,
    pub image_alt: String,
    pub status: &'static str,
    pub available: bool,
    pub views: u64,
    pub posted: String,
}

impl From<&Listing> for CarCard {
    fn from(car: &Listing) -> Self {
        let title = car.title();
        CarCard {
            id: car.id.clone(),
            href: car.detail_path(),
            price: format::currency(car.price),
            mileage: format!("{} km", format::number(car.mileage)),
            fuel: car.fuel_type.label(),
            transmission: car.transmission.label(),
            location: format!("{}, {}", car.location.city, car.location.state),
            image: car.primary_image().map(|i| i.url.clone()),
            image_alt: car
                .primary_image()
                .and_then(|i| i.alt.clone())
                .unwrap_or_else(|| title.clone()),
            status: car.status.label(),
            available: car.status.is_available(),
            views: car.view_count,
            posted: format::relative_time(&car.created_at),
            title,
        }
    }
}

pub fn cards(cars: &[Listing]) -> Vec<CarCard> {
    cars.iter().map(CarCard::from).collect()
}

pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn list<T: Copy + PartialEq>(
        all: &[T],
        current: Option<T>,
        value: impl Fn(T) -> &'static str,
        label: impl Fn(T) -> &'static str,
    ) -> Vec<SelectOption> {
        all.iter()
            .map(|item| SelectOption {
                value: value(*item).to_string(),
                label: label(*item).to_string(),
                selected: current == Some(*item),
            })
            .collect()
    }

    pub fn fuel_types(current: Option<FuelType>) -> Vec<SelectOption> {
        Self::list(&FuelType::ALL, current, |f| f.as_str(), |f| f.label())
    }

    pub fn transmissions(current: Option<Transmission>) -> Vec<SelectOption> {
        Self::list(&Transmission::ALL, current, |t| t.as_str(), |t| t.label())
    }

    pub fn body_types(current: Option<BodyType>) -> Vec<SelectOption> {
        Self::list(&BodyType::ALL, current, |b| b.as_str(), |b| b.label())
    }

    // Newest model year first
    pub fn years(current: Option<u16>) -> Vec<SelectOption> {
        (validation::MIN_YEAR..=validation::max_year())
            .rev()
            .map(|year| SelectOption {
                value: year.to_string(),
                label: year.to_string(),
                selected: current.is_some_and(|c| i32::from(c) == year),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
