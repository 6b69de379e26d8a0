// Crawler-facing documents

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{AppState, auth_middleware::Backend, filters::CarFilters, seo};

pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], seo::robots_txt(&state.settings))
}

/// Static routes plus one entry per listing; a backend failure only costs
/// the listing entries.
pub async fn sitemap(State(state): State<AppState>, backend: Backend) -> Response {
    let filters = CarFilters::with_limit(state.settings.sitemap_listing_limit);
    let cars = match backend.api.list_cars(&filters).await {
        Ok(page) => page.items,
        Err(e) => {
            tracing::warn!("[HANDLER] sitemap - listings unavailable: {}", e);
            Vec::new()
        }
    };
    let entries = seo::sitemap_entries(&state.settings, &cars, Utc::now());
    tracing::info!("[HANDLER] sitemap - {} entries", entries.len());
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], seo::sitemap_xml(&entries)).into_response()
}
