// Public pages: home, browse, listing detail, listing created

use std::collections::HashMap;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::{CarCard, Layout, SelectOption, cards, render};
use crate::{
    AppState,
    auth_middleware::Backend,
    error::{AppError, AppResult},
    fetch::{ListingController, ListingDetailController, ListingDetailState},
    filters::{CarFilters, FilterUpdate, SortOrder},
    format,
    models::{CarStats, Listing, PageItem, Pagination},
    my_listings::owned_by,
    seo::{self, PageMeta},
    slug,
};

pub const FEATURED_LIMIT: u32 = 6;

// --- Home ---

struct StatsView {
    total_cars: String,
    average_price: String,
    top_makes: Vec<String>,
}

impl From<CarStats> for StatsView {
    fn from(stats: CarStats) -> Self {
        StatsView {
            total_cars: format::number(stats.overview.total_cars),
            average_price: format::currency(stats.overview.avg_price.round() as u64),
            top_makes: stats.top_makes.into_iter().take(5).map(|m| m.make).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    layout: Layout,
    featured: Vec<CarCard>,
    featured_error: Option<String>,
    stats: Option<StatsView>,
}

pub async fn home(State(state): State<AppState>, backend: Backend) -> AppResult<Response> {
    tracing::info!("[HANDLER] home");
    let featured = ListingController::new(backend.cars(), CarFilters::with_limit(FEATURED_LIMIT).with_defaults());
    let (_, stats) = tokio::join!(featured.refetch(), backend.api.stats());
    let featured = featured.state();

    let stats = match stats {
        Ok(stats) => Some(StatsView::from(stats)),
        Err(e) => {
            tracing::debug!("[HANDLER] home - stats unavailable: {}", e);
            None
        }
    };

    let settings = &state.settings;
    let meta = PageMeta::for_page(settings, &seo::HOME, "/")
        .with_json_ld(seo::organization(settings))
        .with_json_ld(seo::website(settings))
        .with_json_ld(seo::local_business(settings));
    let template = HomeTemplate {
        layout: Layout::new(meta, backend.user().as_ref()),
        featured: cards(&featured.cars),
        featured_error: featured.error,
        stats,
    };
    let html = render(&template)?;
    Ok(backend.respond(html))
}

// --- Browse ---

pub struct PageLink {
    pub label: String,
    pub href: Option<String>,
    pub current: bool,
}

fn page_links(filters: &CarFilters, pagination: &Pagination) -> Vec<PageLink> {
    pagination
        .page_window()
        .into_iter()
        .map(|item| match item {
            PageItem::Page(n) => PageLink {
                label: n.to_string(),
                href: Some(filters.page_href(n)),
                current: n == pagination.page,
            },
            PageItem::Gap => PageLink { label: "…".into(), href: None, current: false },
        })
        .collect()
}

// The text inputs of the filter sidebar, as typed
struct FilterInputs {
    search: String,
    make: String,
    model: String,
    min_price: String,
    max_price: String,
    min_year: String,
    max_year: String,
    city: String,
    state: String,
}

impl From<&CarFilters> for FilterInputs {
    fn from(f: &CarFilters) -> Self {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }
        fn num<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }
        FilterInputs {
            search: text(&f.search),
            make: text(&f.make),
            model: text(&f.model),
            min_price: num(f.min_price),
            max_price: num(f.max_price),
            min_year: num(f.min_year),
            max_year: num(f.max_year),
            city: text(&f.city),
            state: text(&f.state),
        }
    }
}

#[derive(Template)]
#[template(path = "cars.html")]
struct BrowseTemplate {
    layout: Layout,
    inputs: FilterInputs,
    limit: u32,
    fuel_options: Vec<SelectOption>,
    transmission_options: Vec<SelectOption>,
    body_options: Vec<SelectOption>,
    sort_options: Vec<SelectOption>,
    cars: Vec<CarCard>,
    total: Option<String>,
    pages: Vec<PageLink>,
    prev_href: Option<String>,
    next_href: Option<String>,
    error: Option<String>,
    retry_href: String,
    empty: bool,
    has_constraints: bool,
    clear_href: String,
}

// Same sort and page size, no constraints
fn cleared(filters: &CarFilters) -> CarFilters {
    filters.update(
        FilterUpdate::new()
            .make(None)
            .model(None)
            .price_range(None, None)
            .year_range(None, None)
            .fuel_type(None)
            .transmission(None)
            .body_type(None)
            .city(None)
            .state(None)
            .search(None),
    )
}

pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    backend: Backend,
) -> AppResult<Response> {
    let filters = CarFilters::from_query(&query).with_defaults();
    tracing::info!("[HANDLER] browse - {:?}", filters.serialize());

    let controller = ListingController::new(backend.cars(), CarFilters::default().with_defaults());
    controller.update_filters(filters.clone()).await;
    let listing = controller.state();

    let pagination = listing.pagination.as_ref();
    let current_sort = filters.sort.unwrap_or_default();
    let template = BrowseTemplate {
        layout: Layout::new(
            PageMeta::for_page(&state.settings, &seo::CARS, "/cars"),
            backend.user().as_ref(),
        ),
        inputs: FilterInputs::from(&filters),
        limit: filters.limit.unwrap_or(crate::filters::DEFAULT_LIMIT),
        fuel_options: SelectOption::fuel_types(filters.fuel_type),
        transmission_options: SelectOption::transmissions(filters.transmission),
        body_options: SelectOption::body_types(filters.body_type),
        sort_options: SortOrder::OPTIONS
            .iter()
            .map(|option| SelectOption {
                value: option.as_token(),
                label: option.label().to_string(),
                selected: *option == current_sort,
            })
            .collect(),
        cars: cards(&listing.cars),
        total: pagination.map(|p| format::number(p.total)),
        pages: pagination.filter(|p| p.total_pages > 1).map(|p| page_links(&filters, p)).unwrap_or_default(),
        prev_href: pagination.filter(|p| p.has_prev).map(|p| filters.page_href(p.page.saturating_sub(1).max(1))),
        next_href: pagination.filter(|p| p.has_next).map(|p| filters.page_href(p.page + 1)),
        error: listing.error.clone(),
        retry_href: filters.page_href(filters.page.unwrap_or(1)),
        empty: listing.is_empty(),
        has_constraints: filters.has_constraints(),
        clear_href: cleared(&filters).page_href(1),
    };
    let html = render(&template)?;
    Ok(backend.respond(html))
}

// --- Detail ---

struct Spec {
    label: &'static str,
    value: String,
}

struct Photo {
    url: String,
    alt: String,
}

#[derive(Template)]
#[template(path = "car_detail.html")]
struct DetailTemplate {
    layout: Layout,
    title: String,
    price: String,
    status: &'static str,
    available: bool,
    location: String,
    posted: String,
    views: String,
    photos: Vec<Photo>,
    specs: Vec<Spec>,
    features: Vec<String>,
    description: Option<String>,
    seller_name: String,
    seller_phone: String,
    seller_email: Option<String>,
    edit_href: Option<String>,
}

impl DetailTemplate {
    fn new(layout: Layout, car: &Listing, is_owner: bool) -> Self {
        let title = car.title();
        let photos = car
            .images
            .iter()
            .enumerate()
            .map(|(i, image)| Photo {
                url: image.url.clone(),
                alt: image.alt.clone().unwrap_or_else(|| format!("{} photo {}", title, i + 1)),
            })
            .collect();
        DetailTemplate {
            layout,
            price: format::currency(car.price),
            status: car.status.label(),
            available: car.status.is_available(),
            location: format!("{}, {}, {}", car.location.city, car.location.state, car.location.country),
            posted: format::date(&car.created_at),
            views: format::number(car.view_count),
            photos,
            specs: vec![
                Spec { label: "Year", value: car.year.to_string() },
                Spec { label: "Mileage", value: format!("{} km", format::number(car.mileage)) },
                Spec { label: "Fuel Type", value: car.fuel_type.label().to_string() },
                Spec { label: "Transmission", value: car.transmission.label().to_string() },
                Spec { label: "Body Type", value: car.body_type.label().to_string() },
                Spec { label: "Color", value: car.color.clone() },
            ],
            features: car.features.clone(),
            description: car.description.clone().filter(|d| !d.trim().is_empty()),
            seller_name: car.seller.name.clone(),
            seller_phone: car.seller.phone.clone(),
            seller_email: car.seller.email.clone(),
            edit_href: is_owner.then(|| format!("/cars/edit/{}", car.id)),
            title,
        }
    }
}

#[derive(Template)]
#[template(path = "car_unavailable.html")]
struct UnavailableTemplate {
    layout: Layout,
    heading: &'static str,
    message: String,
    retry_href: Option<String>,
}

// Tries the id carried at the end of the slug first. Ids that contain hyphens
// themselves are linked by the bare id, so on a miss the whole segment is tried.
async fn load_detail(backend: &Backend, segment: &str) -> ListingDetailState {
    let id = slug::decode(segment).unwrap_or_default();
    let controller = ListingDetailController::new(backend.cars(), id);
    controller.refetch().await;
    let detail = controller.state();
    if !detail.not_found || id == segment {
        return detail;
    }
    tracing::debug!("[HANDLER] no listing '{}', retrying as '{}'", id, segment);
    let controller = ListingDetailController::new(backend.cars(), segment);
    controller.refetch().await;
    controller.state()
}

pub async fn car_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    backend: Backend,
) -> AppResult<Response> {
    tracing::info!("[HANDLER] car detail - {}", slug);
    let user = backend.user();
    let requested = format!("/cars/{}", slug);

    let detail = load_detail(&backend, &slug).await;

    let Some(car) = detail.listing else {
        let not_found = detail.not_found || detail.error.is_none();
        let template = UnavailableTemplate {
            layout: Layout::new(
                PageMeta::build(&state.settings, "Car Not Found", "This listing is no longer available.", &[], &requested, true),
                user.as_ref(),
            ),
            heading: if not_found { "Car Not Found" } else { "Could not load this car" },
            message: if not_found {
                "The car you are looking for does not exist or has been removed.".to_string()
            } else {
                detail.error.unwrap_or_default()
            },
            retry_href: (!not_found).then(|| requested.clone()),
        };
        let status = if not_found { StatusCode::NOT_FOUND } else { StatusCode::BAD_GATEWAY };
        let html = render(&template)?;
        return Ok(backend.respond((status, html)));
    };

    // Old or hand-typed slugs land on the canonical one
    let canonical = car.detail_path();
    if canonical != requested {
        return Ok(backend.respond(Redirect::permanent(&canonical)));
    }

    let is_owner = user.as_ref().is_some_and(|u| owned_by(&car, u));
    let layout = Layout::new(PageMeta::for_listing(&state.settings, &car), user.as_ref());
    let html = render(&DetailTemplate::new(layout, &car, is_owner))?;
    Ok(backend.respond(html))
}

// --- Listing created ---

#[derive(Debug, Deserialize)]
pub struct CreatedQuery {
    id: Option<String>,
    slug: Option<String>,
}

#[derive(Template)]
#[template(path = "car_success.html")]
struct SuccessTemplate {
    layout: Layout,
    view_href: Option<String>,
}

pub async fn listing_created(
    State(state): State<AppState>,
    Query(query): Query<CreatedQuery>,
    backend: Backend,
) -> AppResult<Response> {
    let view_href = query
        .slug
        .filter(|s| !s.is_empty())
        .or(query.id.filter(|id| !id.is_empty()))
        .map(|segment| format!("/cars/{}", segment));
    let meta = PageMeta::build(
        &state.settings,
        "Car Listed Successfully",
        "Your car listing is now live.",
        &[],
        "/cars/success",
        true,
    );
    let template = SuccessTemplate { layout: Layout::new(meta, backend.user().as_ref()), view_href };
    let html = render(&template)?;
    Ok(backend.respond(html))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    AppError::NotFound(format!("No page at {}", uri.path()))
}
