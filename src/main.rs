use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, extract::FromRef};
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::config::Settings;

// Declare modules
mod api;
mod auth_middleware;
mod config;
mod error;
mod fetch;
mod filters;
mod format;
mod models;
mod my_listings;
mod routes;
mod seo;
mod session;
mod slug;
mod validation;

#[cfg(test)]
mod testing;

const USER_AGENT: &str = concat!("car_market_web/", env!("CARGO_PKG_VERSION"));

// Shared by every handler; the per-visitor session lives in cookies, not here
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    http_client: Client,
    api_base: Url,
}

impl AppState {
    fn new(settings: Settings) -> Result<Self> {
        let api_base = Url::parse(&settings.api_url)
            .with_context(|| format!("Invalid api_url in configuration: '{}'", settings.api_url))?;
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout())
            .build()
            .context("Failed to build shared reqwest client")?;
        Ok(AppState { settings: Arc::new(settings), http_client, api_base })
    }
}

fn app(app_state: AppState) -> Router {
    routes::create_router(app_state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "car_market_web=info,tower_http=info".into()))
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing car marketplace server...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully (backend: {}, site: {}).", s.api_url, s.site_url);
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let addr: SocketAddr = settings
        .server_address
        .parse()
        .with_context(|| format!("Invalid server address format: {}", settings.server_address))?;

    let app_state = AppState::new(settings)?;
    tracing::info!("Shared HTTP client created.");

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app(app_state).into_make_service()).await?;

    Ok(())
}
