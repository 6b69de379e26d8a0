// Settings loaded once at startup: defaults, then an optional config.toml,
// then APP_* environment variables (e.g. APP_API_URL, APP_SITE_URL).

use std::time::Duration;

use anyhow::Result;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Base URL of the listings/auth REST backend
    pub api_url: String,
    // Public URL of this site, used for canonical links, JSON-LD and the sitemap
    pub site_url: String,
    pub site_name: String,
    pub server_address: String,
    pub request_timeout_secs: u64,
    pub google_verification: Option<String>,
    // Mark session cookies `Secure` (enable behind HTTPS)
    pub secure_cookies: bool,
    pub sitemap_listing_limit: u32,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Self::defaults()?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").try_parsing(true));

        Self::from_builder(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("api_url", "http://localhost:3001")?
            .set_default("site_url", "http://localhost:3000")?
            .set_default("site_name", "MS Motor")?
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("request_timeout_secs", 10)?
            .set_default("secure_cookies", false)?
            .set_default("sitemap_listing_limit", 1000)?)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.api_url = settings.api_url.trim_end_matches('/').to_string();
        settings.site_url = settings.site_url.trim_end_matches('/').to_string();
        settings.google_verification = settings.google_verification.filter(|v| !v.trim().is_empty());
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    // Absolute URL on the public site for a path such as "/cars"
    pub fn site_link(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            self.site_url.clone()
        } else {
            format!("{}{}", self.site_url, path)
        }
    }
}
