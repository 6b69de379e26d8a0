// Search-engine metadata: per-page <head> tags, JSON-LD blocks, robots.txt
// and sitemap.xml.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::{config::Settings, format, models::Listing};

pub const SITE_DESCRIPTION: &str = "Find your perfect car from our extensive collection of premium vehicles. Browse, compare, and buy with confidence.";
pub const DEFAULT_OG_IMAGE: &str = "/static/og-image.jpg";
pub const TWITTER_HANDLE: &str = "@msmotor";

const DEFAULT_KEYWORDS: &[&str] = &[
    "cars",
    "car listings",
    "buy cars",
    "sell cars",
    "automotive",
    "vehicles",
    "used cars",
    "car marketplace",
    "MS Motor",
    "India",
];

// Paths crawlers are asked to stay out of
const PRIVATE_PATHS: &[&str] = &[
    "/api/",
    "/admin/",
    "/profile",
    "/my-listings",
    "/cars/new",
    "/login",
    "/register",
    "/_next/",
    "/private/",
];

#[derive(Debug, Clone, Copy)]
pub struct PageConfig {
    pub title: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub noindex: bool,
}

pub const HOME: PageConfig = PageConfig {
    title: "MS Motor - Premium Car Listings & Marketplace",
    description: "Find your perfect car from thousands of verified listings. Buy and sell cars with confidence on India's trusted automotive marketplace.",
    keywords: &["car marketplace", "buy cars online", "sell cars", "used cars India"],
    noindex: false,
};

pub const CARS: PageConfig = PageConfig {
    title: "Browse Cars - Find Your Perfect Vehicle",
    description: "Explore thousands of verified car listings. Filter by make, model, price, and location to find your ideal car.",
    keywords: &["browse cars", "car search", "find cars", "car listings"],
    noindex: false,
};

pub const LOGIN: PageConfig = PageConfig {
    title: "Login to Your Account",
    description: "Sign in to your MS Motor account to manage your car listings, save favorites, and access exclusive features.",
    keywords: &["login", "sign in", "account access"],
    noindex: true,
};

pub const REGISTER: PageConfig = PageConfig {
    title: "Create Your Account",
    description: "Join MS Motor today to list your car for sale, save your favorite listings, and connect with buyers and sellers.",
    keywords: &["register", "sign up", "create account"],
    noindex: true,
};

pub const PROFILE: PageConfig = PageConfig {
    title: "My Profile",
    description: "Manage your MS Motor profile, update your information, and customize your account settings.",
    keywords: &["profile", "account settings", "user profile"],
    noindex: true,
};

pub const MY_LISTINGS: PageConfig = PageConfig {
    title: "My Car Listings",
    description: "View and manage your car listings. Edit details, track views, and communicate with potential buyers.",
    keywords: &["my listings", "manage cars", "car dashboard"],
    noindex: true,
};

pub const SELL_CAR: PageConfig = PageConfig {
    title: "Sell Your Car - List for Free",
    description: "List your car for sale on MS Motor. Reach thousands of potential buyers with our easy-to-use listing platform.",
    keywords: &["sell car", "list car", "car for sale", "free listing"],
    noindex: false,
};

/// Everything the layout template puts in <head>.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub canonical: String,
    pub robots: &'static str,
    pub og_type: &'static str,
    pub og_image: String,
    pub og_image_alt: String,
    pub site_name: String,
    pub twitter_handle: &'static str,
    pub google_verification: Option<String>,
    // Serialized, script-safe JSON-LD blocks
    pub json_ld: Vec<String>,
}

impl PageMeta {
    pub fn for_page(settings: &Settings, config: &PageConfig, path: &str) -> Self {
        Self::build(settings, config.title, config.description, config.keywords, path, config.noindex)
    }

    pub fn build(
        settings: &Settings,
        title: &str,
        description: &str,
        keywords: &[&str],
        path: &str,
        noindex: bool,
    ) -> Self {
        let full_title = if title.contains(&settings.site_name) {
            title.to_string()
        } else {
            format!("{} | {}", title, settings.site_name)
        };
        let keywords = DEFAULT_KEYWORDS
            .iter()
            .chain(keywords)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        PageMeta {
            title: full_title,
            description: description.to_string(),
            keywords,
            canonical: settings.site_link(path),
            robots: if noindex { "noindex, nofollow" } else { "index, follow" },
            og_type: "website",
            og_image: absolute(settings, DEFAULT_OG_IMAGE),
            og_image_alt: title.to_string(),
            site_name: settings.site_name.clone(),
            twitter_handle: TWITTER_HANDLE,
            google_verification: settings.google_verification.clone(),
            json_ld: Vec::new(),
        }
    }

    /// Metadata for a listing's detail page: product Open Graph type, the
    /// first photo as preview image, Product and Car JSON-LD.
    pub fn for_listing(settings: &Settings, car: &Listing) -> Self {
        let title = format!("{} - {}", car.title(), format::currency(car.price));
        let keywords = [car.make.as_str(), car.model.as_str(), car.location.city.as_str(), "used car"];
        let mut meta = Self::build(settings, &title, &listing_description(car), &keywords, &car.detail_path(), false);
        meta.og_type = "product";
        if let Some(image) = car.primary_image() {
            meta.og_image = absolute(settings, &image.url);
        }
        let (name, path) = (car.title(), car.detail_path());
        meta.with_json_ld(product_json_ld(settings, car))
            .with_json_ld(car_json_ld(settings, car))
            .with_json_ld(breadcrumbs(
                settings,
                &[("Home", "/"), ("Cars", "/cars"), (name.as_str(), path.as_str())],
            ))
    }

    pub fn with_json_ld(mut self, block: Value) -> Self {
        self.json_ld.push(json_ld_script(block));
        self
    }
}

fn absolute(settings: &Settings, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        settings.site_link(url)
    }
}

// --- JSON-LD ---

/// Adds the schema.org context and serializes for an inline
/// `<script type="application/ld+json">`, with `</` escaped.
pub fn json_ld_script(mut block: Value) -> String {
    if let Value::Object(map) = &mut block {
        map.insert("@context".into(), json!("https://schema.org"));
    }
    block.to_string().replace("</", "<\\/")
}

pub fn organization(settings: &Settings) -> Value {
    json!({
        "@type": "Organization",
        "name": settings.site_name,
        "url": settings.site_url,
        "logo": settings.site_link("/static/logo.png"),
        "description": SITE_DESCRIPTION,
        "contactPoint": {
            "@type": "ContactPoint",
            "telephone": "+91-98765-43210",
            "contactType": "customer service",
            "availableLanguage": ["English", "Hindi"]
        },
        "sameAs": [
            "https://facebook.com/msmotor",
            "https://twitter.com/msmotor",
            "https://instagram.com/msmotor",
            "https://linkedin.com/company/msmotor"
        ]
    })
}

pub fn website(settings: &Settings) -> Value {
    json!({
        "@type": "WebSite",
        "name": settings.site_name,
        "url": settings.site_url,
        "description": SITE_DESCRIPTION,
        "potentialAction": {
            "@type": "SearchAction",
            "target": format!("{}/cars?search={{search_term_string}}", settings.site_url),
            "query-input": "required name=search_term_string"
        }
    })
}

pub fn local_business(settings: &Settings) -> Value {
    json!({
        "@type": "LocalBusiness",
        "@id": format!("{}/#organization", settings.site_url),
        "name": settings.site_name,
        "description": SITE_DESCRIPTION,
        "url": settings.site_url,
        "telephone": "+91-98765-43210",
        "email": "info@msmotor.com",
        "address": {
            "@type": "PostalAddress",
            "streetAddress": "Motor Street",
            "addressLocality": "Mumbai",
            "addressRegion": "Maharashtra",
            "postalCode": "400001",
            "addressCountry": "IN"
        },
        "geo": { "@type": "GeoCoordinates", "latitude": 19.0760, "longitude": 72.8777 },
        "openingHours": "Mo-Sa 09:00-18:00",
        "priceRange": "₹₹",
        "image": settings.site_link("/static/business-image.jpg")
    })
}

// `items` are (name, site path) pairs in order
pub fn breadcrumbs(settings: &Settings, items: &[(&str, &str)]) -> Value {
    let elements: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, (name, path))| {
            json!({
                "@type": "ListItem",
                "position": i + 1,
                "name": name,
                "item": settings.site_link(path)
            })
        })
        .collect();
    json!({ "@type": "BreadcrumbList", "itemListElement": elements })
}

fn default_description(car: &Listing) -> String {
    car.description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("{} for sale", car.title()))
}

pub fn product_json_ld(settings: &Settings, car: &Listing) -> Value {
    let availability = if car.status.is_available() {
        "https://schema.org/InStock"
    } else {
        "https://schema.org/OutOfStock"
    };
    let mut seller = json!({
        "@type": "Person",
        "name": car.seller.name,
        "telephone": car.seller.phone
    });
    if let Some(email) = &car.seller.email {
        seller["email"] = json!(email);
    }
    json!({
        "@type": "Product",
        "name": car.title(),
        "description": default_description(car),
        "brand": { "@type": "Brand", "name": car.make },
        "model": car.model,
        "productionDate": car.year.to_string(),
        "color": car.color,
        "fuelType": car.fuel_type.as_str(),
        "vehicleTransmission": car.transmission.as_str(),
        "bodyType": car.body_type.as_str(),
        "mileageFromOdometer": { "@type": "QuantitativeValue", "value": car.mileage, "unitCode": "KMT" },
        "offers": {
            "@type": "Offer",
            "price": car.price,
            "priceCurrency": "INR",
            "availability": availability,
            "seller": seller
        },
        "image": car.images.iter().map(|i| i.url.as_str()).collect::<Vec<_>>(),
        "url": settings.site_link(&car.detail_path())
    })
}

pub fn car_json_ld(settings: &Settings, car: &Listing) -> Value {
    json!({
        "@type": "Car",
        "name": car.title(),
        "description": default_description(car),
        "brand": { "@type": "Brand", "name": car.make },
        "model": car.model,
        "vehicleModelDate": car.year.to_string(),
        "mileageFromOdometer": { "@type": "QuantitativeValue", "value": car.mileage, "unitCode": "KMT" },
        "offers": {
            "@type": "Offer",
            "price": car.price,
            "priceCurrency": "INR",
            "availability": "https://schema.org/InStock",
            "seller": { "@type": "Person", "name": car.seller.name, "telephone": car.seller.phone }
        },
        "image": car.images.iter().map(|i| i.url.as_str()).collect::<Vec<_>>(),
        "url": settings.site_link(&car.detail_path()),
        "location": {
            "@type": "Place",
            "address": {
                "@type": "PostalAddress",
                "addressLocality": car.location.city,
                "addressRegion": car.location.state,
                "addressCountry": car.location.country
            }
        }
    })
}

pub fn listing_description(car: &Listing) -> String {
    format!(
        "{} for sale in {}, {}. Price: {}, Mileage: {} km, Fuel: {}. View details and contact seller.",
        car.title(),
        car.location.city,
        car.location.state,
        format::currency(car.price),
        format::number(car.mileage),
        format::capitalize(car.fuel_type.as_str()),
    )
}

// --- robots.txt ---

pub fn robots_txt(settings: &Settings) -> String {
    let mut out = String::new();
    for agent in ["*", "Googlebot"] {
        out.push_str(&format!("User-agent: {}\nAllow: /\n", agent));
        for path in PRIVATE_PATHS {
            out.push_str(&format!("Disallow: {}\n", path));
        }
        out.push('\n');
    }
    out.push_str(&format!("Host: {}\n", settings.site_url));
    out.push_str(&format!("Sitemap: {}\n", settings.site_link("/sitemap.xml")));
    out
}

// --- sitemap.xml ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Static routes first, then one entry per listing.
pub fn sitemap_entries(settings: &Settings, cars: &[Listing], now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let fixed = [
        ("/", ChangeFrequency::Daily, 1.0),
        ("/cars", ChangeFrequency::Hourly, 0.9),
        ("/cars/new", ChangeFrequency::Monthly, 0.8),
        ("/login", ChangeFrequency::Monthly, 0.3),
        ("/register", ChangeFrequency::Monthly, 0.3),
    ];
    let mut entries: Vec<SitemapEntry> = fixed
        .into_iter()
        .map(|(path, change_frequency, priority)| SitemapEntry {
            loc: settings.site_link(path),
            last_modified: now,
            change_frequency,
            priority,
        })
        .collect();

    entries.extend(cars.iter().map(|car| SitemapEntry {
        loc: settings.site_link(&car.detail_path()),
        last_modified: car.updated_at,
        change_frequency: ChangeFrequency::Weekly,
        priority: 0.7,
    }));
    entries
}

pub fn sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            escape_xml(&entry.loc),
            entry.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.change_frequency.as_str(),
            entry.priority,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
