// Data structures shared by the API client, controllers and page templates.
// Field names follow the backend's JSON (camelCase, Mongo-style `_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::slug;

// --- Listing enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
    Cng,
    Lpg,
}

impl FuelType {
    pub const ALL: [FuelType; 6] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Electric,
        FuelType::Hybrid,
        FuelType::Cng,
        FuelType::Lpg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
            FuelType::Electric => "electric",
            FuelType::Hybrid => "hybrid",
            FuelType::Cng => "cng",
            FuelType::Lpg => "lpg",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Electric => "Electric",
            FuelType::Hybrid => "Hybrid",
            FuelType::Cng => "CNG",
            FuelType::Lpg => "LPG",
        }
    }
}

impl FromStr for FuelType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("fuel type", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Manual,
    Automatic,
    Cvt,
}

impl Transmission {
    pub const ALL: [Transmission; 3] = [Transmission::Manual, Transmission::Automatic, Transmission::Cvt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transmission::Manual => "manual",
            Transmission::Automatic => "automatic",
            Transmission::Cvt => "cvt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Transmission::Manual => "Manual",
            Transmission::Automatic => "Automatic",
            Transmission::Cvt => "CVT",
        }
    }
}

impl FromStr for Transmission {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transmission::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("transmission", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Sedan,
    Hatchback,
    Suv,
    Coupe,
    Convertible,
    Wagon,
    Pickup,
    Van,
}

impl BodyType {
    pub const ALL: [BodyType; 8] = [
        BodyType::Sedan,
        BodyType::Hatchback,
        BodyType::Suv,
        BodyType::Coupe,
        BodyType::Convertible,
        BodyType::Wagon,
        BodyType::Pickup,
        BodyType::Van,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Sedan => "sedan",
            BodyType::Hatchback => "hatchback",
            BodyType::Suv => "suv",
            BodyType::Coupe => "coupe",
            BodyType::Convertible => "convertible",
            BodyType::Wagon => "wagon",
            BodyType::Pickup => "pickup",
            BodyType::Van => "van",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BodyType::Sedan => "Sedan",
            BodyType::Hatchback => "Hatchback",
            BodyType::Suv => "SUV",
            BodyType::Coupe => "Coupe",
            BodyType::Convertible => "Convertible",
            BodyType::Wagon => "Wagon",
            BodyType::Pickup => "Pickup",
            BodyType::Van => "Van",
        }
    }
}

impl FromStr for BodyType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodyType::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("body type", s))
    }
}

// Server-owned; never written by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Available,
    Sold,
    Reserved,
}

impl ListingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ListingStatus::Available => "Available",
            ListingStatus::Sold => "Sold",
            ListingStatus::Reserved => "Reserved",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ListingStatus::Available)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

// --- Listing ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Seller {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// One car for sale, as returned by `GET /api/cars` and `GET /api/cars/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub price: u64,
    pub mileage: u64, // kilometres
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub body_type: BodyType,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<CarImage>,
    pub location: Location,
    pub seller: Seller,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Listing {
    // "2020 Maruti Suzuki Swift"
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }

    pub fn slug(&self) -> Result<String, slug::SlugError> {
        slug::encode(&self.make, &self.model, self.year, &self.id)
    }

    /// Path of the listing's detail page. Identifiers that break the slug
    /// format fall back to the bare identifier.
    pub fn detail_path(&self) -> String {
        match self.slug() {
            Ok(slug) => format!("/cars/{}", slug),
            Err(e) => {
                tracing::warn!("Listing {} has no routable slug: {}", self.id, e);
                format!("/cars/{}", self.id)
            }
        }
    }

    pub fn primary_image(&self) -> Option<&CarImage> {
        self.images.first()
    }
}

// Body for `POST /api/cars` and `PUT /api/cars/{id}`; status and view count stay server-owned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub price: u64,
    pub mileage: u64,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub body_type: BodyType,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<CarImage>,
    pub location: Location,
    pub seller: Seller,
}

impl From<&Listing> for ListingDraft {
    fn from(listing: &Listing) -> Self {
        ListingDraft {
            make: listing.make.clone(),
            model: listing.model.clone(),
            year: listing.year,
            price: listing.price,
            mileage: listing.mileage,
            fuel_type: listing.fuel_type,
            transmission: listing.transmission,
            body_type: listing.body_type,
            color: listing.color.clone(),
            description: listing.description.clone(),
            features: listing.features.clone(),
            images: listing.images.clone(),
            location: listing.location.clone(),
            seller: listing.seller.clone(),
        }
    }
}

// --- Pagination ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Gap,
}

const PAGE_WINDOW_DELTA: u32 = 2; // pages shown on each side of the current one

impl Pagination {
    /// Page links for display: first page, the pages around the current one,
    /// the last page, with gaps where pages are skipped.
    pub fn page_window(&self) -> Vec<PageItem> {
        let page = self.page.max(1);
        let last = self.total_pages;
        let mut items = vec![PageItem::Page(1)];

        if page > PAGE_WINDOW_DELTA + 2 {
            items.push(PageItem::Gap);
        }

        let start = page.saturating_sub(PAGE_WINDOW_DELTA).max(2);
        let end = (page + PAGE_WINDOW_DELTA).min(last.saturating_sub(1));
        items.extend((start..=end).map(PageItem::Page));

        if page + PAGE_WINDOW_DELTA + 1 < last {
            items.push(PageItem::Gap);
            items.push(PageItem::Page(last));
        } else if last > 1 {
            items.push(PageItem::Page(last));
        }

        items
    }
}

// A page of results together with the server's pagination block
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

// --- Response envelope ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

// Uniform envelope every backend endpoint responds with
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<FieldError>>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub count: Option<u64>,
}

// --- Statistics ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_cars: u64,
    pub avg_price: f64,
    pub min_price: u64,
    pub max_price: u64,
    pub avg_year: f64,
    pub avg_mileage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeCount {
    #[serde(rename = "_id")]
    pub make: String,
    pub count: u64,
    pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelCount {
    #[serde(rename = "_id")]
    pub fuel_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarStats {
    pub overview: StatsOverview,
    #[serde(default)]
    pub top_makes: Vec<MakeCount>,
    #[serde(default)]
    pub fuel_type_distribution: Vec<FuelCount>,
}

// --- Users & auth ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "Member",
            Role::Admin => "Administrator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    // "First Last", trimmed; empty when neither name is set
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.profile.first_name.as_deref().unwrap_or(""),
            self.profile.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if full.is_empty() { self.username.clone() } else { full }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

// `GET /api/auth/me` and `PUT /api/auth/profile` answer either with the user or `{ user }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserPayload {
    Wrapped { user: User },
    Bare(User),
}

impl UserPayload {
    pub fn into_user(self) -> User {
        match self {
            UserPayload::Wrapped { user } => user,
            UserPayload::Bare(user) => user,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}
