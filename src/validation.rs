// HTML form inputs and their validation.
//
// Forms arrive as plain strings. `validate` either builds the typed request
// body for the backend or returns per-field messages keyed the same way the
// backend keys its own field errors (`price`, `seller.phone`, ...), so both
// can be shown beside the same inputs.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::models::{
    BodyType, CarImage, FuelType, Listing, ListingDraft, Location, LoginCredentials, PasswordChange,
    ProfileUpdate, Registration, Seller, Transmission, User, UserProfile,
};

pub type FieldErrors = HashMap<String, String>;

pub const MIN_YEAR: i32 = 1990;
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+]?[\d\s\-()]{10,15}$").expect("valid regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

// Newest selectable model year
pub fn max_year() -> i32 {
    Utc::now().year() + 1
}

#[derive(Default)]
struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn fail(&mut self, field: &str, message: &str) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.to_string());
    }

    fn required<'a>(&mut self, field: &str, value: &'a str, message: &str) -> &'a str {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, message);
        }
        value
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.errors.is_empty() { Ok(value()) } else { Err(self.errors) }
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// --- Car listing ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarForm {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub mileage: String,
    #[serde(default)]
    pub fuel_type: String,
    #[serde(default)]
    pub transmission: String,
    #[serde(default)]
    pub body_type: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    // Comma separated
    #[serde(default)]
    pub features: String,
    // One URL per line
    #[serde(default)]
    pub images: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_phone: String,
    #[serde(default)]
    pub seller_email: String,
}

impl CarForm {
    /// A blank form for a new listing, seller details taken from the user.
    pub fn for_user(user: Option<&User>) -> Self {
        let mut form = CarForm {
            year: Utc::now().year().to_string(),
            fuel_type: FuelType::Petrol.as_str().into(),
            transmission: Transmission::Manual.as_str().into(),
            body_type: BodyType::Sedan.as_str().into(),
            country: "India".into(),
            ..Default::default()
        };
        if let Some(user) = user {
            form.seller_name = user.display_name();
            form.seller_email = user.email.clone();
            form.seller_phone = user.profile.phone.clone().unwrap_or_default();
        }
        form
    }

    pub fn from_listing(car: &Listing) -> Self {
        CarForm {
            make: car.make.clone(),
            model: car.model.clone(),
            year: car.year.to_string(),
            price: car.price.to_string(),
            mileage: car.mileage.to_string(),
            fuel_type: car.fuel_type.as_str().into(),
            transmission: car.transmission.as_str().into(),
            body_type: car.body_type.as_str().into(),
            color: car.color.clone(),
            description: car.description.clone().unwrap_or_default(),
            features: car.features.join(", "),
            images: car.images.iter().map(|i| i.url.as_str()).collect::<Vec<_>>().join("\n"),
            city: car.location.city.clone(),
            state: car.location.state.clone(),
            country: car.location.country.clone(),
            seller_name: car.seller.name.clone(),
            seller_phone: car.seller.phone.clone(),
            seller_email: car.seller.email.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ListingDraft, FieldErrors> {
        let mut check = Checker::default();

        let make = check.required("make", &self.make, "Make is required");
        let model = check.required("model", &self.model, "Model is required");
        let color = check.required("color", &self.color, "Color is required");
        let city = check.required("location.city", &self.city, "City is required");
        let state = check.required("location.state", &self.state, "State is required");
        let seller_name = check.required("seller.name", &self.seller_name, "Seller name is required");

        let year = match self.year.trim() {
            "" => {
                check.fail("year", "Year is required");
                None
            }
            raw => match raw.parse::<u16>() {
                Ok(y) if (MIN_YEAR..=max_year()).contains(&i32::from(y)) => Some(y),
                _ => {
                    check.fail("year", &format!("Year must be between {} and {}", MIN_YEAR, max_year()));
                    None
                }
            },
        };

        let price = match self.price.trim() {
            "" => {
                check.fail("price", "Price is required");
                None
            }
            raw => match raw.parse::<u64>() {
                Ok(p) if p >= 1 => Some(p),
                _ => {
                    check.fail("price", "Price must be greater than 0");
                    None
                }
            },
        };

        let mileage = match self.mileage.trim() {
            "" => {
                check.fail("mileage", "Mileage is required");
                None
            }
            raw => match raw.parse::<u64>() {
                Ok(m) => Some(m),
                Err(_) => {
                    check.fail("mileage", "Mileage cannot be negative");
                    None
                }
            },
        };

        let fuel_type = self.fuel_type.parse::<FuelType>().ok();
        if fuel_type.is_none() {
            check.fail("fuelType", "Fuel type is required");
        }
        let transmission = self.transmission.parse::<Transmission>().ok();
        if transmission.is_none() {
            check.fail("transmission", "Transmission is required");
        }
        let body_type = self.body_type.parse::<BodyType>().ok();
        if body_type.is_none() {
            check.fail("bodyType", "Body type is required");
        }

        let phone = check.required("seller.phone", &self.seller_phone, "Phone number is required");
        if !phone.is_empty() && !is_valid_phone(phone) {
            check.fail("seller.phone", "Please enter a valid phone number");
        }
        let seller_email = optional(&self.seller_email);
        if seller_email.as_deref().is_some_and(|e| !is_valid_email(e)) {
            check.fail("seller.email", "Please enter a valid email address");
        }

        let (make, model, color) = (make.to_string(), model.to_string(), color.to_string());
        let location = Location {
            city: city.to_string(),
            state: state.to_string(),
            country: optional(&self.country).unwrap_or_else(|| "India".into()),
        };
        let seller = Seller { name: seller_name.to_string(), phone: phone.to_string(), email: seller_email };

        check.finish(|| ListingDraft {
            make,
            model,
            // Only reached when every parse above succeeded
            year: year.unwrap_or_default(),
            price: price.unwrap_or_default(),
            mileage: mileage.unwrap_or_default(),
            fuel_type: fuel_type.unwrap_or(FuelType::Petrol),
            transmission: transmission.unwrap_or(Transmission::Manual),
            body_type: body_type.unwrap_or(BodyType::Sedan),
            color,
            description: optional(&self.description),
            features: split_features(&self.features),
            images: split_images(&self.images),
            location,
            seller,
        })
    }
}

// Trimmed, non-empty, first occurrence wins
pub fn split_features(raw: &str) -> Vec<String> {
    let mut features: Vec<String> = Vec::new();
    for feature in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if !features.iter().any(|f| f == feature) {
            features.push(feature.to_string());
        }
    }
    features
}

pub fn split_images(raw: &str) -> Vec<CarImage> {
    raw.lines()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| CarImage { url: url.to_string(), alt: None })
        .collect()
}

// --- Auth ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginCredentials, FieldErrors> {
        let mut check = Checker::default();
        let email = check.required("email", &self.email, "Email is required");
        if !email.is_empty() && !is_valid_email(email) {
            check.fail("email", "Please enter a valid email address");
        }
        if self.password.is_empty() {
            check.fail("password", "Password is required");
        }
        check.finish(|| LoginCredentials { email: email.to_string(), password: self.password.clone() })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut check = Checker::default();
        let username = check.required("username", &self.username, "Username is required");
        let email = check.required("email", &self.email, "Email is required");
        if !email.is_empty() && !is_valid_email(email) {
            check.fail("email", "Please enter a valid email address");
        }
        check_new_password(&mut check, "password", &self.password, &self.confirm_password);
        let phone = optional(&self.phone);
        if phone.as_deref().is_some_and(|p| !is_valid_phone(p)) {
            check.fail("profile.phone", "Please enter a valid phone number");
        }

        check.finish(|| Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: self.password.clone(),
            profile: UserProfile {
                first_name: optional(&self.first_name),
                last_name: optional(&self.last_name),
                phone,
            },
        })
    }
}

fn check_new_password(check: &mut Checker, field: &str, password: &str, confirm: &str) {
    if password.is_empty() {
        check.fail(field, "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        check.fail(field, &format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
    } else if password != confirm {
        check.fail("confirmPassword", "Passwords do not match");
    }
}

// --- Profile ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        ProfileForm {
            first_name: user.profile.first_name.clone().unwrap_or_default(),
            last_name: user.profile.last_name.clone().unwrap_or_default(),
            phone: user.profile.phone.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ProfileUpdate, FieldErrors> {
        let mut check = Checker::default();
        let first_name = check.required("profile.firstName", &self.first_name, "First name is required");
        let last_name = check.required("profile.lastName", &self.last_name, "Last name is required");
        let phone = optional(&self.phone);
        if phone.as_deref().is_some_and(|p| !is_valid_phone(p)) {
            check.fail("profile.phone", "Please enter a valid phone number");
        }
        check.finish(|| ProfileUpdate {
            profile: UserProfile {
                first_name: Some(first_name.to_string()),
                last_name: Some(last_name.to_string()),
                phone,
            },
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl PasswordForm {
    pub fn validate(&self) -> Result<PasswordChange, FieldErrors> {
        let mut check = Checker::default();
        if self.current_password.is_empty() {
            check.fail("currentPassword", "Current password is required");
        }
        check_new_password(&mut check, "newPassword", &self.new_password, &self.confirm_password);
        check.finish(|| PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}
