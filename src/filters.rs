// Filter/query model for the listings endpoint.
//
// `CarFilters` is treated as a value: `update` returns a new model and never
// edits in place. Changing any constraint sends the user back to page 1,
// while `limit` and `sort` carry over.

use std::{collections::HashMap, fmt, str::FromStr};

use crate::models::{BodyType, FuelType, Transmission};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 12;

// --- Sort order ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Price,
    Year,
    Mileage,
}

impl SortField {
    fn wire_name(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::Price => "price",
            SortField::Year => "year",
            SortField::Mileage => "mileage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub const NEWEST_FIRST: SortOrder = SortOrder::new(SortField::CreatedAt, SortDirection::Descending);

    // In the order the sort select presents them
    pub const OPTIONS: [SortOrder; 8] = [
        SortOrder::NEWEST_FIRST,
        SortOrder::new(SortField::CreatedAt, SortDirection::Ascending),
        SortOrder::new(SortField::Price, SortDirection::Ascending),
        SortOrder::new(SortField::Price, SortDirection::Descending),
        SortOrder::new(SortField::Year, SortDirection::Ascending),
        SortOrder::new(SortField::Year, SortDirection::Descending),
        SortOrder::new(SortField::Mileage, SortDirection::Ascending),
        SortOrder::new(SortField::Mileage, SortDirection::Descending),
    ];

    /// Wire token understood by the backend: `price`, `-createdAt`, ...
    pub fn as_token(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.wire_name().to_string(),
            SortDirection::Descending => format!("-{}", self.field.wire_name()),
        }
    }

    pub fn label(&self) -> &'static str {
        use SortDirection::*;
        use SortField::*;
        match (self.field, self.direction) {
            (CreatedAt, Descending) => "Newest First",
            (CreatedAt, Ascending) => "Oldest First",
            (Price, Ascending) => "Price: Low to High",
            (Price, Descending) => "Price: High to Low",
            (Year, Ascending) => "Year: Old to New",
            (Year, Descending) => "Year: New to Old",
            (Mileage, Ascending) => "Mileage: Low to High",
            (Mileage, Descending) => "Mileage: High to Low",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::NEWEST_FIRST
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort token '{0}'")]
pub struct UnknownSortToken(String);

impl FromStr for SortOrder {
    type Err = UnknownSortToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::OPTIONS
            .into_iter()
            .find(|option| option.as_token() == s)
            .ok_or_else(|| UnknownSortToken(s.to_string()))
    }
}

// --- Filters ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarFilters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<SortOrder>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_year: Option<u16>,
    pub max_year: Option<u16>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub body_type: Option<BodyType>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub search: Option<String>,
}

impl CarFilters {
    pub fn with_limit(limit: u32) -> Self {
        CarFilters { limit: Some(limit), ..Default::default() }
    }

    /// Fills page, limit and sort where they are unset.
    pub fn with_defaults(&self) -> Self {
        CarFilters {
            page: Some(self.page.unwrap_or(DEFAULT_PAGE)),
            limit: Some(self.limit.unwrap_or(DEFAULT_LIMIT)),
            sort: Some(self.sort.unwrap_or_default()),
            ..self.clone()
        }
    }

    /// Merges `change` over this model. Touching any constraint resets the
    /// page to 1, even if `change` also names a page.
    pub fn update(&self, change: FilterUpdate) -> Self {
        let reset_page = change.touches_constraints();
        let mut next = self.clone();

        if let Some(page) = change.page {
            next.page = page;
        }
        if let Some(limit) = change.limit {
            next.limit = limit;
        }
        if let Some(sort) = change.sort {
            next.sort = sort;
        }
        if let Some(make) = change.make {
            next.make = make;
        }
        if let Some(model) = change.model {
            next.model = model;
        }
        if let Some(min_price) = change.min_price {
            next.min_price = min_price;
        }
        if let Some(max_price) = change.max_price {
            next.max_price = max_price;
        }
        if let Some(min_year) = change.min_year {
            next.min_year = min_year;
        }
        if let Some(max_year) = change.max_year {
            next.max_year = max_year;
        }
        if let Some(fuel_type) = change.fuel_type {
            next.fuel_type = fuel_type;
        }
        if let Some(transmission) = change.transmission {
            next.transmission = transmission;
        }
        if let Some(body_type) = change.body_type {
            next.body_type = body_type;
        }
        if let Some(city) = change.city {
            next.city = city;
        }
        if let Some(state) = change.state {
            next.state = state;
        }
        if let Some(search) = change.search {
            next.search = search;
        }

        if reset_page {
            next.page = Some(DEFAULT_PAGE);
        }
        next
    }

    /// Query parameters for `GET /api/cars`, in a stable order. Unset values
    /// and blank strings are left out entirely.
    pub fn serialize(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    params.push((key, v));
                }
            }
        };

        push("page", self.page.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("sort", self.sort.map(|s| s.as_token()));
        push("make", self.make.clone());
        push("model", self.model.clone());
        push("minPrice", self.min_price.map(|v| v.to_string()));
        push("maxPrice", self.max_price.map(|v| v.to_string()));
        push("minYear", self.min_year.map(|v| v.to_string()));
        push("maxYear", self.max_year.map(|v| v.to_string()));
        push("fuelType", self.fuel_type.map(|v| v.as_str().to_string()));
        push("transmission", self.transmission.map(|v| v.as_str().to_string()));
        push("bodyType", self.body_type.map(|v| v.as_str().to_string()));
        push("city", self.city.clone());
        push("state", self.state.clone());
        push("search", self.search.clone());
        params
    }

    /// Builds a model from the browse page's query string. Values that are
    /// blank or do not parse are ignored rather than rejected.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        fn text(query: &HashMap<String, String>, key: &str) -> Option<String> {
            query
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }
        fn parsed<T: FromStr>(query: &HashMap<String, String>, key: &str) -> Option<T> {
            text(query, key).and_then(|v| v.parse().ok())
        }

        CarFilters {
            page: parsed::<u32>(query, "page").filter(|p| *p > 0),
            limit: parsed::<u32>(query, "limit").filter(|l| *l > 0),
            sort: parsed(query, "sort"),
            make: text(query, "make"),
            model: text(query, "model"),
            min_price: parsed(query, "minPrice"),
            max_price: parsed(query, "maxPrice"),
            min_year: parsed(query, "minYear"),
            max_year: parsed(query, "maxYear"),
            fuel_type: parsed(query, "fuelType"),
            transmission: parsed(query, "transmission"),
            body_type: parsed(query, "bodyType"),
            city: text(query, "city"),
            state: text(query, "state"),
            search: text(query, "search"),
        }
    }

    pub fn has_constraints(&self) -> bool {
        self.make.is_some()
            || self.model.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.min_year.is_some()
            || self.max_year.is_some()
            || self.fuel_type.is_some()
            || self.transmission.is_some()
            || self.body_type.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.search.is_some()
    }

    // Browse-page link for another page of the same result set
    pub fn page_href(&self, page: u32) -> String {
        let next = self.update(FilterUpdate::new().page(page));
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(next.serialize())
            .finish();
        format!("/cars?{}", query)
    }

    pub fn sort_token(&self) -> String {
        self.sort.unwrap_or_default().as_token()
    }
}

// A partial change to `CarFilters`. The outer `Option` says whether the field
// is touched at all; the inner one is the new value (`None` clears it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterUpdate {
    page: Option<Option<u32>>,
    limit: Option<Option<u32>>,
    sort: Option<Option<SortOrder>>,
    make: Option<Option<String>>,
    model: Option<Option<String>>,
    min_price: Option<Option<u64>>,
    max_price: Option<Option<u64>>,
    min_year: Option<Option<u16>>,
    max_year: Option<Option<u16>>,
    fuel_type: Option<Option<FuelType>>,
    transmission: Option<Option<Transmission>>,
    body_type: Option<Option<BodyType>>,
    city: Option<Option<String>>,
    state: Option<Option<String>>,
    search: Option<Option<String>>,
}

impl FilterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(Some(page));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(Some(limit));
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(Some(sort));
        self
    }

    pub fn make(mut self, make: Option<&str>) -> Self {
        self.make = Some(make.map(str::to_string));
        self
    }

    pub fn model(mut self, model: Option<&str>) -> Self {
        self.model = Some(model.map(str::to_string));
        self
    }

    pub fn price_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self
    }

    pub fn year_range(mut self, min: Option<u16>, max: Option<u16>) -> Self {
        self.min_year = Some(min);
        self.max_year = Some(max);
        self
    }

    pub fn fuel_type(mut self, fuel_type: Option<FuelType>) -> Self {
        self.fuel_type = Some(fuel_type);
        self
    }

    pub fn transmission(mut self, transmission: Option<Transmission>) -> Self {
        self.transmission = Some(transmission);
        self
    }

    pub fn body_type(mut self, body_type: Option<BodyType>) -> Self {
        self.body_type = Some(body_type);
        self
    }

    pub fn city(mut self, city: Option<&str>) -> Self {
        self.city = Some(city.map(str::to_string));
        self
    }

    pub fn state(mut self, state: Option<&str>) -> Self {
        self.state = Some(state.map(str::to_string));
        self
    }

    pub fn search(mut self, search: Option<&str>) -> Self {
        self.search = Some(search.map(str::to_string));
        self
    }

    // Anything besides page/limit/sort
    pub fn touches_constraints(&self) -> bool {
        self.make.is_some()
            || self.model.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.min_year.is_some()
            || self.max_year.is_some()
            || self.fuel_type.is_some()
            || self.transmission.is_some()
            || self.body_type.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.search.is_some()
    }
}
