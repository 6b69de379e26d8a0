// Loading the signed-in user's own listings.
//
// Two steps: ask the dedicated endpoint, and if that is unavailable, fetch a
// large page of all listings and keep the ones whose seller matches the user.
// A 401 is never papered over by the fallback; it ends the session.

use std::sync::Arc;

use crate::{
    api::CarsApi,
    error::ApiError,
    filters::CarFilters,
    models::{Listing, User},
};

pub const FALLBACK_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    DedicatedEndpoint,
    FilteredFallback,
}

#[derive(Debug, Clone)]
pub struct MyListings {
    pub cars: Vec<Listing>,
    pub source: ListingSource,
}

pub struct MyListingsStrategy {
    api: Arc<dyn CarsApi>,
}

impl MyListingsStrategy {
    pub fn new(api: Arc<dyn CarsApi>) -> Self {
        Self { api }
    }

    pub async fn load(&self, user: &User) -> Result<MyListings, ApiError> {
        match self.dedicated_endpoint().await {
            Ok(cars) => Ok(MyListings { cars, source: ListingSource::DedicatedEndpoint }),
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => {
                tracing::info!("[MY LISTINGS] dedicated endpoint unavailable ({}), filtering all listings", e);
                let cars = self.fetch_all_then_filter(|car| owned_by(car, user)).await?;
                Ok(MyListings { cars, source: ListingSource::FilteredFallback })
            }
        }
    }

    pub async fn dedicated_endpoint(&self) -> Result<Vec<Listing>, ApiError> {
        self.api.get_my_cars().await
    }

    pub async fn fetch_all_then_filter<P>(&self, predicate: P) -> Result<Vec<Listing>, ApiError>
    where
        P: Fn(&Listing) -> bool + Send,
    {
        let page = self.api.get_cars(&CarFilters::with_limit(FALLBACK_LIMIT)).await?;
        Ok(page.items.into_iter().filter(|car| predicate(car)).collect())
    }
}

/// Seller email equals the user's email, or seller name equals the username
/// or the user's (non-empty) full name.
pub fn owned_by(car: &Listing, user: &User) -> bool {
    if car.seller.email.as_deref() == Some(user.email.as_str()) {
        return true;
    }
    if car.seller.name == user.username {
        return true;
    }
    let full_name = user.full_name();
    !full_name.is_empty() && car.seller.name == full_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Page, tests::listing},
        session::tests::user,
        testing::FakeCarsApi,
    };

    fn sold_by(id: &str, name: &str, email: Option<&str>) -> Listing {
        let mut car = listing(id, "Hyundai", "Creta", 2021);
        car.seller.name = name.into();
        car.seller.email = email.map(str::to_string);
        car
    }

    fn all_listings() -> Page<Listing> {
        Page {
            items: vec![
                sold_by("mine1", "Someone", Some("asha@example.com")),
                sold_by("other", "Ravi", Some("ravi@example.com")),
                sold_by("mine2", "asha", None),
                sold_by("mine3", "Asha Rao", None),
                sold_by("blank", "", None),
            ],
            pagination: None,
        }
    }

    #[tokio::test]
    async fn prefers_the_dedicated_endpoint() {
        let api = Arc::new(FakeCarsApi::new());
        api.reply_mine(Ok(vec![listing("m1", "Kia", "Sonet", 2022)]));
        let result = MyListingsStrategy::new(api.clone()).load(&user()).await.unwrap();

        assert_eq!(result.source, ListingSource::DedicatedEndpoint);
        assert_eq!(result.cars.len(), 1);
        assert!(api.list_calls().is_empty());
    }

    #[tokio::test]
    async fn missing_endpoint_falls_back_to_filtering() {
        let api = Arc::new(FakeCarsApi::new());
        api.reply_mine(Err(ApiError::NotFound { server_message: None }));
        api.reply_list(Ok(all_listings()));
        let result = MyListingsStrategy::new(api.clone()).load(&user()).await.unwrap();

        assert_eq!(result.source, ListingSource::FilteredFallback);
        let ids: Vec<_> = result.cars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["mine1", "mine2", "mine3"]);
        assert_eq!(api.list_calls()[0].limit, Some(FALLBACK_LIMIT));
    }

    #[tokio::test]
    async fn server_errors_also_fall_back() {
        let api = Arc::new(FakeCarsApi::new());
        api.reply_mine(Err(ApiError::Http { status: 500, server_message: None }));
        api.reply_list(Ok(all_listings()));
        let result = MyListingsStrategy::new(api.clone()).load(&user()).await.unwrap();
        assert_eq!(result.source, ListingSource::FilteredFallback);
    }

    #[tokio::test]
    async fn unauthorized_does_not_fall_back() {
        let api = Arc::new(FakeCarsApi::new());
        api.reply_mine(Err(ApiError::Unauthorized { server_message: None }));
        let err = MyListingsStrategy::new(api.clone()).load(&user()).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(api.list_calls().is_empty());
    }

    #[tokio::test]
    async fn fallback_failure_is_reported() {
        let api = Arc::new(FakeCarsApi::new());
        api.reply_mine(Err(ApiError::NotFound { server_message: None }));
        api.reply_list(Err(ApiError::Network("refused".into())));
        let err = MyListingsStrategy::new(api.clone()).load(&user()).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(api.mine_calls(), 1);
    }

    #[test]
    fn blank_full_name_matches_nothing() {
        let mut anonymous_profile = user();
        anonymous_profile.profile.first_name = None;
        anonymous_profile.profile.last_name = None;
        anonymous_profile.username = "someone_else".into();
        anonymous_profile.email = "x@example.com".into();
        assert!(!owned_by(&sold_by("blank", "", None), &anonymous_profile));
    }
}
