// Whole-router tests against a mocked backend

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use http_body_util::BodyExt;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header as header_is, method, path, query_param},
};

use super::create_router;
use crate::{
    AppState,
    config::tests::settings_for,
    models::tests::listing_json,
    session::{Session, tests::auth_response},
};

fn router(server: &MockServer) -> Router {
    let settings = settings_for(&server.uri());
    create_router(AppState {
        api_base: Url::parse(&settings.api_url).unwrap(),
        settings: Arc::new(settings),
        http_client: Client::new(),
    })
}

// Cookie header of a browser that signed in earlier
fn signed_in_cookies() -> String {
    let session = Session::anonymous();
    session.establish(&auth_response());
    session
        .persist(CookieJar::new(), false)
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_signed_in(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, signed_in_cookies())
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, body: &str, cookies: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn select<'a>(document: &'a Html, selector: &str) -> Vec<scraper::ElementRef<'a>> {
    document.select(&Selector::parse(selector).unwrap()).collect()
}

fn text_of(document: &Html, selector: &str) -> String {
    select(document, selector)
        .first()
        .map(|e| e.text().collect::<String>())
        .unwrap_or_default()
}

fn location(response: &Response) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn envelope(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

fn listing_page(cars: Vec<Value>, total: u64, total_pages: u32) -> Value {
    json!({
        "success": true,
        "count": cars.len(),
        "data": cars,
        "pagination": {
            "page": 1, "limit": 12, "total": total, "totalPages": total_pages,
            "hasNext": total_pages > 1, "hasPrev": false
        }
    })
}

// --- Browse ---

#[tokio::test]
async fn browse_renders_results_and_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .and(query_param("make", "Honda"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            vec![listing_json("c1", "Honda", "City", 2019), listing_json("c2", "Honda", "Amaze", 2021)],
            37,
            4,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/cars?make=Honda")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(select(&document, ".car-card").len(), 2);
    assert!(text_of(&document, ".result-count").contains("37"));
    assert_eq!(select(&document, "input[name=make]")[0].value().attr("value"), Some("Honda"));

    let next = select(&document, "a[rel=next]");
    let href = next[0].value().attr("href").unwrap();
    assert!(href.contains("page=2"));
    assert!(href.contains("make=Honda"));
    assert_eq!(select(&document, ".clear-filters").len(), 1);
}

#[tokio::test]
async fn browse_shows_the_backend_failure_with_a_retry_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/cars?city=Pune")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    assert!(text_of(&document, ".alert.error").contains("Service is temporarily unavailable"));
    assert!(select(&document, ".car-card").is_empty());
    let retry = select(&document, ".alert.error a")[0].value().attr("href").unwrap();
    assert!(retry.contains("city=Pune"));
}

#[tokio::test]
async fn browse_without_matches_offers_to_clear_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(vec![], 0, 0)))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/cars?fuelType=electric")).await.unwrap();
    let document = Html::parse_document(&body_text(response).await);
    assert!(text_of(&document, ".empty h2").contains("No cars found"));
    assert!(text_of(&document, ".empty").contains("Clear all filters"));
}

// --- Home ---

#[tokio::test]
async fn home_survives_missing_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .and(query_param("limit", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            vec![listing_json("c1", "Tata", "Nexon", 2022)],
            1,
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cars/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(select(&document, ".featured .car-card").len(), 1);
    assert!(select(&document, ".stats").is_empty());
    // Organization, WebSite and AutoDealer blocks
    assert_eq!(select(&document, "script[type=\"application/ld+json\"]").len(), 3);
}

// --- Detail ---

#[tokio::test]
async fn detail_page_renders_the_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(listing_json("abc123", "Maruti Suzuki", "Swift", 2020))),
        )
        .mount(&server)
        .await;

    let response = router(&server)
        .oneshot(get("/cars/2020-maruti-suzuki-swift-abc123"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(text_of(&document, "h1"), "2020 Maruti Suzuki Swift");
    assert_eq!(text_of(&document, ".summary .price"), "₹5,50,000");
    assert!(text_of(&document, ".seller").contains("Asha"));
    let canonical = select(&document, "link[rel=canonical]")[0].value().attr("href").unwrap();
    assert_eq!(canonical, "https://msmotor.example/cars/2020-maruti-suzuki-swift-abc123");
    let og_type = select(&document, "meta[property=\"og:type\"]")[0].value().attr("content");
    assert_eq!(og_type, Some("product"));
    // Anonymous visitors get no edit link
    assert!(text_of(&document, ".summary").find("Edit Listing").is_none());
}

#[tokio::test]
async fn detail_page_redirects_to_the_canonical_slug() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(listing_json("abc123", "Kia", "Seltos", 2023))))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/cars/old-title-abc123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(location(&response), "/cars/2023-kia-seltos-abc123");
}

#[tokio::test]
async fn missing_listing_is_a_404_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars/gone1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "success": false, "message": "Car not found" })))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/cars/2019-honda-city-gone1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(text_of(&document, "h1"), "Car Not Found");
    let robots = select(&document, "meta[name=robots]")[0].value().attr("content");
    assert_eq!(robots, Some("noindex, nofollow"));
}

#[tokio::test]
async fn hyphenated_id_resolves_through_its_bare_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars/legacy-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(listing_json("legacy-42", "Honda", "City", 2019))))
        .mount(&server)
        .await;
    // `/api/cars/42` is unmatched, so the first lookup is a 404

    let response = router(&server).oneshot(get("/cars/legacy-42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(text_of(&document, "h1"), "2019 Honda City");
    let canonical = select(&document, "link[rel=canonical]")[0].value().attr("href").unwrap();
    assert_eq!(canonical, "https://msmotor.example/cars/legacy-42");
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let server = MockServer::start().await;
    let response = router(&server).oneshot(get("/no/such/page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Auth ---

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let server = MockServer::start().await;
    let response = router(&server).oneshot(get("/cars/new")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?redirect=%2Fcars%2Fnew");
}

#[tokio::test]
async fn login_page_keeps_the_return_path() {
    let server = MockServer::start().await;
    let response = router(&server).oneshot(get("/login?redirect=%2Fmy-listings")).await.unwrap();
    let document = Html::parse_document(&body_text(response).await);
    let redirect = select(&document, "input[name=redirect]")[0].value().attr("value");
    assert_eq!(redirect, Some("/my-listings"));
}

#[tokio::test]
async fn login_stores_the_session_and_follows_the_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(serde_json::to_value(auth_response()).unwrap())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = post_form(
        "/login",
        "email=asha%40example.com&password=secret1&redirect=%2Fmy-listings",
        None,
    );
    let response = router(&server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/my-listings");

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=token-abc")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=refresh-xyz")));
    assert!(cookies.iter().any(|c| c.starts_with("user=")));
}

#[tokio::test]
async fn login_ignores_redirects_hidden_behind_control_characters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(serde_json::to_value(auth_response()).unwrap())),
        )
        .mount(&server)
        .await;

    // Tab (a browser would strip it and follow //evil.example), then a newline
    for redirect in ["%2F%09%2Fevil.example", "%2Fa%0Ab", "%2Fa%0D%0ASet-Cookie%3A+x%3D1"] {
        let body = format!("email=asha%40example.com&password=secret1&redirect={}", redirect);
        let response = router(&server).oneshot(post_form("/login", &body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "redirect={}", redirect);
        assert_eq!(location(&response), "/", "redirect={}", redirect);
    }
}

#[tokio::test]
async fn signed_in_visitor_on_login_page_is_sent_somewhere_local() {
    let server = MockServer::start().await;
    for query in ["redirect=%2F%09%2Fevil.example", "redirect=%2Fa%0Ab"] {
        let response = router(&server)
            .oneshot(get_signed_in(&format!("/login?{}", query)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    let response = router(&server)
        .oneshot(get_signed_in("/login?redirect=%2Fmy-listings"))
        .await
        .unwrap();
    assert_eq!(location(&response), "/my-listings");
}

#[tokio::test]
async fn rejected_login_shows_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "success": false, "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let request = post_form("/login", "email=asha%40example.com&password=wrong1", None);
    let response = router(&server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(text_of(&document, ".alert.error"), "Invalid credentials");
    let email = select(&document, "input[name=email]")[0].value().attr("value");
    assert_eq!(email, Some("asha@example.com"));
}

#[tokio::test]
async fn invalid_login_form_never_reaches_the_backend() {
    let server = MockServer::start().await;
    let response = router(&server)
        .oneshot(post_form("/login", "email=not-an-email&password=", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let document = Html::parse_document(&body_text(response).await);
    assert_eq!(select(&document, ".field-error").len(), 2);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn logout_expires_the_session_cookies() {
    let server = MockServer::start().await;
    let response = router(&server)
        .oneshot(post_form("/logout", "", Some(signed_in_cookies())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=;")));
}

#[tokio::test]
async fn expired_token_clears_cookies_and_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars/my-listings"))
        .and(header_is("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "success": false, "message": "Token expired" })))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get_signed_in("/my-listings")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=;")));
    assert!(cookies.iter().any(|c| c.starts_with("user=;")));
}

// --- Own listings ---

#[tokio::test]
async fn my_listings_falls_back_to_filtering_all_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars/my-listings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let mut someone_else = listing_json("c2", "Hyundai", "Creta", 2021);
    someone_else["seller"] = json!({ "name": "Ravi", "phone": "9876543210", "email": "ravi@example.com" });
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            vec![listing_json("c1", "Honda", "City", 2019), someone_else],
            2,
            1,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get_signed_in("/my-listings")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    let cards = select(&document, ".car-card");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].value().attr("data-id"), Some("c1"));
    assert!(text_of(&document, ".my-listings").contains("matched to your account"));
}

#[tokio::test]
async fn new_listing_form_is_prefilled_from_the_profile() {
    let server = MockServer::start().await;
    let response = router(&server).oneshot(get_signed_in("/cars/new")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = Html::parse_document(&body_text(response).await);
    let seller = select(&document, "input[name=seller_name]")[0].value().attr("value");
    assert_eq!(seller, Some("Asha Rao"));
    let email = select(&document, "input[name=seller_email]")[0].value().attr("value");
    assert_eq!(email, Some("asha@example.com"));
}

#[tokio::test]
async fn invalid_listing_is_returned_with_field_errors() {
    let server = MockServer::start().await;
    let body = "make=&model=City&year=2019&price=0&mileage=1000&fuel_type=petrol&transmission=manual\
                &body_type=sedan&color=White&city=Pune&state=Maharashtra&country=India\
                &seller_name=Asha&seller_phone=9876543210";
    let response = router(&server)
        .oneshot(post_form("/cars/new", body, Some(signed_in_cookies())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let document = Html::parse_document(&body_text(response).await);
    let errors: Vec<String> = select(&document, ".field-error")
        .iter()
        .map(|e| e.text().collect())
        .collect();
    assert!(errors.contains(&"Make is required".to_string()));
    assert!(errors.contains(&"Price must be greater than 0".to_string()));
    let model = select(&document, "input[name=model]")[0].value().attr("value");
    assert_eq!(model, Some("City"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn created_listing_redirects_to_the_success_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cars"))
        .and(header_is("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(201).set_body_json(envelope(listing_json("n1", "Honda", "City", 2019))))
        .expect(1)
        .mount(&server)
        .await;

    let body = "make=Honda&model=City&year=2019&price=550000&mileage=45000&fuel_type=petrol\
                &transmission=manual&body_type=sedan&color=Red&city=Pune&state=Maharashtra\
                &country=India&seller_name=Asha&seller_phone=9876543210";
    let response = router(&server)
        .oneshot(post_form("/cars/new", body, Some(signed_in_cookies())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cars/success?id=n1&slug=2019-honda-city-n1");
}

#[tokio::test]
async fn failed_delete_is_reported_on_my_listings() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/cars/c1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "success": false, "message": "Not your listing" })))
        .mount(&server)
        .await;

    let response = router(&server)
        .oneshot(post_form("/my-listings/c1/delete", "", Some(signed_in_cookies())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/my-listings?error=Not+your+listing");
}

// --- Crawlers ---

#[tokio::test]
async fn robots_txt_points_at_the_sitemap() {
    let server = MockServer::start().await;
    let response = router(&server).oneshot(get("/robots.txt")).await.unwrap();
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = body_text(response).await;
    assert!(body.contains("Disallow: /profile"));
    assert!(body.contains("Sitemap: https://msmotor.example/sitemap.xml"));
}

#[tokio::test]
async fn sitemap_lists_static_routes_and_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            vec![listing_json("c1", "Honda", "City", 2019)],
            1,
            1,
        )))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/sitemap.xml")).await.unwrap();
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/xml")
    );
    let body = body_text(response).await;
    assert!(body.contains("<loc>https://msmotor.example/cars</loc>"));
    assert!(body.contains("<loc>https://msmotor.example/cars/2019-honda-city-c1</loc>"));
    assert!(body.contains("<lastmod>2024-03-02T10:00:00Z</lastmod>"));
}

#[tokio::test]
async fn sitemap_degrades_to_static_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = router(&server).oneshot(get("/sitemap.xml")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert_eq!(body.matches("<url>").count(), 5);
}
