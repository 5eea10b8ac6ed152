//! Listing lifecycle over HTTP.

use std::sync::Arc;

use api_adapters::{router, AppState, Metrics};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use services::{ContentModerator, DiscoverySettings, ListingService, MessageService};
use storage_adapters::{InMemoryListingRepository, InMemoryMessageRepository};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    let listings = Arc::new(InMemoryListingRepository::new());
    let moderator = Arc::new(ContentModerator::default());
    router(AppState {
        listings: Arc::new(ListingService::new(
            listings.clone(),
            moderator.clone(),
            DiscoverySettings::default(),
        )),
        messages: Arc::new(MessageService::new(
            Arc::new(InMemoryMessageRepository::new()),
            listings,
            moderator.clone(),
        )),
        moderator,
        metrics: Arc::new(Metrics::new()),
    })
}

fn call(method: Method, uri: &str, caller: Option<(Uuid, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder.header("x-user-id", id.to_string()).header("x-user-role", role);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn room_in_leeds() -> Value {
    json!({
        "title": "Double room in Headingley",
        "description": "Bills included, ten minutes from campus",
        "category": "accommodation",
        "location": { "city": "Leeds", "state": "West Yorkshire" },
        "price": { "amount": 520.0, "kind": "monthly" },
        "details": { "accommodation": { "kind": "private-room", "bedrooms": 1, "furnished": true } }
    })
}

#[tokio::test]
async fn author_creates_edits_and_finds_a_listing() {
    let app = app();
    let author = Uuid::new_v4();

    let (status, body) = send(&app, call(Method::POST, "/api/posts", Some((author, "user")), Some(room_in_leeds()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["post"]["price"]["currency"], "GBP");
    let uri = format!("/api/posts/{}", body["post"]["id"].as_str().unwrap());

    let edit = json!({ "title": "Furnished double room in Headingley" });
    let (status, body) = send(&app, call(Method::PUT, &uri, Some((author, "user")), Some(edit))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Furnished double room in Headingley");

    let (status, body) = send(
        &app,
        call(Method::GET, "/api/posts?category=accommodation&city=Leeds&search=furnished%20room", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"][0]["title"], "Furnished double room in Headingley");
    assert_eq!(body["location"]["search_area"]["found_city"], "Leeds");
    assert_eq!(body["posts"][0]["location_quality"], 30);
}

#[tokio::test]
async fn category_cannot_be_changed() {
    let app = app();
    let author = Uuid::new_v4();
    let (_, body) = send(&app, call(Method::POST, "/api/posts", Some((author, "user")), Some(room_in_leeds()))).await;
    let uri = format!("/api/posts/{}", body["post"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        call(Method::PUT, &uri, Some((author, "user")), Some(json!({ "category": "jobs" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn details_must_match_category() {
    let mut post = room_in_leeds();
    post["category"] = json!("jobs");

    let (status, body) = send(&app(), call(Method::POST, "/api/posts", Some((Uuid::new_v4(), "user")), Some(post))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("details"));
}

#[tokio::test]
async fn moderator_reinstates_a_held_listing() {
    let app = app();
    let author = Uuid::new_v4();
    let post = json!({
        "title": "Bike for sale",
        "description": "Seller is an idiot and a stupid loser",
        "category": "buy-sell",
        "location": { "city": "York" }
    });
    let (_, body) = send(&app, call(Method::POST, "/api/posts", Some((author, "user")), Some(post))).await;
    assert_eq!(body["post"]["status"], "flagged");
    let uri = format!("/api/posts/{}", body["post"]["id"].as_str().unwrap());

    let reinstate = json!({ "status": "active" });
    let (status, _) = send(&app, call(Method::PUT, &uri, Some((author, "user")), Some(reinstate.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, call(Method::PUT, &uri, Some((Uuid::new_v4(), "moderator")), Some(reinstate))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["status"], "active");

    let (_, body) = send(&app, call(Method::GET, "/api/posts?city=york", None, None)).await;
    assert_eq!(body["posts"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-me-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me-123");
}

fn for_sale(title: &str, amount: f64) -> Value {
    json!({
        "title": title,
        "description": "Good condition, collection from Hyde Park",
        "category": "buy-sell",
        "location": { "city": "Leeds" },
        "price": { "amount": amount }
    })
}

#[tokio::test]
async fn price_range_and_sort_shape_the_listing() {
    let app = app();
    let seller = Some((Uuid::new_v4(), "user"));
    for (title, amount) in [("Desk lamp for sale", 12.0), ("Office chair for sale", 45.0), ("Bookcase for sale", 30.0)] {
        let (status, _) = send(&app, call(Method::POST, "/api/posts", seller, Some(for_sale(title, amount)))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        call(Method::GET, "/api/posts?priceMin=20&priceMax=50&sort=price-high", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["posts"]
        .as_array()
        .map(|posts| posts.iter().filter_map(|p| p["title"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(titles, ["Office chair for sale", "Bookcase for sale"]);

    let (status, _) = send(&app, call(Method::GET, "/api/posts?sort=cheapest", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn viewed_listings_rank_first_when_sorting_by_popularity() {
    let app = app();
    let seller = Some((Uuid::new_v4(), "user"));
    let (_, quiet) = send(&app, call(Method::POST, "/api/posts", seller, Some(for_sale("Desk lamp for sale", 12.0)))).await;
    let (_, busy) = send(&app, call(Method::POST, "/api/posts", seller, Some(for_sale("Office chair for sale", 45.0)))).await;
    assert!(quiet["post"]["id"].is_string());

    let uri = format!("/api/posts/{}", busy["post"]["id"].as_str().unwrap());
    let (_, first) = send(&app, call(Method::GET, &uri, None, None)).await;
    let (_, second) = send(&app, call(Method::GET, &uri, None, None)).await;
    assert_eq!((first["post"]["views"].as_u64(), second["post"]["views"].as_u64()), (Some(1), Some(2)));

    let (_, body) = send(&app, call(Method::GET, "/api/posts?sort=popular", None, None)).await;
    assert_eq!(body["posts"][0]["title"], "Office chair for sale");
}

#[tokio::test]
async fn page_far_past_the_end_is_empty() {
    let app = app();
    send(&app, call(Method::POST, "/api/posts", Some((Uuid::new_v4(), "user")), Some(room_in_leeds()))).await;

    let (status, body) = send(
        &app,
        call(Method::GET, "/api/posts?page=18446744073709551615&limit=2", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["pagination"]["has_next_page"], false);
}

#[tokio::test]
async fn author_listings_respect_visibility() {
    let app = app();
    let author = Uuid::new_v4();
    let (_, clean) = send(&app, call(Method::POST, "/api/posts", Some((author, "user")), Some(room_in_leeds()))).await;
    assert_eq!(clean["post"]["status"], "active");
    let abusive = json!({
        "title": "Bike for sale",
        "description": "Seller is an idiot and a stupid loser",
        "category": "buy-sell",
        "location": { "city": "York" }
    });
    let (_, held) = send(&app, call(Method::POST, "/api/posts", Some((author, "user")), Some(abusive))).await;
    assert_eq!(held["post"]["status"], "flagged");

    let uri = format!("/api/posts/user/{author}");
    let count = |body: &Value| body["posts"].as_array().map(Vec::len);

    let (status, body) = send(&app, call(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&body), Some(1));

    let all = format!("{uri}?status=all");
    let (_, body) = send(&app, call(Method::GET, &all, Some((Uuid::new_v4(), "user")), None)).await;
    assert_eq!(count(&body), Some(1));

    let (_, body) = send(&app, call(Method::GET, &all, Some((author, "user")), None)).await;
    assert_eq!(count(&body), Some(2));

    let flagged = format!("{uri}?status=flagged");
    let (_, body) = send(&app, call(Method::GET, &flagged, Some((Uuid::new_v4(), "moderator")), None)).await;
    assert_eq!(body["posts"][0]["title"], "Bike for sale");
    assert_eq!(count(&body), Some(1));

    let (status, _) = send(&app, call(Method::GET, &format!("{uri}?status=sold"), Some((author, "user")), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
