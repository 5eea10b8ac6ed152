//! Repository port contracts, checked against the in-memory adapters, a
//! mocked store, and the Mongo filter lowering.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    Category, DomainError, FilterExpr, ListingRepository, ListingStatus, Message, MessageRepository, MessageStatus,
    MockListingRepository, ModerationInfo, TextField,
};
use integration_tests::{listing, with_coordinates};
use services::{build_location_query, ContentModerator, DiscoveryRequest, DiscoverySettings, ListingService, LocationParams};
use storage_adapters::{to_mongo_filter, InMemoryListingRepository, InMemoryMessageRepository};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

#[tokio::test]
async fn listing_store_round_trips_and_filters() {
    let repo = InMemoryListingRepository::new();
    let leeds = listing("Desk lamp", "Works fine, collection only", Category::BuySell, "Leeds");
    let york = listing("Room near the minster", "Small double, bills included", Category::Accommodation, "York");

    assert_ok!(repo.insert(leeds.clone()).await);
    assert_ok!(repo.insert(york.clone()).await);
    assert_eq!(repo.len(), 2);

    let fetched = assert_ok!(repo.get(leeds.id).await);
    assert_eq!(fetched.as_ref(), Some(&leeds));

    let found = assert_ok!(repo.find(&FilterExpr::contains(TextField::City, "york")).await);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, york.id);

    let mut changed = leeds.clone();
    changed.status = ListingStatus::Completed;
    assert_ok!(repo.update(changed).await);
    let active = assert_ok!(repo.find(&FilterExpr::StatusIs(ListingStatus::Active)).await);
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn listing_store_rejects_duplicates_and_unknown_updates() {
    let repo = InMemoryListingRepository::new();
    let lamp = listing("Desk lamp", "Works fine, collection only", Category::BuySell, "Leeds");

    assert_ok!(repo.insert(lamp.clone()).await);
    assert!(matches!(repo.insert(lamp).await, Err(DomainError::Storage(_))));

    let stranger = listing("Kettle", "Barely used, collection only", Category::BuySell, "Leeds");
    assert!(matches!(repo.update(stranger).await, Err(DomainError::NotFound { .. })));
    assert_eq!(assert_ok!(repo.get(Uuid::new_v4()).await), None);
}

#[tokio::test]
async fn message_store_lists_both_directions_newest_first() {
    let repo = InMemoryMessageRepository::new();
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let message = |sender, recipient, minutes_ago| Message {
        id: Uuid::new_v4(),
        sender,
        recipient,
        listing: None,
        body: "hello".into(),
        status: MessageStatus::Sent,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
        moderation: ModerationInfo::default(),
    };

    let old = message(alice, bob, 10);
    let new = message(bob, alice, 1);
    assert_ok!(repo.insert(old.clone()).await);
    assert_ok!(repo.insert(new.clone()).await);
    assert_ok!(repo.insert(message(bob, carol, 5)).await);

    let ids: Vec<Uuid> = assert_ok!(repo.list_for_user(alice).await).iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![new.id, old.id]);
}

#[tokio::test]
async fn storage_failures_surface_from_discovery() {
    let mut repo = MockListingRepository::new();
    repo.expect_find()
        .times(1)
        .returning(|_| Err(DomainError::Storage("connection reset".into())));

    let service = ListingService::new(
        Arc::new(repo),
        Arc::new(ContentModerator::default()),
        DiscoverySettings::default(),
    );

    let err = assert_err!(service.discover(DiscoveryRequest::default()).await);
    assert_eq!(err, DomainError::Storage("connection reset".into()));
}

#[tokio::test]
async fn discovery_filter_reaches_the_store_intact() {
    let mut repo = MockListingRepository::new();
    repo.expect_find()
        .withf(|filter| matches!(filter, FilterExpr::And(parts) if parts.contains(&FilterExpr::CategoryIs(Category::Jobs))))
        .returning(|_| Ok(Vec::new()));

    let service = ListingService::new(
        Arc::new(repo),
        Arc::new(ContentModerator::default()),
        DiscoverySettings::default(),
    );
    let request = DiscoveryRequest {
        location: LocationParams {
            category: Some(Category::Jobs),
            ..Default::default()
        },
        ..Default::default()
    };

    let page = assert_ok!(service.discover(request).await);
    assert!(page.listings.is_empty());
    assert_eq!(page.pagination.total_pages, 0);
}

#[test]
fn city_query_lowers_to_mongo_or_over_fields() {
    let query = build_location_query(&LocationParams {
        category: Some(Category::Accommodation),
        city: Some("Leeds".into()),
        ..Default::default()
    });
    let doc = to_mongo_filter(&query.filter);

    let branches = doc["$or"].as_array().cloned().unwrap_or_default();
    assert_eq!(branches.len(), 3);
    assert!(branches[0]["location.city"]["$in"].is_array());
    assert_eq!(branches[2]["location.state"]["$regex"], "West Yorkshire");
}

#[test]
fn lowered_geo_filter_agrees_with_in_memory_evaluation() {
    let near = with_coordinates(
        listing("Desk lamp", "Works fine, collection only", Category::BuySell, "Leeds"),
        53.81,
        -1.56,
    );
    let filter = FilterExpr::geo_within(domains::GeoPoint::new(53.8008, -1.5491), 5.0);

    assert!(filter.matches(&near));
    let doc = to_mongo_filter(&filter);
    assert_eq!(
        doc["location.coordinates"]["$geoWithin"]["$centerSphere"][0],
        serde_json::json!([-1.5491, 53.8008])
    );
}
