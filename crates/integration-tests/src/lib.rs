//! Shared fixtures for the integration tests.
//!
//! Listings are built through [`Listing::from_submission`] and then adjusted
//! in place, so every fixture starts out as a valid active listing.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{Category, GeoPoint, Listing, ListingDetails, Location, NewListing, RideDetails};
use services::{ContentModerator, DiscoverySettings, ListingService, MessageService};
use storage_adapters::{InMemoryListingRepository, InMemoryMessageRepository};
use uuid::Uuid;

pub fn listing(title: &str, description: &str, category: Category, city: &str) -> Listing {
    Listing::from_submission(
        Uuid::new_v4(),
        NewListing {
            title: title.into(),
            description: description.into(),
            category,
            location: Location::in_city(city),
            price: None,
            details: None,
        },
        Utc::now(),
    )
}

pub fn ride(from: &str, to: &str) -> Listing {
    let mut ride = listing(
        &format!("Lift from {from} to {to}"),
        "Leaving on Friday afternoon",
        Category::PickDrop,
        from,
    );
    ride.details = Some(ListingDetails::Ride(RideDetails {
        from: Some(from.into()),
        to: Some(to.into()),
        seats: Some(3),
        ..Default::default()
    }));
    ride
}

pub fn with_coordinates(mut listing: Listing, lat: f64, lng: f64) -> Listing {
    listing.location.coordinates = Some(GeoPoint::new(lat, lng));
    listing
}

pub fn with_state(mut listing: Listing, state: &str) -> Listing {
    listing.location.state = Some(state.into());
    listing
}

/// Moves `created_at` into the past; expiry is left alone.
pub fn created_days_ago(mut listing: Listing, days: i64) -> Listing {
    listing.created_at = Utc::now() - Duration::days(days);
    listing.updated_at = listing.created_at;
    listing
}

/// Everything a service-level test needs, sharing one listing store.
pub struct Harness {
    pub listing_repo: Arc<InMemoryListingRepository>,
    pub listings: ListingService,
    pub messages: MessageService,
}

impl Harness {
    pub fn new(seed: Vec<Listing>) -> Self {
        Self::with_moderator(seed, ContentModerator::default())
    }

    pub fn with_moderator(seed: Vec<Listing>, moderator: ContentModerator) -> Self {
        let listing_repo = Arc::new(InMemoryListingRepository::with_listings(seed));
        let moderator = Arc::new(moderator);
        Self {
            listings: ListingService::new(listing_repo.clone(), moderator.clone(), DiscoverySettings::default()),
            messages: MessageService::new(
                Arc::new(InMemoryMessageRepository::new()),
                listing_repo.clone(),
                moderator,
            ),
            listing_repo,
        }
    }
}
