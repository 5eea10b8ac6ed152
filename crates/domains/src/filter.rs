//! # Filter Expressions
//!
//! A store-independent predicate tree over listings. Query builders produce
//! these; repository adapters either evaluate them in memory
//! ([`FilterExpr::matches`]) or lower them to their native query language.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::{Category, Listing, ListingStatus};

/// Text-bearing fields a filter may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Description,
    City,
    State,
    Address,
    RideFrom,
    RideTo,
}

impl TextField {
    /// Dotted document path, as stored by document databases.
    pub fn path(&self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Description => "description",
            TextField::City => "location.city",
            TextField::State => "location.state",
            TextField::Address => "location.address",
            TextField::RideFrom => "details.ride.from",
            TextField::RideTo => "details.ride.to",
        }
    }

    pub fn value<'a>(&self, listing: &'a Listing) -> Option<&'a str> {
        match self {
            TextField::Title => Some(listing.title.as_str()),
            TextField::Description => Some(listing.description.as_str()),
            TextField::City => Some(listing.location.city.as_str()),
            TextField::State => listing.location.state.as_deref(),
            TextField::Address => listing.location.address.as_deref(),
            TextField::RideFrom => listing.ride().and_then(|r| r.from.as_deref()),
            TextField::RideTo => listing.ride().and_then(|r| r.to.as_deref()),
        }
    }
}

/// Predicate tree over [`Listing`]s.
///
/// All text comparisons are case-insensitive substring tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
    /// No constraint.
    All,
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Contains {
        field: TextField,
        needle: String,
    },
    ContainsAny {
        field: TextField,
        needles: Vec<String>,
    },
    CategoryIs(Category),
    StatusIs(ListingStatus),
    /// `expires_at` strictly after the instant.
    ExpiresAfter(DateTime<Utc>),
    AuthorIs(Uuid),
    /// Price amount within the inclusive bounds. Listings without a price
    /// never match.
    PriceBetween {
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Listing coordinates within `radius_km` of `center`. Listings without
    /// coordinates never match.
    GeoWithin {
        center: GeoPoint,
        radius_km: f64,
    },
}

impl FilterExpr {
    pub fn contains(field: TextField, needle: impl Into<String>) -> Self {
        FilterExpr::Contains {
            field,
            needle: needle.into(),
        }
    }

    pub fn contains_any(field: TextField, needles: Vec<String>) -> Self {
        FilterExpr::ContainsAny { field, needles }
    }

    pub fn geo_within(center: GeoPoint, radius_km: f64) -> Self {
        FilterExpr::GeoWithin { center, radius_km }
    }

    /// Price range; `All` when neither bound is given.
    pub fn price_between(min: Option<f64>, max: Option<f64>) -> Self {
        if min.is_none() && max.is_none() {
            return FilterExpr::All;
        }
        FilterExpr::PriceBetween { min, max }
    }

    /// Conjunction that drops `All` operands and collapses trivial cases.
    pub fn all_of(filters: Vec<FilterExpr>) -> Self {
        let mut parts: Vec<FilterExpr> = filters.into_iter().filter(|f| !f.is_unfiltered()).collect();
        match parts.len() {
            0 => FilterExpr::All,
            1 => parts.remove(0),
            _ => FilterExpr::And(parts),
        }
    }

    /// Disjunction that collapses a single operand to itself.
    pub fn any_of(mut filters: Vec<FilterExpr>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            FilterExpr::Or(filters)
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        matches!(self, FilterExpr::All)
    }

    /// Evaluates the predicate against a listing.
    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            FilterExpr::All => true,
            FilterExpr::And(parts) => parts.iter().all(|p| p.matches(listing)),
            FilterExpr::Or(parts) => parts.iter().any(|p| p.matches(listing)),
            FilterExpr::Contains { field, needle } => field
                .value(listing)
                .is_some_and(|v| contains_folded(v, needle)),
            FilterExpr::ContainsAny { field, needles } => field
                .value(listing)
                .is_some_and(|v| needles.iter().any(|n| contains_folded(v, n))),
            FilterExpr::CategoryIs(category) => listing.category == *category,
            FilterExpr::StatusIs(status) => listing.status == *status,
            FilterExpr::ExpiresAfter(at) => listing.expires_at > *at,
            FilterExpr::AuthorIs(author) => listing.author == *author,
            FilterExpr::PriceBetween { min, max } => listing.price.as_ref().is_some_and(|p| {
                min.map_or(true, |lo| p.amount >= lo) && max.map_or(true, |hi| p.amount <= hi)
            }),
            FilterExpr::GeoWithin { center, radius_km } => listing
                .location
                .coordinates
                .is_some_and(|p| center.distance_km(&p) <= *radius_km),
        }
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingDetails, Location, NewListing, Price, PriceKind, RideDetails};

    fn listing(city: &str, coords: Option<GeoPoint>) -> Listing {
        let mut location = Location::in_city(city);
        location.coordinates = coords;
        Listing::from_submission(
            Uuid::new_v4(),
            NewListing {
                title: "Lift to Leeds".into(),
                description: "Leaving Friday".into(),
                category: Category::PickDrop,
                location,
                price: None,
                details: Some(ListingDetails::Ride(RideDetails {
                    from: Some("York".into()),
                    to: Some("Leeds".into()),
                    ..Default::default()
                })),
            },
            Utc::now(),
        )
    }

    #[test]
    fn text_matching_ignores_case() {
        let l = listing("Manchester", None);
        assert!(FilterExpr::contains(TextField::City, "MANCH").matches(&l));
        assert!(FilterExpr::contains(TextField::RideTo, "leeds").matches(&l));
        assert!(!FilterExpr::contains(TextField::Address, "x").matches(&l));
    }

    #[test]
    fn geo_within_requires_coordinates() {
        let center = GeoPoint::new(53.4808, -2.2426);
        let near = listing("Manchester", Some(GeoPoint::new(53.47, -2.23)));
        let far = listing("London", Some(GeoPoint::new(51.5074, -0.1278)));
        let none = listing("Manchester", None);
        let f = FilterExpr::geo_within(center, 20.0);
        assert!(f.matches(&near));
        assert!(!f.matches(&far));
        assert!(!f.matches(&none));
    }

    #[test]
    fn price_range_is_inclusive_and_needs_a_price() {
        let mut priced = listing("Leeds", None);
        priced.price = Some(Price {
            amount: 450.0,
            currency: "GBP".into(),
            kind: PriceKind::Monthly,
        });
        let free = listing("Leeds", None);

        assert!(FilterExpr::price_between(Some(450.0), Some(450.0)).matches(&priced));
        assert!(FilterExpr::price_between(None, Some(500.0)).matches(&priced));
        assert!(!FilterExpr::price_between(Some(451.0), None).matches(&priced));
        assert!(!FilterExpr::price_between(Some(0.0), None).matches(&free));
        assert_eq!(FilterExpr::price_between(None, None), FilterExpr::All);
    }

    #[test]
    fn author_filter_matches_owner_only() {
        let l = listing("York", None);
        assert!(FilterExpr::AuthorIs(l.author).matches(&l));
        assert!(!FilterExpr::AuthorIs(Uuid::new_v4()).matches(&l));
    }

    #[test]
    fn combinators_collapse() {
        assert_eq!(FilterExpr::all_of(vec![FilterExpr::All, FilterExpr::All]), FilterExpr::All);
        let single = FilterExpr::StatusIs(ListingStatus::Active);
        assert_eq!(FilterExpr::all_of(vec![FilterExpr::All, single.clone()]), single);
        assert_eq!(FilterExpr::any_of(vec![single.clone()]), single);
        assert!(!FilterExpr::Or(vec![]).matches(&listing("York", None)));
    }
}
