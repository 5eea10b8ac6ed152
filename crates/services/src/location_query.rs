//! # Location Query Builder
//!
//! Turns optional, loosely specified location input into a [`FilterExpr`]
//! plus a record of which fallback strategies fired.
//!
//! Three policies exist:
//! - accommodation: GPS with nearby-city expansion, then gazetteer city
//!   resolution, then no constraint;
//! - rides (`pick-drop` and `ridesharing`): the same cascade with a 100 km
//!   GPS floor and route endpoints matched alongside the nominal city;
//! - everything else: a single geo, city or empty filter.
//!
//! Builders are pure and total: absent or blank inputs mean "not provided".

use std::cmp::Ordering;

use domains::{round_km, Category, FilterExpr, GeoPoint, Listing, Location, TextField};
use serde::Serialize;

use crate::gazetteer::{find_city, nearby_cities, NearbyCity};

pub const DEFAULT_RADIUS_KM: f64 = 20.0;
/// Ride searches never use a GPS radius smaller than this.
pub const RIDE_MIN_RADIUS_KM: f64 = 100.0;
/// A resolved city also matches listings in cities this close to it.
pub const CITY_EXPANSION_KM: f64 = 30.0;
const SEARCH_AREA_CITY_LIMIT: usize = 5;
const DETAILED_ADDRESS_LEN: usize = 10;

/// Raw location parameters of a discovery request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationParams {
    pub category: Option<Category>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Defaults to [`DEFAULT_RADIUS_KM`]
    pub radius_km: Option<f64>,
    pub city: Option<String>,
}

impl LocationParams {
    /// GPS is only in play when both coordinates are given.
    pub fn point(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    fn city_term(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn radius(&self) -> f64 {
        self.radius_km.unwrap_or(DEFAULT_RADIUS_KM)
    }
}

/// Which strategy contributed to a location filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTag {
    GpsAndCities,
    ExpandedGps,
    CityBased,
    PartialCityMatch,
    ShowAll,
    ShowAllRides,
    GpsRadius,
    CityOnly,
    NoLocation,
}

impl FallbackTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackTag::GpsAndCities => "gps_and_cities",
            FallbackTag::ExpandedGps => "expanded_gps",
            FallbackTag::CityBased => "city_based",
            FallbackTag::PartialCityMatch => "partial_city_match",
            FallbackTag::ShowAll => "show_all",
            FallbackTag::ShowAllRides => "show_all_rides",
            FallbackTag::GpsRadius => "gps_radius",
            FallbackTag::CityOnly => "city_only",
            FallbackTag::NoLocation => "no_location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Accommodation,
    Rides,
    Standard,
}

/// The area a location filter covers, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchArea {
    Radius {
        center: GeoPoint,
        radius_km: f64,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        nearby_cities: Vec<NearbyCity>,
    },
    City {
        requested_city: String,
        found_city: &'static str,
        region: &'static str,
        expanded_to_nearby: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationMetadata {
    pub search_type: SearchType,
    /// Tags in the order their strategies ran.
    pub fallbacks_used: Vec<FallbackTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_area: Option<SearchArea>,
}

impl LocationMetadata {
    fn new(search_type: SearchType) -> Self {
        Self {
            search_type,
            fallbacks_used: Vec::new(),
            search_area: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationQuery {
    pub filter: FilterExpr,
    pub metadata: LocationMetadata,
}

/// Knobs that distinguish the two cascading policies.
struct Cascade {
    search_type: SearchType,
    min_radius_km: f64,
    text_fields: &'static [TextField],
    fallback: FallbackTag,
}

const ACCOMMODATION: Cascade = Cascade {
    search_type: SearchType::Accommodation,
    min_radius_km: 0.0,
    text_fields: &[TextField::City, TextField::Address],
    fallback: FallbackTag::ShowAll,
};

const RIDES: Cascade = Cascade {
    search_type: SearchType::Rides,
    min_radius_km: RIDE_MIN_RADIUS_KM,
    text_fields: &[TextField::City, TextField::Address, TextField::RideFrom, TextField::RideTo],
    fallback: FallbackTag::ShowAllRides,
};

/// Builds the location filter for a discovery request.
pub fn build_location_query(params: &LocationParams) -> LocationQuery {
    let query = match params.category {
        Some(Category::Accommodation) => cascading_query(params, &ACCOMMODATION),
        Some(c) if c.is_ride() => cascading_query(params, &RIDES),
        _ => standard_query(params),
    };

    tracing::debug!(
        search_type = ?query.metadata.search_type,
        fallbacks = ?query.metadata.fallbacks_used,
        "built location query"
    );
    query
}

fn cascading_query(params: &LocationParams, policy: &Cascade) -> LocationQuery {
    let mut metadata = LocationMetadata::new(policy.search_type);
    let mut strategies = Vec::new();

    if let Some(center) = params.point() {
        let radius = params.radius().max(policy.min_radius_km);
        strategies.push(gps_strategy(center, radius, policy.text_fields, &mut metadata));
    }

    // With both GPS and a city the city's search area is the one reported.
    if let Some(term) = params.city_term() {
        strategies.push(city_strategy(term, policy.text_fields, &mut metadata));
    }

    let filter = if strategies.is_empty() {
        metadata.fallbacks_used.push(policy.fallback);
        FilterExpr::All
    } else {
        FilterExpr::any_of(strategies)
    };

    LocationQuery { filter, metadata }
}

fn gps_strategy(
    center: GeoPoint,
    radius_km: f64,
    fields: &[TextField],
    metadata: &mut LocationMetadata,
) -> FilterExpr {
    let nearby = nearby_cities(center.lat, center.lng, radius_km);

    if nearby.is_empty() {
        metadata.fallbacks_used.push(FallbackTag::ExpandedGps);
        return FilterExpr::geo_within(center, radius_km * 2.0);
    }

    let names: Vec<String> = nearby.iter().map(|n| n.city.name.to_string()).collect();
    let by_name = fields
        .iter()
        .map(|f| FilterExpr::contains_any(*f, names.clone()))
        .collect();

    metadata.fallbacks_used.push(FallbackTag::GpsAndCities);
    metadata.search_area = Some(SearchArea::Radius {
        center,
        radius_km,
        nearby_cities: nearby.into_iter().take(SEARCH_AREA_CITY_LIMIT).collect(),
    });

    FilterExpr::any_of(vec![
        FilterExpr::geo_within(center, radius_km),
        FilterExpr::any_of(by_name),
    ])
}

fn city_strategy(term: &str, fields: &[TextField], metadata: &mut LocationMetadata) -> FilterExpr {
    let Some(city) = find_city(term) else {
        metadata.fallbacks_used.push(FallbackTag::PartialCityMatch);
        let mut conditions: Vec<FilterExpr> = fields.iter().map(|f| FilterExpr::contains(*f, term)).collect();
        conditions.push(FilterExpr::contains(TextField::State, term));
        return FilterExpr::any_of(conditions);
    };

    let mut names = vec![city.name.to_string()];
    for n in nearby_cities(city.lat, city.lng, CITY_EXPANSION_KM) {
        if n.city.key != city.key {
            names.push(n.city.name.to_string());
        }
    }

    metadata.fallbacks_used.push(FallbackTag::CityBased);
    metadata.search_area = Some(SearchArea::City {
        requested_city: term.to_string(),
        found_city: city.name,
        region: city.region,
        expanded_to_nearby: names.len() > 1,
    });

    let mut conditions: Vec<FilterExpr> = fields
        .iter()
        .map(|f| FilterExpr::contains_any(*f, names.clone()))
        .collect();
    conditions.push(FilterExpr::contains(TextField::State, city.region));
    FilterExpr::any_of(conditions)
}

fn standard_query(params: &LocationParams) -> LocationQuery {
    let mut metadata = LocationMetadata::new(SearchType::Standard);

    let filter = if let Some(center) = params.point() {
        let radius_km = params.radius();
        metadata.fallbacks_used.push(FallbackTag::GpsRadius);
        metadata.search_area = Some(SearchArea::Radius {
            center,
            radius_km,
            nearby_cities: Vec::new(),
        });
        FilterExpr::geo_within(center, radius_km)
    } else if let Some(term) = params.city_term() {
        metadata.fallbacks_used.push(FallbackTag::CityOnly);
        FilterExpr::contains(TextField::City, term)
    } else {
        metadata.fallbacks_used.push(FallbackTag::NoLocation);
        FilterExpr::All
    };

    LocationQuery { filter, metadata }
}

// ----------------------------------------------------------------------------
// Post-processing
// ----------------------------------------------------------------------------

/// Distance from the searcher to a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceInfo {
    /// Rounded to one decimal
    pub km: f64,
    /// `true` when measured to the listing's own coordinates, `false` when
    /// estimated from its city centroid.
    pub calculated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A listing annotated for location-aware presentation.
#[derive(Debug, Clone, Serialize)]
pub struct LocatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceInfo>,
    pub location_quality: u8,
}

/// How completely a location is described, 0 to 100.
pub fn location_quality(location: &Location) -> u8 {
    let mut score = 0;
    if location.coordinates.is_some() {
        score += 40;
    }
    if location
        .address
        .as_deref()
        .is_some_and(|a| a.chars().count() > DETAILED_ADDRESS_LEN)
    {
        score += 30;
    }
    if !location.city.trim().is_empty() {
        score += 20;
    }
    if location.state.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        score += 10;
    }
    score
}

fn distance_to(user: GeoPoint, location: &Location) -> Option<DistanceInfo> {
    if let Some(point) = location.coordinates {
        return Some(DistanceInfo {
            km: round_km(user.distance_km(&point)),
            calculated: true,
            note: None,
        });
    }

    find_city(&location.city).map(|city| DistanceInfo {
        km: round_km(user.distance_km(&city.point())),
        calculated: false,
        note: Some(format!("Estimated distance to {} city center", city.name)),
    })
}

/// Attaches distance and location quality to each listing.
pub fn add_location_metadata(listings: Vec<Listing>, user: Option<GeoPoint>) -> Vec<LocatedListing> {
    listings
        .into_iter()
        .map(|listing| LocatedListing {
            distance: user.and_then(|u| distance_to(u, &listing.location)),
            location_quality: location_quality(&listing.location),
            listing,
        })
        .collect()
}

fn distance_tier(distance: &Option<DistanceInfo>) -> u8 {
    match distance {
        Some(d) if d.calculated => 0,
        Some(_) => 1,
        None => 2,
    }
}

fn compare_location_relevance(a: &LocatedListing, b: &LocatedListing) -> Ordering {
    distance_tier(&a.distance)
        .cmp(&distance_tier(&b.distance))
        .then_with(|| match (&a.distance, &b.distance) {
            (Some(da), Some(db)) => da.km.total_cmp(&db.km),
            _ => Ordering::Equal,
        })
        .then_with(|| b.location_quality.cmp(&a.location_quality))
        .then_with(|| b.listing.created_at.cmp(&a.listing.created_at))
}

/// Stable sort: exact distances first, then estimated, then none; nearest
/// first within a tier, then better described, then newer.
pub fn sort_by_location_relevance(listings: &mut [LocatedListing]) {
    listings.sort_by(compare_location_relevance);
}
