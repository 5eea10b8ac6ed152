//! # City Gazetteer
//!
//! A fixed table of UK university cities with centroid coordinates, aliases
//! and region. Lookups are case-insensitive; lookup indexes are built once
//! per process on first use.

use std::collections::HashMap;

use domains::{haversine_km, round_km, GeoPoint};
use once_cell::sync::Lazy;
use serde::Serialize;

/// A gazetteer entry. Static, immutable.
#[derive(Debug, PartialEq, Serialize)]
pub struct City {
    /// Normalized lowercase identifier
    pub key: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub region: &'static str,
    pub aliases: &'static [&'static str],
    pub is_university_town: bool,
    pub universities: &'static [&'static str],
}

impl City {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// A city returned by a radius search, with its distance to the query point
/// rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearbyCity {
    #[serde(flatten)]
    pub city: &'static City,
    pub distance_km: f64,
}

macro_rules! city {
    ($key:literal, $name:literal, $lat:expr, $lng:expr, $region:literal, [$($alias:literal),*], [$($uni:literal),*]) => {
        City {
            key: $key,
            name: $name,
            lat: $lat,
            lng: $lng,
            region: $region,
            aliases: &[$($alias),*],
            is_university_town: true,
            universities: &[$($uni),*],
        }
    };
}

static UK_CITIES: &[City] = &[
    // Major cities
    city!("london", "London", 51.5074, -0.1278, "Greater London",
        ["central london", "greater london", "london city", "city of london"],
        ["UCL", "Imperial College", "King's College", "LSE", "Queen Mary"]),
    city!("manchester", "Manchester", 53.4808, -2.2426, "Greater Manchester",
        ["manchester city", "greater manchester"],
        ["University of Manchester", "Manchester Metropolitan"]),
    city!("birmingham", "Birmingham", 52.4862, -1.8904, "West Midlands",
        ["birmingham city", "brum"],
        ["University of Birmingham", "Birmingham City University"]),
    city!("leeds", "Leeds", 53.8008, -1.5491, "West Yorkshire",
        ["leeds city"],
        ["University of Leeds", "Leeds Beckett University"]),
    city!("liverpool", "Liverpool", 53.4084, -2.9916, "Merseyside",
        ["liverpool city"],
        ["University of Liverpool", "Liverpool John Moores"]),
    city!("glasgow", "Glasgow", 55.8642, -4.2518, "Scotland",
        ["glasgow city"],
        ["University of Glasgow", "University of Strathclyde"]),
    city!("edinburgh", "Edinburgh", 55.9533, -3.1883, "Scotland",
        ["edinburgh city"],
        ["University of Edinburgh", "Edinburgh Napier University"]),
    city!("bristol", "Bristol", 51.4545, -2.5879, "South West England",
        ["bristol city"],
        ["University of Bristol", "University of the West of England"]),
    city!("nottingham", "Nottingham", 52.9548, -1.1581, "East Midlands",
        ["nottingham city", "notts"],
        ["University of Nottingham", "Nottingham Trent University"]),
    city!("sheffield", "Sheffield", 53.3811, -1.4701, "South Yorkshire",
        ["sheffield city"],
        ["University of Sheffield", "Sheffield Hallam University"]),
    city!("newcastle", "Newcastle", 54.9783, -1.6178, "North East England",
        ["newcastle upon tyne", "newcastle city"],
        ["Newcastle University", "Northumbria University"]),
    city!("cardiff", "Cardiff", 51.4816, -3.1791, "Wales",
        ["cardiff city", "caerdydd"],
        ["Cardiff University", "Cardiff Metropolitan University"]),
    city!("belfast", "Belfast", 54.5973, -5.9301, "Northern Ireland",
        ["belfast city"],
        ["Queen's University Belfast", "Ulster University"]),
    // University towns
    city!("oxford", "Oxford", 51.7520, -1.2577, "Oxfordshire",
        ["oxford city"],
        ["University of Oxford", "Oxford Brookes University"]),
    city!("cambridge", "Cambridge", 52.2053, 0.1218, "Cambridgeshire",
        ["cambridge city"],
        ["University of Cambridge", "Anglia Ruskin University"]),
    city!("bath", "Bath", 51.3758, -2.3599, "Somerset",
        ["bath city"],
        ["University of Bath", "Bath Spa University"]),
    city!("york", "York", 53.9600, -1.0873, "North Yorkshire",
        ["york city"],
        ["University of York", "York St John University"]),
    city!("exeter", "Exeter", 50.7184, -3.5339, "Devon",
        ["exeter city"],
        ["University of Exeter"]),
    city!("warwick", "Warwick", 52.2819, -1.5849, "Warwickshire",
        ["warwick city", "coventry"],
        ["University of Warwick", "Coventry University"]),
    city!("leicester", "Leicester", 52.6369, -1.1398, "Leicestershire",
        ["leicester city"],
        ["University of Leicester", "De Montfort University"]),
    city!("southampton", "Southampton", 50.9097, -1.4044, "Hampshire",
        ["southampton city"],
        ["University of Southampton", "Southampton Solent University"]),
    city!("durham", "Durham", 54.7761, -1.5733, "County Durham",
        ["durham city"],
        ["Durham University"]),
    city!("st andrews", "St Andrews", 56.3398, -2.7967, "Scotland",
        ["saint andrews", "st. andrews"],
        ["University of St Andrews"]),
];

/// Lowercase name and key → city.
static BY_NAME: Lazy<HashMap<String, &'static City>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for city in UK_CITIES {
        map.insert(city.name.to_lowercase(), city);
        map.insert(city.key.to_string(), city);
    }
    map
});

/// Lowercase alias → city. The first city to claim an alias keeps it.
static BY_ALIAS: Lazy<HashMap<String, &'static City>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for city in UK_CITIES {
        for alias in city.aliases {
            map.entry(alias.to_lowercase()).or_insert(city);
        }
    }
    map
});

/// Every city in the table, in table order.
pub fn all_cities() -> &'static [City] {
    UK_CITIES
}

/// Resolves a free-text city name.
///
/// Priority: exact name, exact alias, partial name, partial alias. A partial
/// match is either string containing the other. When several cities match
/// partially, the first in table order wins.
pub fn find_city(term: &str) -> Option<&'static City> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return None;
    }

    if let Some(city) = BY_NAME.get(&term).copied() {
        return Some(city);
    }
    if let Some(city) = BY_ALIAS.get(&term).copied() {
        return Some(city);
    }

    let partial = |candidate: &str| candidate.contains(&term) || term.contains(candidate);

    UK_CITIES
        .iter()
        .find(|c| partial(&c.name.to_lowercase()) || partial(c.key))
        .or_else(|| {
            UK_CITIES
                .iter()
                .find(|c| c.aliases.iter().any(|a| partial(&a.to_lowercase())))
        })
}

/// Cities whose centroid lies within `radius_km` of the point, nearest first.
///
/// The radius applies to the reported (rounded) distance, so no returned
/// city ever shows a distance beyond `radius_km`.
pub fn nearby_cities(lat: f64, lng: f64, radius_km: f64) -> Vec<NearbyCity> {
    let mut hits: Vec<(f64, &'static City)> = UK_CITIES
        .iter()
        .map(|c| (calculate_distance(lat, lng, c.lat, c.lng), c))
        .filter(|(d, _)| round_km(*d) <= radius_km)
        .collect();

    // Stable: equidistant cities keep table order
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));

    hits.into_iter()
        .map(|(d, city)| NearbyCity {
            city,
            distance_km: round_km(d),
        })
        .collect()
}

/// Haversine distance in kilometres.
pub fn calculate_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    haversine_km(lat1, lng1, lat2, lng2)
}

pub fn university_towns() -> Vec<&'static City> {
    UK_CITIES.iter().filter(|c| c.is_university_town).collect()
}

/// Cities in a region, compared case-insensitively.
pub fn cities_in_region(region: &str) -> Vec<&'static City> {
    UK_CITIES
        .iter()
        .filter(|c| c.region.eq_ignore_ascii_case(region.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercase_and_unique() {
        let mut keys: Vec<&str> = UK_CITIES.iter().map(|c| c.key).collect();
        assert!(keys.iter().all(|k| *k == k.to_lowercase()));
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), UK_CITIES.len());
    }

    #[test]
    fn find_city_is_case_insensitive() {
        let upper = find_city("MANCHESTER").unwrap();
        let lower = find_city("manchester").unwrap();
        let partial = find_city("manc").unwrap();
        assert_eq!(upper.key, "manchester");
        assert_eq!(upper, lower);
        assert_eq!(lower, partial);
        assert_eq!(find_city("  Manchester  ").unwrap().key, "manchester");
    }

    #[test]
    fn find_city_resolves_aliases() {
        assert_eq!(find_city("brum").unwrap().key, "birmingham");
        assert_eq!(find_city("Caerdydd").unwrap().key, "cardiff");
        assert_eq!(find_city("coventry").unwrap().key, "warwick");
        assert_eq!(find_city("st. andrews").unwrap().key, "st andrews");
    }

    #[test]
    fn find_city_matches_when_term_contains_name() {
        assert_eq!(find_city("central bristol").unwrap().key, "bristol");
    }

    #[test]
    fn find_city_misses() {
        assert!(find_city("").is_none());
        assert!(find_city("   ").is_none());
        assert!(find_city("zzzz").is_none());
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ((51.5074, -0.1278), (53.4808, -2.2426)),
            ((55.9533, -3.1883), (50.7184, -3.5339)),
            ((0.0, 0.0), (-33.8688, 151.2093)),
        ];
        for ((a_lat, a_lng), (b_lat, b_lng)) in pairs {
            let ab = calculate_distance(a_lat, a_lng, b_lat, b_lng);
            let ba = calculate_distance(b_lat, b_lng, a_lat, a_lng);
            assert!((ab - ba).abs() <= ab * 1e-9);
            assert_eq!(calculate_distance(a_lat, a_lng, a_lat, a_lng), 0.0);
        }
    }

    #[test]
    fn nearby_cities_are_sorted_and_within_radius() {
        for radius in [10.0, 60.0, 150.0, 400.0] {
            let hits = nearby_cities(53.4808, -2.2426, radius);
            assert!(hits.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
            assert!(hits.iter().all(|h| h.distance_km <= radius));
        }
    }

    #[test]
    fn radius_bounds_the_reported_distance() {
        // Manchester to Liverpool is 50.25 km, reported as 50.3
        let tight = nearby_cities(53.4808, -2.2426, 50.26);
        assert!(tight.iter().all(|h| h.distance_km <= 50.26));
        assert!(!tight.iter().any(|h| h.city.key == "liverpool"));

        let exact = nearby_cities(53.4808, -2.2426, 50.3);
        assert!(exact.iter().any(|h| h.city.key == "liverpool"));
    }

    #[test]
    fn nearby_cities_from_manchester() {
        let hits = nearby_cities(53.4808, -2.2426, 60.0);
        let keys: Vec<&str> = hits.iter().map(|h| h.city.key).collect();
        assert_eq!(keys.first(), Some(&"manchester"));
        assert!(keys.contains(&"liverpool"));
        assert!(keys.contains(&"sheffield"));
        assert!(!keys.contains(&"london"));
    }

    #[test]
    fn region_lookup() {
        let scottish: Vec<&str> = cities_in_region("scotland").iter().map(|c| c.key).collect();
        assert_eq!(scottish, vec!["glasgow", "edinburgh", "st andrews"]);
        assert_eq!(university_towns().len(), UK_CITIES.len());
    }
}
