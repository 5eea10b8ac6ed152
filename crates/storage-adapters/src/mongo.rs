//! # MongoDB filter lowering
//!
//! Translates a [`FilterExpr`] into a MongoDB query document (extended JSON).
//! Text matches become case-insensitive regexes over escaped needles, so a
//! needle is always matched literally.

use domains::{FilterExpr, GeoPoint};
use serde_json::{json, Map, Value};

/// Equatorial radius used by `$centerSphere`, which expects radians.
pub const MONGO_EARTH_RADIUS_KM: f64 = 6378.1;

/// The query document equivalent to `filter`. `All` lowers to `{}`.
pub fn to_mongo_filter(filter: &FilterExpr) -> Value {
    match filter {
        FilterExpr::All => Value::Object(Map::new()),
        FilterExpr::And(parts) => json!({ "$and": parts.iter().map(to_mongo_filter).collect::<Vec<_>>() }),
        FilterExpr::Or(parts) => json!({ "$or": parts.iter().map(to_mongo_filter).collect::<Vec<_>>() }),
        FilterExpr::Contains { field, needle } => field_doc(
            field.path(),
            json!({ "$regex": regex::escape(needle), "$options": "i" }),
        ),
        FilterExpr::ContainsAny { field, needles } => field_doc(
            field.path(),
            json!({ "$in": needles.iter().map(|n| regex_literal(n)).collect::<Vec<_>>() }),
        ),
        FilterExpr::CategoryIs(category) => field_doc("category", json!(category.as_str())),
        FilterExpr::StatusIs(status) => field_doc("status", json!(status.as_str())),
        FilterExpr::ExpiresAfter(at) => field_doc("expires_at", json!({ "$gt": { "$date": at.to_rfc3339() } })),
        FilterExpr::AuthorIs(author) => field_doc("author", json!(author.to_string())),
        FilterExpr::PriceBetween { min, max } => price_between(*min, *max),
        FilterExpr::GeoWithin { center, radius_km } => geo_within(*center, *radius_km),
    }
}

fn field_doc(path: &str, condition: Value) -> Value {
    let mut doc = Map::new();
    doc.insert(path.to_string(), condition);
    Value::Object(doc)
}

/// A BSON regex value, as accepted inside `$in`.
fn regex_literal(needle: &str) -> Value {
    json!({ "$regularExpression": { "pattern": regex::escape(needle), "options": "i" } })
}

fn price_between(min: Option<f64>, max: Option<f64>) -> Value {
    let mut range = Map::new();
    if let Some(min) = min {
        range.insert("$gte".into(), json!(min));
    }
    if let Some(max) = max {
        range.insert("$lte".into(), json!(max));
    }
    field_doc("price.amount", Value::Object(range))
}

/// GeoJSON coordinates are `[lng, lat]`.
fn geo_within(center: GeoPoint, radius_km: f64) -> Value {
    json!({
        "location.coordinates": {
            "$geoWithin": {
                "$centerSphere": [[center.lng, center.lat], radius_km / MONGO_EARTH_RADIUS_KM]
            }
        }
    })
}
