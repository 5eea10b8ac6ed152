//! # Handlers
//!
//! Coordinates the flow between HTTP requests and the listing and message
//! services.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use domains::{Category, ListingUpdate, NewListing, NewMessage};
use serde::Deserialize;
use serde_json::{json, Value};
use services::{
    moderation_report, sanitize_content, should_auto_flag, AuthorListingsRequest, DiscoveryRequest, ListingSort,
    LocationParams, StatusScope,
};
use tracing::debug;
use uuid::Uuid;

use super::error::ApiError;
use super::extract::Caller;
use super::AppState;

const METRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Query string of `GET /api/posts`.
#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    pub city: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "priceMin", alias = "price_min")]
    pub price_min: Option<f64>,
    #[serde(rename = "priceMax", alias = "price_max")]
    pub price_max: Option<f64>,
    /// `recent`, `price-low`, `price-high` or `popular`
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ListingsQuery {
    /// `category=all` and an empty category mean no category filter.
    pub fn into_request(self) -> Result<DiscoveryRequest, ApiError> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(c) if c.eq_ignore_ascii_case("all") => None,
            Some(c) => Some(c.parse::<Category>()?),
        };
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse::<ListingSort>()?),
        };

        Ok(DiscoveryRequest {
            location: LocationParams {
                category,
                lat: self.lat,
                lng: self.lng,
                radius_km: self.radius,
                city: self.city,
            },
            search: self.search,
            price_min: self.price_min,
            price_max: self.price_max,
            sort,
            page: self.page,
            limit: self.limit,
        })
    }
}

/// Query string of `GET /api/posts/user/{user_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorListingsQuery {
    /// A status, or `all`. Defaults to `active`.
    pub status: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl AuthorListingsQuery {
    pub fn into_request(self) -> Result<AuthorListingsRequest, ApiError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => StatusScope::default(),
            Some(s) => s.parse::<StatusScope>()?,
        };
        Ok(AuthorListingsRequest {
            status,
            page: self.page,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckContentRequest {
    pub text: String,
    #[serde(default)]
    pub custom_keywords: Vec<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {e}")))?;
    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}

/// `GET /api/posts`: location-aware discovery.
pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    debug!(?query, "discovery request");
    let request = query.into_request()?;

    let page = state.listings.discover(request).await?;
    state.metrics.record_search(&page.location);

    Ok(Json(json!({
        "success": true,
        "posts": page.listings,
        "location": page.location,
        "pagination": page.pagination,
    })))
}

pub async fn get_post(
    State(state): State<AppState>,
    caller: Option<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let viewer = caller.map(|Caller(actor)| actor);
    let listing = state.listings.get_listing(id, viewer.as_ref()).await?;
    Ok(Json(json!({ "success": true, "post": listing })))
}

/// `GET /api/posts/user/{user_id}`: one author's listings.
pub async fn user_posts(
    State(state): State<AppState>,
    caller: Option<Caller>,
    user_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AuthorListingsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(author) = user_id?;
    let Query(query) = query?;
    let viewer = caller.map(|Caller(actor)| actor);

    let page = state
        .listings
        .listings_by_author(viewer.as_ref(), author, query.into_request()?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "posts": page.listings,
        "pagination": page.pagination,
    })))
}

pub async fn create_post(
    State(state): State<AppState>,
    Caller(actor): Caller,
    payload: Result<Json<NewListing>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload?;
    let created = state.listings.create_listing(&actor, new).await?;
    state.metrics.record_listing_created(created.auto_flagged());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Post created successfully",
            "post": created.listing,
            "moderation": created.moderation,
        })),
    ))
}

pub async fn update_post(
    State(state): State<AppState>,
    Caller(actor): Caller,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ListingUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let listing = state.listings.update_listing(&actor, id, update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Post updated successfully",
        "post": listing,
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Caller(actor): Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state.listings.remove_listing(&actor, id).await?;
    Ok(Json(json!({ "success": true, "message": "Post deleted successfully" })))
}

pub async fn send_message(
    State(state): State<AppState>,
    Caller(actor): Caller,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload?;
    let sent = state.messages.send_message(&actor, new).await?;
    if sent.auto_flagged() {
        state.metrics.record_message_flagged();
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Message sent successfully",
            "data": sent.message,
            "moderation": sent.moderation,
        })),
    ))
}

pub async fn inbox(State(state): State<AppState>, Caller(actor): Caller) -> Result<Json<Value>, ApiError> {
    let messages = state.messages.inbox(&actor).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

/// `POST /api/moderation/check`: dry-run the matcher. Staff only.
pub async fn check_content(
    State(state): State<AppState>,
    Caller(actor): Caller,
    payload: Result<Json<CheckContentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if !actor.role.is_staff() {
        return Err(domains::DomainError::Forbidden("Moderator access required".into()).into());
    }
    let Json(request) = payload?;

    let result = state
        .moderator
        .detect_flagged_content(&request.text, &request.custom_keywords);

    Ok(Json(json!({
        "success": true,
        "auto_flag": should_auto_flag(&result),
        "report": moderation_report(&result),
        "sanitized": sanitize_content(&request.text, &result),
        "result": result,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_category_means_unfiltered() {
        let query = ListingsQuery {
            category: Some("All".into()),
            ..Default::default()
        };
        assert_eq!(query.into_request().unwrap().location.category, None);
    }

    #[test]
    fn query_maps_onto_discovery_request() {
        let query = ListingsQuery {
            category: Some("pick-drop".into()),
            lat: Some(53.8),
            lng: Some(-1.55),
            radius: Some(40.0),
            city: Some("Leeds".into()),
            search: Some("lift to york".into()),
            price_min: Some(5.0),
            price_max: None,
            sort: Some("price-high".into()),
            page: Some(2),
            limit: Some(10),
        };
        let request = query.into_request().unwrap();
        assert_eq!(request.location.category, Some(Category::PickDrop));
        assert_eq!(request.location.radius_km, Some(40.0));
        assert_eq!(request.location.point().map(|p| p.lat), Some(53.8));
        assert_eq!(request.search.as_deref(), Some("lift to york"));
        assert_eq!((request.page, request.limit), (Some(2), Some(10)));
        assert_eq!((request.price_min, request.price_max), (Some(5.0), None));
        assert_eq!(request.sort, Some(ListingSort::PriceHigh));
    }

    #[test]
    fn unknown_sort_is_a_validation_error() {
        let query = ListingsQuery {
            sort: Some("cheapest".into()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_request(),
            Err(ApiError::Domain(domains::DomainError::Validation(_)))
        ));
    }

    #[test]
    fn author_query_defaults_to_active() {
        let request = AuthorListingsQuery::default().into_request().unwrap();
        assert_eq!(request.status, StatusScope::Only(domains::ListingStatus::Active));

        let all = AuthorListingsQuery { status: Some("all".into()), ..Default::default() };
        assert_eq!(all.into_request().unwrap().status, StatusScope::All);
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let query = ListingsQuery {
            category: Some("boats".into()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_request(),
            Err(ApiError::Domain(domains::DomainError::Validation(_)))
        ));
    }
}
