//! # Web layer (axum)
//!
//! Routes, shared state and the middleware stack.

pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use services::{ContentModerator, ListingService, MessageService};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::Metrics;

pub use error::ApiError;
pub use extract::{Caller, USER_ID_HEADER, USER_ROLE_HEADER};

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<ListingService>,
    pub messages: Arc<MessageService>,
    pub moderator: Arc<ContentModerator>,
    pub metrics: Arc<Metrics>,
}

/// Builds the application router.
///
/// Every request gets an `x-request-id` (generated when absent) that is
/// echoed back on the response.
pub fn router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/posts", get(handlers::list_posts).post(handlers::create_post))
        .route(
            "/api/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/api/posts/user/{user_id}", get(handlers::user_posts))
        .route("/api/messages", get(handlers::inbox).post(handlers::send_message))
        .route("/api/moderation/check", post(handlers::check_content))
        .layer(middleware)
        .with_state(state)
}
