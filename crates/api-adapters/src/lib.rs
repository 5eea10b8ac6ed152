//! # api-adapters
//!
//! The HTTP surface of UniConnect.
//!
//! [`metrics`] is framework-independent; everything under [`web`] is built on
//! axum and only compiled with the `web-axum` feature.

pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod web;

pub use metrics::Metrics;
#[cfg(feature = "web-axum")]
pub use web::{router, AppState};
