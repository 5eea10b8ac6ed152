//! uniconnect/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for UniConnect.
//! Nothing in this crate performs I/O.

pub mod errors;
pub mod filter;
pub mod geo;
pub mod models;
pub mod moderation;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use filter::*;
pub use geo::*;
pub use models::*;
pub use moderation::*;
pub use ports::*;
