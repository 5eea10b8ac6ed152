//! # Storage Adapters
//!
//! Implementations of the `domains` repository ports.
//!
//! - [`memory`]: concurrent in-process stores that evaluate [`domains::FilterExpr`]
//!   directly. Used by the binary and by tests.
//! - [`mongo`] (feature `db-mongo`): lowering of filter expressions to MongoDB
//!   query documents for a document-store backend.

pub mod memory;
#[cfg(feature = "db-mongo")]
pub mod mongo;

pub use memory::{InMemoryListingRepository, InMemoryMessageRepository};
#[cfg(feature = "db-mongo")]
pub use mongo::to_mongo_filter;
