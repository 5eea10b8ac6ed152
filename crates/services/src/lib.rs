//! # UniConnect Services
//!
//! Listing discovery logic (gazetteer, location queries, relevance,
//! moderation) and the use-case services built on the repository ports.
//! Everything except the services themselves is synchronous and pure.

pub mod gazetteer;
pub mod listings;
pub mod location_query;
pub mod messages;
pub mod moderation;
pub mod relevance;
pub mod search_terms;

pub use listings::{
    AuthorListingsRequest, CreatedListing, DiscoveryPage, DiscoveryRequest, DiscoverySettings, ListingPage,
    ListingService, ListingSort, ModerationNotice, Pagination, StatusScope,
};
pub use location_query::{
    add_location_metadata, build_location_query, sort_by_location_relevance, FallbackTag, LocatedListing,
    LocationMetadata, LocationParams, LocationQuery,
};
pub use messages::{MessageService, SentMessage};
pub use moderation::{moderation_report, sanitize_content, should_auto_flag, ContentModerator};
pub use relevance::{rank_by_relevance, SearchQuery};
