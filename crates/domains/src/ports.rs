//! # Core Traits (Ports)
//!
//! Any storage adapter must implement these traits to be used by the services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::filter::FilterExpr;
use crate::models::{Listing, Message};

/// Persistence contract for listings.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn insert(&self, listing: Listing) -> Result<Listing, DomainError>;
    async fn get(&self, id: Uuid) -> Result<Option<Listing>, DomainError>;
    /// Replaces the stored listing with the same id.
    async fn update(&self, listing: Listing) -> Result<Listing, DomainError>;
    /// Every listing matching `filter`, in no particular order.
    async fn find(&self, filter: &FilterExpr) -> Result<Vec<Listing>, DomainError>;
    /// Bumps the view counter in place.
    async fn record_view(&self, id: Uuid) -> Result<(), DomainError>;
}

/// Persistence contract for direct messages.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> Result<Message, DomainError>;
    /// Messages sent or received by `user`, newest first.
    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Message>, DomainError>;
}
