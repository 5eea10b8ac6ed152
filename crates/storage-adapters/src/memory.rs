//! # In-memory repositories
//!
//! `DashMap`-backed stores keyed by id. Safe to share across tasks behind an
//! `Arc`; no operation holds a shard lock across an await point.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{DomainError, FilterExpr, Listing, ListingRepository, Message, MessageRepository};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryListingRepository {
    listings: DashMap<Uuid, Listing>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load, replacing listings with the same id.
    pub fn with_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        let repo = Self::new();
        for listing in listings {
            repo.listings.insert(listing.id, listing);
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn insert(&self, listing: Listing) -> Result<Listing, DomainError> {
        match self.listings.entry(listing.id) {
            Entry::Occupied(_) => Err(DomainError::Storage(format!("listing {} already exists", listing.id))),
            Entry::Vacant(slot) => {
                slot.insert(listing.clone());
                Ok(listing)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        Ok(self.listings.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, listing: Listing) -> Result<Listing, DomainError> {
        match self.listings.get_mut(&listing.id) {
            Some(mut entry) => {
                *entry = listing.clone();
                Ok(listing)
            }
            None => Err(DomainError::not_found("Listing", listing.id)),
        }
    }

    async fn find(&self, filter: &FilterExpr) -> Result<Vec<Listing>, DomainError> {
        let hits: Vec<Listing> = self
            .listings
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        tracing::trace!(hits = hits.len(), total = self.listings.len(), "in-memory listing scan");
        Ok(hits)
    }

    async fn record_view(&self, id: Uuid) -> Result<(), DomainError> {
        match self.listings.get_mut(&id) {
            Some(mut entry) => {
                entry.views = entry.views.saturating_add(1);
                Ok(())
            }
            None => Err(DomainError::not_found("Listing", id)),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: DashMap<Uuid, Message>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> Result<Message, DomainError> {
        match self.messages.entry(message.id) {
            Entry::Occupied(_) => Err(DomainError::Storage(format!("message {} already exists", message.id))),
            Entry::Vacant(slot) => {
                slot.insert(message.clone());
                Ok(message)
            }
        }
    }

    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Message>, DomainError> {
        let mut out: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.value().sender == user || entry.value().recipient == user)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
