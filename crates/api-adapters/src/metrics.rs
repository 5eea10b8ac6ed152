//! # Metrics
//!
//! Prometheus counters for the write paths and for discovery searches.
//! Exposed in text format at `GET /metrics`.

use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use services::LocationMetadata;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct SearchLabels {
    fallback: String,
}

/// Process-wide counters. Cheap to share behind an `Arc`; every counter is
/// atomic.
pub struct Metrics {
    registry: Registry,
    listings_created: Counter,
    listings_auto_flagged: Counter,
    messages_flagged: Counter,
    searches: Family<SearchLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("uniconnect");

        let listings_created = Counter::default();
        registry.register("listings_created", "Listings accepted on create", listings_created.clone());

        let listings_auto_flagged = Counter::default();
        registry.register(
            "listings_auto_flagged",
            "Listings held as flagged by moderation",
            listings_auto_flagged.clone(),
        );

        let messages_flagged = Counter::default();
        registry.register("messages_flagged", "Messages held as flagged by moderation", messages_flagged.clone());

        let searches = Family::<SearchLabels, Counter>::default();
        registry.register("searches", "Discovery searches by location strategy", searches.clone());

        Self {
            registry,
            listings_created,
            listings_auto_flagged,
            messages_flagged,
            searches,
        }
    }

    pub fn record_listing_created(&self, auto_flagged: bool) {
        self.listings_created.inc();
        if auto_flagged {
            self.listings_auto_flagged.inc();
        }
    }

    pub fn record_message_flagged(&self) {
        self.messages_flagged.inc();
    }

    /// One increment per strategy that contributed to the search.
    pub fn record_search(&self, location: &LocationMetadata) {
        for tag in &location.fallbacks_used {
            self.searches
                .get_or_create(&SearchLabels { fallback: tag.as_str().to_string() })
                .inc();
        }
    }

    /// The registry in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
