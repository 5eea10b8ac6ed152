//! # Message Service
//!
//! Direct messages between users. Bodies go through the same keyword
//! matcher as listings; auto-flagged messages are stored but marked.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, DomainError, ListingRepository, Message, MessageRepository, MessageStatus, ModerationInfo,
    NewMessage, MAX_MESSAGE_LEN,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::listings::ModerationNotice;
use crate::moderation::{should_auto_flag, ContentModerator};

const FLAG_REASON: &str = "Auto-flagged for suspicious content";

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub moderation: Option<ModerationNotice>,
}

impl SentMessage {
    pub fn auto_flagged(&self) -> bool {
        self.message.status == MessageStatus::Flagged
    }
}

pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    listings: Arc<dyn ListingRepository>,
    moderator: Arc<ContentModerator>,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        listings: Arc<dyn ListingRepository>,
        moderator: Arc<ContentModerator>,
    ) -> Self {
        Self {
            messages,
            listings,
            moderator,
        }
    }

    pub async fn send_message(&self, sender: &Actor, new: NewMessage) -> Result<SentMessage, DomainError> {
        let body = new.body.trim();
        let len = body.chars().count();
        if len == 0 || len > MAX_MESSAGE_LEN {
            return Err(DomainError::Validation(format!(
                "Message must be between 1 and {MAX_MESSAGE_LEN} characters"
            )));
        }
        if new.recipient == sender.id {
            return Err(DomainError::Validation("Cannot send message to yourself".into()));
        }
        if let Some(listing_id) = new.listing {
            if self.listings.get(listing_id).await?.is_none() {
                return Err(DomainError::not_found("Listing", listing_id));
            }
        }

        let now = Utc::now();
        let analysis = self.moderator.check(body);
        let (status, moderation) = if should_auto_flag(&analysis) {
            warn!(sender = %sender.id, severity = analysis.severity.as_str(), "message auto-flagged");
            (MessageStatus::Flagged, analysis.to_info(FLAG_REASON, true, now))
        } else {
            (MessageStatus::Sent, ModerationInfo::default())
        };

        let message = Message {
            id: Uuid::new_v4(),
            sender: sender.id,
            recipient: new.recipient,
            listing: new.listing,
            body: body.to_string(),
            status,
            created_at: now,
            moderation,
        };
        let message = self.messages.insert(message).await?;
        info!(message_id = %message.id, recipient = %message.recipient, "message sent");

        Ok(SentMessage {
            moderation: ModerationNotice::for_result(&analysis, "message"),
            message,
        })
    }

    /// Messages the actor sent or received, newest first.
    pub async fn inbox(&self, actor: &Actor) -> Result<Vec<Message>, DomainError> {
        self.messages.list_for_user(actor.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockListingRepository, MockMessageRepository};

    fn service(messages: MockMessageRepository, listings: MockListingRepository) -> MessageService {
        MessageService::new(
            Arc::new(messages),
            Arc::new(listings),
            Arc::new(ContentModerator::default()),
        )
    }

    fn note(body: &str) -> NewMessage {
        NewMessage {
            recipient: Uuid::new_v4(),
            listing: None,
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn clean_message_is_sent() {
        let mut messages = MockMessageRepository::new();
        messages.expect_insert().times(1).returning(Ok);

        let sent = service(messages, MockListingRepository::new())
            .send_message(&Actor::user(Uuid::new_v4()), note("  Is the room still free?  "))
            .await
            .unwrap();
        assert_eq!(sent.message.body, "Is the room still free?");
        assert_eq!(sent.message.status, MessageStatus::Sent);
        assert!(sent.moderation.is_none());
    }

    #[tokio::test]
    async fn abusive_message_is_flagged() {
        let mut messages = MockMessageRepository::new();
        messages.expect_insert()
            .withf(|m| m.status == MessageStatus::Flagged && m.moderation.is_flagged)
            .returning(Ok);

        let sent = service(messages, MockListingRepository::new())
            .send_message(&Actor::user(Uuid::new_v4()), note("You stupid idiot"))
            .await
            .unwrap();
        assert!(sent.auto_flagged());
        assert!(sent.moderation.is_some_and(|n| n.message.contains("message")));
    }

    #[tokio::test]
    async fn low_severity_message_is_sent_with_notice() {
        let mut messages = MockMessageRepository::new();
        messages.expect_insert().returning(Ok);

        let sent = service(messages, MockListingRepository::new())
            .send_message(&Actor::user(Uuid::new_v4()), note("Totally not a scam"))
            .await
            .unwrap();
        assert_eq!(sent.message.status, MessageStatus::Sent);
        assert!(!sent.message.moderation.is_flagged);
        assert!(sent.moderation.is_some());
    }

    #[tokio::test]
    async fn rejects_self_messages_and_blank_bodies() {
        let mut messages = MockMessageRepository::new();
        messages.expect_insert().never();
        let svc = service(messages, MockListingRepository::new());
        let me = Actor::user(Uuid::new_v4());

        let to_self = NewMessage { recipient: me.id, listing: None, body: "hello".into() };
        assert!(matches!(svc.send_message(&me, to_self).await, Err(DomainError::Validation(_))));
        assert!(matches!(svc.send_message(&me, note("   ")).await, Err(DomainError::Validation(_))));
        let long = "a".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(svc.send_message(&me, note(&long)).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn related_listing_must_exist() {
        let mut listings = MockListingRepository::new();
        listings.expect_get().returning(|_| Ok(None));
        let mut messages = MockMessageRepository::new();
        messages.expect_insert().never();

        let mut msg = note("About your bike");
        msg.listing = Some(Uuid::new_v4());
        let res = service(messages, listings).send_message(&Actor::user(Uuid::new_v4()), msg).await;
        assert!(matches!(res, Err(DomainError::NotFound { .. })));
    }
}
