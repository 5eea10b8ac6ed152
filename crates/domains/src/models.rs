//! # Domain Models
//!
//! These structs represent the core entities of UniConnect.
//! We use UUID v4 for globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::geo::GeoPoint;

/// Maximum title length accepted on the write path.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum description length accepted on the write path.
pub const MAX_DESCRIPTION_LEN: usize = 2000;
/// Maximum message body length.
pub const MAX_MESSAGE_LEN: usize = 1000;
/// Listings expire this many days after creation.
pub const LISTING_TTL_DAYS: i64 = 30;

/// The fixed set of listing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Ridesharing,
    PickDrop,
    Jobs,
    BuySell,
    Accommodation,
    CurrencyExchange,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Ridesharing,
        Category::PickDrop,
        Category::Jobs,
        Category::BuySell,
        Category::Accommodation,
        Category::CurrencyExchange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ridesharing => "ridesharing",
            Category::PickDrop => "pick-drop",
            Category::Jobs => "jobs",
            Category::BuySell => "buy-sell",
            Category::Accommodation => "accommodation",
            Category::CurrencyExchange => "currency-exchange",
        }
    }

    /// `pick-drop` and `ridesharing` are two names for the same intent.
    pub fn is_ride(&self) -> bool {
        matches!(self, Category::Ridesharing | Category::PickDrop)
    }

    /// Category equality where the two ride categories are interchangeable.
    pub fn same_intent(&self, other: Category) -> bool {
        *self == other || (self.is_ride() && other.is_ride())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::Validation(format!("unknown category '{s}'")))
    }
}

/// Lifecycle state of a listing. Removal is a status, never a hard delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
    Expired,
    Completed,
    Flagged,
    Removed,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Inactive => "inactive",
            ListingStatus::Expired => "expired",
            ListingStatus::Completed => "completed",
            ListingStatus::Flagged => "flagged",
            ListingStatus::Removed => "removed",
        }
    }
}

impl FromStr for ListingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ListingStatus::Active),
            "inactive" => Ok(ListingStatus::Inactive),
            "expired" => Ok(ListingStatus::Expired),
            "completed" => Ok(ListingStatus::Completed),
            "flagged" => Ok(ListingStatus::Flagged),
            "removed" => Ok(ListingStatus::Removed),
            other => Err(DomainError::Validation(format!("unknown status '{other}'"))),
        }
    }
}

/// Where a listing is. `city` is always present; everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

fn default_country() -> String {
    "UK".to_string()
}

impl Location {
    pub fn in_city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: None,
            country: default_country(),
            address: None,
            coordinates: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceKind {
    #[default]
    Fixed,
    Hourly,
    Negotiable,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub kind: PriceKind,
}

fn default_currency() -> String {
    "GBP".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RideDetails {
    pub from: Option<String>,
    pub to: Option<String>,
    pub departure: Option<DateTime<Utc>>,
    pub seats: Option<u8>,
    #[serde(default)]
    pub recurring: bool,
    pub vehicle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub job_type: Option<JobType>,
    pub company: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccommodationKind {
    PrivateRoom,
    SharedRoom,
    EntirePlace,
    RoommateWanted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccommodationDetails {
    pub kind: Option<AccommodationKind>,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub move_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pets_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub condition: Option<ItemCondition>,
    pub brand: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDetails {
    pub from: Option<String>,
    pub to: Option<String>,
    pub rate: Option<f64>,
    pub amount: Option<f64>,
}

/// Category-specific sub-schema. Exactly one variant may be populated and it
/// must agree with the listing's category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingDetails {
    Ride(RideDetails),
    Job(JobDetails),
    Accommodation(AccommodationDetails),
    Item(ItemDetails),
    Currency(CurrencyDetails),
}

impl ListingDetails {
    pub fn fits(&self, category: Category) -> bool {
        match self {
            ListingDetails::Ride(_) => category.is_ride(),
            ListingDetails::Job(_) => category == Category::Jobs,
            ListingDetails::Accommodation(_) => category == Category::Accommodation,
            ListingDetails::Item(_) => category == Category::BuySell,
            ListingDetails::Currency(_) => category == Category::CurrencyExchange,
        }
    }
}

/// Moderation state persisted onto listings and messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationInfo {
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub flagged_at: Option<DateTime<Utc>>,
    pub auto_flagged: bool,
    pub flagged_keywords: Vec<String>,
}

/// A classified listing (a "post").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: Location,
    pub price: Option<Price>,
    /// Owner of the listing
    pub author: Uuid,
    pub status: ListingStatus,
    pub details: Option<ListingDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub moderation: ModerationInfo,
    /// Times the listing has been opened
    #[serde(default)]
    pub views: u64,
}

impl Listing {
    /// Builds an active listing from a submission. Validation and moderation
    /// happen in the service layer before this is persisted.
    pub fn from_submission(author: Uuid, new: NewListing, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            category: new.category,
            location: new.location,
            price: new.price,
            author,
            status: ListingStatus::Active,
            details: new.details,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(LISTING_TTL_DAYS),
            moderation: ModerationInfo::default(),
            views: 0,
        }
    }

    pub fn ride(&self) -> Option<&RideDetails> {
        match &self.details {
            Some(ListingDetails::Ride(ride)) => Some(ride),
            _ => None,
        }
    }

    /// Non-active listings are only visible to their author and to staff.
    pub fn is_visible_to(&self, viewer: Option<&Actor>) -> bool {
        self.status == ListingStatus::Active
            || viewer.is_some_and(|a| a.id == self.author || a.role.is_staff())
    }
}

/// Payload for creating a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: Location,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub details: Option<ListingDetails>,
}

/// Partial update. No `category` field: a listing's category is fixed at
/// creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub price: Option<Price>,
    pub details: Option<ListingDetails>,
    pub status: Option<ListingStatus>,
}

impl ListingUpdate {
    pub fn touches_text(&self) -> bool {
        self.title.is_some() || self.description.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The identity acting on a resource. Authentication happens upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn user(id: Uuid) -> Self {
        Self { id, role: Role::User }
    }

    pub fn can_manage(&self, listing: &Listing) -> bool {
        self.id == listing.author || self.role.is_staff()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Flagged,
}

/// A direct message between two users, optionally about a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub recipient: Uuid,
    pub listing: Option<Uuid>,
    pub body: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub moderation: ModerationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub recipient: Uuid,
    #[serde(default)]
    pub listing: Option<Uuid>,
    pub body: String,
}
