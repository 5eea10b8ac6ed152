//! # Moderation results
//!
//! Value types produced by the keyword matcher and merged onto listings and
//! messages at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ModerationInfo;

/// Ordered severity tiers: `None < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Outcome of scanning a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModerationResult {
    pub is_flagged: bool,
    pub severity: Severity,
    /// Deduplicated, in first-seen order
    pub detected_keywords: Vec<String>,
    /// Deduplicated category names, in first-seen order
    pub categories: Vec<String>,
    /// In `[0, 1]`
    pub confidence: f64,
}

impl ModerationResult {
    pub fn clean() -> Self {
        Self::default()
    }

    /// The persisted form of this result.
    pub fn to_info(&self, reason: &str, auto_flagged: bool, at: DateTime<Utc>) -> ModerationInfo {
        ModerationInfo {
            is_flagged: self.is_flagged,
            flag_reason: Some(reason.to_string()),
            flagged_at: Some(at),
            auto_flagged,
            flagged_keywords: self.detected_keywords.clone(),
        }
    }
}
