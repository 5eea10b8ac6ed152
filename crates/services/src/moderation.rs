//! # Content Moderation Matcher
//!
//! Case-insensitive substring matching of text against keyword categories.
//! Each category carries a severity; the strongest matched category decides
//! the result's severity, and a small confidence formula decides whether the
//! content is flagged automatically or left for manual review.

use domains::{ModerationResult, Severity};
use regex::{Captures, RegexBuilder};

/// Category name used for caller-supplied keywords.
pub const CUSTOM_CATEGORY: &str = "custom";

/// Texts longer than this get a confidence penalty.
const LONG_TEXT_CHARS: usize = 1000;

static FLAGGED_KEYWORDS: &[(&str, &[&str])] = &[
    ("spam", &[
        "spam", "scam", "fraud", "fake", "phishing", "click here", "act now",
        "limited time", "urgent", "cash now", "free money", "get rich quick",
        "work from home", "make money fast", "no experience necessary",
    ]),
    ("inappropriate", &[
        "hate", "racist", "discrimination", "violence", "threat", "kill",
        "bomb", "weapon", "drug", "illegal", "stolen", "counterfeit",
    ]),
    ("adult", &[
        "adult", "porn", "xxx", "sex", "escort", "massage", "dating",
        "hookup", "sexy", "nude", "webcam",
    ]),
    ("harassment", &[
        "harass", "bully", "stalker", "creep", "pervert", "loser",
        "stupid", "idiot", "kill yourself", "die",
    ]),
    ("financial", &[
        "bitcoin", "cryptocurrency", "investment", "loan", "credit card",
        "bank account", "social security", "ssn", "tax refund", "irs",
    ]),
];

/// Severity of a category by name. Unknown categories are low.
pub fn severity_for_category(category: &str) -> Severity {
    match category {
        "spam" | "inappropriate" => Severity::Low,
        "adult" | "financial" => Severity::Medium,
        "harassment" => Severity::High,
        "violence" | "threats" | "illegal" => Severity::Critical,
        _ => Severity::Low,
    }
}

#[derive(Debug, Clone)]
struct KeywordCategory {
    name: String,
    keywords: Vec<String>,
}

/// Keyword matcher over a set of categories.
///
/// `ContentModerator::default()` carries the built-in categories. More
/// keywords (or whole new categories such as `violence`) can be layered on
/// at construction with [`ContentModerator::with_keywords`].
#[derive(Debug, Clone)]
pub struct ContentModerator {
    categories: Vec<KeywordCategory>,
    custom_keywords: Vec<String>,
}

impl Default for ContentModerator {
    fn default() -> Self {
        let categories = FLAGGED_KEYWORDS
            .iter()
            .map(|(name, keywords)| KeywordCategory {
                name: name.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect();
        Self {
            categories,
            custom_keywords: Vec::new(),
        }
    }
}

impl ContentModerator {
    /// Adds lowercased keywords to `category`, creating it if needed.
    pub fn with_keywords<I, S>(mut self, category: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let idx = match self.categories.iter().position(|c| c.name == category) {
            Some(idx) => idx,
            None => {
                self.categories.push(KeywordCategory {
                    name: category.to_string(),
                    keywords: Vec::new(),
                });
                self.categories.len() - 1
            }
        };

        let target = &mut self.categories[idx].keywords;
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !target.contains(&keyword) {
                target.push(keyword);
            }
        }
        self
    }

    /// Keywords always checked by [`ContentModerator::check`] under the
    /// `custom` category.
    pub fn with_custom_keywords(mut self, keywords: Vec<String>) -> Self {
        self.custom_keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    /// Keywords of a category; empty for unknown categories.
    pub fn keywords_for(&self, category: &str) -> &[String] {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.keywords.as_slice())
            .unwrap_or(&[])
    }

    fn is_builtin(&self, folded: &str) -> bool {
        self.categories.iter().any(|c| c.keywords.iter().any(|k| k == folded))
    }

    /// Scans text using the configured custom keywords.
    pub fn check(&self, text: &str) -> ModerationResult {
        self.detect_flagged_content(text, &self.custom_keywords)
    }

    pub fn detect_flagged_content(&self, text: &str, custom_keywords: &[String]) -> ModerationResult {
        let content = text.trim().to_lowercase();
        if content.is_empty() {
            return ModerationResult::clean();
        }

        let mut keywords: Vec<String> = Vec::new();
        let mut categories: Vec<String> = Vec::new();
        let mut severity = Severity::None;

        for category in &self.categories {
            let found: Vec<&String> = category
                .keywords
                .iter()
                .filter(|k| content.contains(k.as_str()))
                .collect();
            if found.is_empty() {
                continue;
            }
            push_unique(&mut keywords, found);
            push_unique(&mut categories, [&category.name]);
            severity = severity.max(severity_for_category(&category.name));
        }

        let mut found: Vec<String> = Vec::new();
        for keyword in custom_keywords {
            let keyword = keyword.trim();
            let folded = keyword.to_lowercase();
            if folded.is_empty()
                || self.is_builtin(&folded)
                || found.iter().any(|k| k.to_lowercase() == folded)
            {
                continue;
            }
            if content.contains(&folded) {
                found.push(keyword.to_string());
            }
        }
        if !found.is_empty() {
            push_unique(&mut keywords, &found);
            push_unique(&mut categories, [&CUSTOM_CATEGORY.to_string()]);
            severity = severity.max(Severity::Medium);
        }

        if keywords.is_empty() {
            return ModerationResult::clean();
        }

        let confidence = score_confidence(keywords.len(), &categories, content.chars().count());
        ModerationResult {
            is_flagged: true,
            severity,
            detected_keywords: keywords,
            categories,
            confidence,
        }
    }
}

fn push_unique<'a>(into: &mut Vec<String>, items: impl IntoIterator<Item = &'a String>) {
    for item in items {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

fn score_confidence(keyword_count: usize, categories: &[String], content_chars: usize) -> f64 {
    let mut confidence = (keyword_count as f64 * 0.2).min(0.6);
    confidence += (categories.len() as f64 * 0.1).min(0.2);

    if categories.iter().any(|c| c == "harassment" || c == "violence") {
        confidence += 0.2;
    }
    if content_chars > LONG_TEXT_CHARS {
        confidence *= 0.8;
    }
    confidence.clamp(0.0, 1.0)
}

/// Whether a result is strong enough to hold content for review without a
/// human looking first.
pub fn should_auto_flag(result: &ModerationResult) -> bool {
    if !result.is_flagged {
        return false;
    }
    match result.severity {
        Severity::Critical => true,
        Severity::High => result.confidence >= 0.5,
        Severity::Medium => result.confidence >= 0.7,
        Severity::Low => result.confidence >= 0.9,
        Severity::None => false,
    }
}

/// Human-readable summary with a review recommendation.
pub fn moderation_report(result: &ModerationResult) -> String {
    if !result.is_flagged {
        return "Content passed moderation checks.".to_string();
    }

    let recommendation = if should_auto_flag(result) {
        "Auto-flag for review."
    } else {
        "Manual review suggested."
    };

    format!(
        "Content flagged with {} severity ({}% confidence).\nCategories: {}\nDetected keywords: {}\nRECOMMENDATION: {}",
        result.severity.as_str(),
        (result.confidence * 100.0).round(),
        result.categories.join(", "),
        result.detected_keywords.join(", "),
        recommendation,
    )
}

/// Masks every detected keyword with `*`, case-insensitively.
pub fn sanitize_content(text: &str, result: &ModerationResult) -> String {
    if !result.is_flagged {
        return text.to_string();
    }

    let mut sanitized = text.to_string();
    for keyword in &result.detected_keywords {
        let Ok(re) = RegexBuilder::new(&regex::escape(keyword))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        sanitized = re
            .replace_all(&sanitized, |caps: &Captures| "*".repeat(caps[0].chars().count()))
            .into_owned();
    }
    sanitized
}
