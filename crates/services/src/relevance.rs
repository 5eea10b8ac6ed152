//! # Search Relevance Scorer
//!
//! A fixed, hand-tuned additive heuristic. Scores are only used to reorder
//! candidates and are never handed back to callers.

use chrono::{DateTime, Duration, Utc};
use domains::{Category, Listing};

use crate::search_terms::{category_for_word, tokenize};

const CATEGORY_INTENT: i64 = 5000;
const RIDE_INTENT: i64 = 3000;
const TITLE_PHRASE: i64 = 500;
const TITLE_TOKEN: i64 = 200;
const TITLE_PREFIX: i64 = 100;
const DESCRIPTION_PHRASE: i64 = 150;
const DESCRIPTION_TOKEN: i64 = 50;
const CITY_CONSISTENT: i64 = 100;
const CITY_MISMATCHED: i64 = 5;
const CITY_NEUTRAL: i64 = 30;
const INTENT_PENALTY: i64 = 1000;
const RECENCY_BONUS: i64 = 10;
const RECENCY_WINDOW_DAYS: i64 = 7;

const RIDE_WORDS: [&str; 3] = ["ride", "lift", "car"];
const HOUSING_WORDS: [&str; 3] = ["house", "flat", "apartment"];

/// A preprocessed search query.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    phrase: String,
    tokens: Vec<String>,
    intents: Vec<Category>,
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Self {
        let phrase = raw.trim().to_lowercase();
        let tokens = tokenize(&phrase);
        let intents = tokens.iter().filter_map(|t| category_for_word(t)).collect();
        Self {
            phrase,
            tokens,
            intents,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phrase.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn implies_ride(&self) -> bool {
        RIDE_WORDS.iter().any(|w| self.phrase.contains(w))
    }

    fn implies_housing(&self) -> bool {
        HOUSING_WORDS.iter().any(|w| self.phrase.contains(w))
    }

    fn intent_matches(&self, category: Category) -> bool {
        self.intents.iter().any(|c| c.same_intent(category))
    }
}

/// Relevance of `listing` to `query` at time `now`. Never negative.
pub(crate) fn relevance_score(query: &SearchQuery, listing: &Listing, now: DateTime<Utc>) -> u32 {
    let title = listing.title.to_lowercase();
    let description = listing.description.to_lowercase();
    let city = listing.location.city.to_lowercase();
    let category = listing.category;

    let mut score: i64 = 0;

    if query.intent_matches(category) {
        score += CATEGORY_INTENT;
    }
    if category.is_ride() && query.implies_ride() {
        score += RIDE_INTENT;
    }

    if !query.phrase.is_empty() && title.contains(&query.phrase) {
        score += TITLE_PHRASE;
    }
    if !query.phrase.is_empty() && description.contains(&query.phrase) {
        score += DESCRIPTION_PHRASE;
    }

    let city_credit = if query.intents.is_empty() {
        CITY_NEUTRAL
    } else if query.intent_matches(category) {
        CITY_CONSISTENT
    } else {
        CITY_MISMATCHED
    };

    for token in &query.tokens {
        if title.contains(token.as_str()) {
            score += TITLE_TOKEN;
        }
        if title.starts_with(token.as_str()) {
            score += TITLE_PREFIX;
        }
        if description.contains(token.as_str()) {
            score += DESCRIPTION_TOKEN;
        }
        if city.contains(token.as_str()) {
            score += city_credit;
        }
    }

    if query.implies_ride() && category == Category::Accommodation {
        score -= INTENT_PENALTY;
    }
    if query.implies_housing() && category == Category::Jobs {
        score -= INTENT_PENALTY;
    }

    if listing.created_at > now - Duration::days(RECENCY_WINDOW_DAYS) {
        score += RECENCY_BONUS;
    }

    u32::try_from(score.max(0)).unwrap_or(u32::MAX)
}

/// Orders candidates by descending relevance, newest first among equals.
pub fn rank_by_relevance(query: &SearchQuery, listings: Vec<Listing>, now: DateTime<Utc>) -> Vec<Listing> {
    let mut scored: Vec<(u32, Listing)> = listings
        .into_iter()
        .map(|l| (relevance_score(query, &l, now), l))
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| b.created_at.cmp(&a.created_at)));

    if let Some((top, _)) = scored.first() {
        tracing::debug!(query = %query.phrase, candidates = scored.len(), top_score = top, "ranked search candidates");
    }

    scored.into_iter().map(|(_, l)| l).collect()
}
