//! # Search term analysis
//!
//! Static vocabularies that interpret free-text searches: which category a
//! word implies, which words are synonyms, and which tokens name a city.
//! [`build_search_prefilter`] turns a query into a coarse store-side filter
//! that narrows candidates before in-memory ranking.

use std::collections::HashMap;

use domains::{Category, FilterExpr, TextField};
use once_cell::sync::Lazy;

/// Query tokens shorter than this are ignored.
pub const MIN_TOKEN_LEN: usize = 3;

static SYNONYMS: &[(&str, &[&str])] = &[
    // Accommodation
    ("house", &["home", "property", "residence"]),
    ("flat", &["apartment", "unit"]),
    ("room", &["bedroom", "space"]),
    ("housing", &["accommodation", "lodging"]),
    ("studio", &["bedsit"]),
    // Transport
    ("ride", &["lift", "transport", "trip"]),
    ("car", &["vehicle", "auto"]),
    ("drive", &["driving"]),
    // Jobs
    ("job", &["work", "employment", "position"]),
    ("part-time", &["parttime", "part time"]),
    ("full-time", &["fulltime", "full time"]),
    // Location
    ("near", &["close", "nearby", "around"]),
    ("city", &["town", "area"]),
    ("center", &["centre", "central"]),
    // Price
    ("cheap", &["affordable", "budget", "low cost"]),
    ("expensive", &["costly", "premium", "high end"]),
];

static CATEGORY_WORDS: &[(&str, Category)] = &[
    ("house", Category::Accommodation),
    ("home", Category::Accommodation),
    ("flat", Category::Accommodation),
    ("apartment", Category::Accommodation),
    ("room", Category::Accommodation),
    ("housing", Category::Accommodation),
    ("accommodation", Category::Accommodation),
    ("studio", Category::Accommodation),
    ("bedsit", Category::Accommodation),
    ("ride", Category::PickDrop),
    ("lift", Category::PickDrop),
    ("car", Category::PickDrop),
    ("transport", Category::PickDrop),
    ("driving", Category::PickDrop),
    ("job", Category::Jobs),
    ("work", Category::Jobs),
    ("employment", Category::Jobs),
    ("position", Category::Jobs),
    ("career", Category::Jobs),
    ("buy", Category::BuySell),
    ("sell", Category::BuySell),
    ("marketplace", Category::BuySell),
    ("shop", Category::BuySell),
    ("currency", Category::CurrencyExchange),
    ("exchange", Category::CurrencyExchange),
    ("money", Category::CurrencyExchange),
];

static CITY_VARIATIONS: &[(&str, &[&str])] = &[
    ("london", &["ldn", "greater london"]),
    ("manchester", &["manc", "mcr"]),
    ("birmingham", &["bham", "birmingam"]),
    ("liverpool", &["lvpl", "pool"]),
    ("newcastle", &["newcastle upon tyne", "tyne", "newcastle-upon-tyne"]),
    ("edinburgh", &["edinboro", "edi"]),
    ("glasgow", &["gla"]),
    ("cardiff", &["caerdydd"]),
    ("bristol", &["bristle"]),
    ("leeds", &["leed"]),
    ("sheffield", &["sheff"]),
    ("leicester", &["lester"]),
    ("coventry", &["cov"]),
    ("nottingham", &["notts", "nottinghamshire"]),
    ("oxford", &["oxf"]),
    ("cambridge", &["cam", "cambs"]),
];

const LOCATION_PREPOSITIONS: &[&str] = &["in", "at", "near", "around"];

static CATEGORY_INDEX: Lazy<HashMap<&'static str, Category>> =
    Lazy::new(|| CATEGORY_WORDS.iter().copied().collect());

/// Lowercased, whitespace-split tokens longer than two characters.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// The category a single word implies, if any.
pub fn category_for_word(word: &str) -> Option<Category> {
    CATEGORY_INDEX.get(word.to_lowercase().as_str()).copied()
}

/// Distinct categories implied by the tokens, in first-seen order.
pub fn extract_categories(tokens: &[String]) -> Vec<Category> {
    let mut out = Vec::new();
    for category in tokens.iter().filter_map(|t| category_for_word(t)) {
        if !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

/// The word itself plus every synonym it belongs to.
pub fn expand_with_synonyms(word: &str) -> Vec<String> {
    let lower = word.to_lowercase();
    let mut expanded = vec![lower.clone()];

    for &(head, synonyms) in SYNONYMS {
        let related: Vec<&str> = if head == lower {
            synonyms.to_vec()
        } else if synonyms.contains(&lower.as_str()) {
            std::iter::once(head).chain(synonyms.iter().copied()).collect()
        } else {
            continue;
        };

        for w in related {
            if !expanded.iter().any(|e| e == w) {
                expanded.push(w.to_string());
            }
        }
    }
    expanded
}

/// Maps common abbreviations and misspellings to the canonical lowercase
/// city name. Unknown names are returned lowercased and trimmed.
pub fn normalize_city_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    CITY_VARIATIONS
        .iter()
        .find(|(standard, variations)| *standard == lower || variations.contains(&lower.as_str()))
        .map(|(standard, _)| standard.to_string())
        .unwrap_or(lower)
}

fn is_known_city(name: &str) -> bool {
    CITY_VARIATIONS
        .iter()
        .any(|(standard, variations)| *standard == name || variations.contains(&name))
}

/// City names mentioned in the query, either after a location preposition
/// ("in leeds") or directly as a known city token.
pub fn extract_locations(words: &[&str]) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    let mut push = |h: String| {
        if !hints.contains(&h) {
            hints.push(h);
        }
    };

    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if LOCATION_PREPOSITIONS.contains(&lower.as_str()) {
            if let Some(next) = words.get(i + 1) {
                push(normalize_city_name(next));
            }
        }
        let normalized = normalize_city_name(&lower);
        if is_known_city(&normalized) {
            push(normalized);
        }
    }
    hints
}

/// Coarse candidate filter for a free-text search.
///
/// Matches listings in any implied category, listings whose title or
/// description contains the phrase, a token or one of its synonyms, and
/// listings located in a mentioned city. Returns `None` for blank queries.
pub fn build_search_prefilter(query: &str) -> Option<FilterExpr> {
    let phrase = query.trim().to_lowercase();
    if phrase.is_empty() {
        return None;
    }

    let words: Vec<&str> = phrase.split_whitespace().collect();
    let tokens = tokenize(&phrase);

    let mut needles = vec![phrase.clone()];
    for token in &tokens {
        for word in expand_with_synonyms(token) {
            if !needles.contains(&word) {
                needles.push(word);
            }
        }
    }

    let mut conditions: Vec<FilterExpr> = extract_categories(&tokens)
        .into_iter()
        .flat_map(|c| {
            if c.is_ride() {
                vec![FilterExpr::CategoryIs(Category::PickDrop), FilterExpr::CategoryIs(Category::Ridesharing)]
            } else {
                vec![FilterExpr::CategoryIs(c)]
            }
        })
        .collect();

    conditions.push(FilterExpr::contains_any(TextField::Title, needles.clone()));
    conditions.push(FilterExpr::contains_any(TextField::Description, needles));

    let locations = extract_locations(&words);
    if !locations.is_empty() {
        conditions.push(FilterExpr::contains_any(TextField::City, locations.clone()));
        conditions.push(FilterExpr::contains_any(TextField::Address, locations));
    }

    Some(FilterExpr::any_of(conditions))
}
