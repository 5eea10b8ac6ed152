//! # Listing Service
//!
//! Orchestrates the listing write path (create, update, soft removal) with
//! moderation gating, and the discovery pipeline:
//!
//! location filter ∧ active ∧ unexpired ∧ category ∧ price range
//! ∧ search prefilter → store → relevance rank or newest first
//! → location metadata → location sort → explicit sort → page.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, DomainError, FilterExpr, Listing, ListingRepository, ListingStatus, ListingUpdate,
    Location, ModerationResult, NewListing, Price, Severity, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::location_query::{
    add_location_metadata, build_location_query, sort_by_location_relevance, LocatedListing,
    LocationMetadata, LocationParams,
};
use crate::moderation::{should_auto_flag, ContentModerator};
use crate::relevance::{rank_by_relevance, SearchQuery};
use crate::search_terms::build_search_prefilter;

pub const MIN_TITLE_LEN: usize = 5;
pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MIN_CITY_LEN: usize = 2;
pub const MAX_CITY_LEN: usize = 100;
pub const MAX_RADIUS_KM: f64 = 500.0;

const FLAG_REASON: &str = "Auto-flagged for suspicious content";
const FLAG_REASON_EDIT: &str = "Auto-flagged for suspicious content after edit";

/// Paging and radius defaults for discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscoverySettings {
    pub default_radius_km: f64,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            default_radius_km: 20.0,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    pub location: LocationParams,
    pub search: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub sort: Option<ListingSort>,
    /// 1-based
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// Caller-chosen ordering, applied after relevance and location ordering.
/// Ties fall back to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSort {
    Recent,
    PriceLow,
    PriceHigh,
    Popular,
}

impl ListingSort {
    fn compare(self, a: &Listing, b: &Listing) -> Ordering {
        let newest = b.created_at.cmp(&a.created_at);
        match self {
            ListingSort::Recent => newest,
            ListingSort::PriceLow => by_price(a, b, false).then(newest),
            ListingSort::PriceHigh => by_price(a, b, true).then(newest),
            ListingSort::Popular => b.views.cmp(&a.views).then(newest),
        }
    }

    fn apply(self, listings: &mut [LocatedListing]) {
        listings.sort_by(|a, b| self.compare(&a.listing, &b.listing));
    }
}

impl FromStr for ListingSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recent" => Ok(ListingSort::Recent),
            "price-low" => Ok(ListingSort::PriceLow),
            "price-high" => Ok(ListingSort::PriceHigh),
            "popular" => Ok(ListingSort::Popular),
            other => Err(DomainError::Validation(format!("unknown sort '{other}'"))),
        }
    }
}

/// Unpriced listings sort after priced ones in either direction.
fn by_price(a: &Listing, b: &Listing, descending: bool) -> Ordering {
    match (&a.price, &b.price) {
        (Some(x), Some(y)) if descending => y.amount.total_cmp(&x.amount),
        (Some(x), Some(y)) => x.amount.total_cmp(&y.amount),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Which statuses an author listing covers for viewers allowed to see more
/// than active listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScope {
    All,
    Only(ListingStatus),
}

impl Default for StatusScope {
    fn default() -> Self {
        StatusScope::Only(ListingStatus::Active)
    }
}

impl FromStr for StatusScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusScope::All);
        }
        s.parse::<ListingStatus>().map(StatusScope::Only)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorListingsRequest {
    pub status: StatusScope,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    fn new(page: usize, limit: usize, total_count: usize) -> Self {
        let total_pages = total_count.div_ceil(limit);
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryPage {
    pub listings: Vec<LocatedListing>,
    pub location: LocationMetadata,
    pub pagination: Pagination,
}

/// What the author is told when their text tripped the matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationNotice {
    pub flagged: bool,
    pub severity: Severity,
    pub message: String,
}

impl ModerationNotice {
    pub(crate) fn for_result(result: &ModerationResult, subject: &str) -> Option<Self> {
        result.is_flagged.then(|| Self {
            flagged: true,
            severity: result.severity,
            message: format!(
                "Your {subject} has been flagged for review due to potentially inappropriate content."
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreatedListing {
    pub listing: Listing,
    pub moderation: Option<ModerationNotice>,
}

impl CreatedListing {
    pub fn auto_flagged(&self) -> bool {
        self.listing.status == ListingStatus::Flagged
    }
}

/// Listing use cases over a [`ListingRepository`].
pub struct ListingService {
    repo: Arc<dyn ListingRepository>,
    moderator: Arc<ContentModerator>,
    settings: DiscoverySettings,
}

impl ListingService {
    pub fn new(
        repo: Arc<dyn ListingRepository>,
        moderator: Arc<ContentModerator>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            repo,
            moderator,
            settings,
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Validates, moderates and stores a new listing.
    ///
    /// Flagged text is always recorded on the listing; the listing only
    /// starts out `flagged` when the result crosses the auto-flag threshold.
    pub async fn create_listing(&self, author: &Actor, new: NewListing) -> Result<CreatedListing, DomainError> {
        validate_submission(&new)?;

        let now = Utc::now();
        let mut listing = Listing::from_submission(author.id, new, now);

        let analysis = self.moderator.check(&format!("{} {}", listing.title, listing.description));
        if analysis.is_flagged {
            listing.moderation = analysis.to_info(FLAG_REASON, true, now);
            if should_auto_flag(&analysis) {
                listing.status = ListingStatus::Flagged;
                warn!(
                    author = %author.id,
                    severity = analysis.severity.as_str(),
                    keywords = ?analysis.detected_keywords,
                    "listing auto-flagged on create"
                );
            }
        }

        let listing = self.repo.insert(listing).await?;
        info!(listing_id = %listing.id, category = %listing.category, status = ?listing.status, "listing created");

        Ok(CreatedListing {
            moderation: ModerationNotice::for_result(&analysis, "post"),
            listing,
        })
    }

    /// Fetches a listing and counts the view. Non-active listings look
    /// missing to anyone but their author and staff.
    ///
    /// A failed view count is logged and does not fail the read.
    pub async fn get_listing(&self, id: Uuid, viewer: Option<&Actor>) -> Result<Listing, DomainError> {
        let mut listing = self.fetch(id).await?;
        if !listing.is_visible_to(viewer) {
            return Err(DomainError::not_found("Listing", id));
        }
        match self.repo.record_view(id).await {
            Ok(()) => listing.views = listing.views.saturating_add(1),
            Err(e) => warn!(listing_id = %id, error = %e, "failed to record listing view"),
        }
        Ok(listing)
    }

    /// One author's listings, newest first. The author and staff may pick
    /// any status scope; everyone else sees live listings only.
    pub async fn listings_by_author(
        &self,
        viewer: Option<&Actor>,
        author: Uuid,
        request: AuthorListingsRequest,
    ) -> Result<ListingPage, DomainError> {
        let (page, limit) = self.paging(request.page, request.limit)?;
        let can_view_all = viewer.is_some_and(|v| v.id == author || v.role.is_staff());

        let mut parts = vec![FilterExpr::AuthorIs(author)];
        if can_view_all {
            if let StatusScope::Only(status) = request.status {
                parts.push(FilterExpr::StatusIs(status));
            }
        } else {
            parts.push(FilterExpr::StatusIs(ListingStatus::Active));
            parts.push(FilterExpr::ExpiresAfter(Utc::now()));
        }

        let listings = newest_first(self.repo.find(&FilterExpr::all_of(parts)).await?);
        debug!(%author, can_view_all, found = listings.len(), "author listings fetched");

        let (listings, pagination) = paginate(listings, page, limit);
        Ok(ListingPage { listings, pagination })
    }

    /// Applies a partial update. Only the author and staff may update; only
    /// staff may move a listing into or out of `flagged`.
    pub async fn update_listing(
        &self,
        actor: &Actor,
        id: Uuid,
        update: ListingUpdate,
    ) -> Result<Listing, DomainError> {
        let mut listing = self.fetch(id).await?;
        if listing.status == ListingStatus::Removed {
            return Err(DomainError::not_found("Listing", id));
        }
        if !actor.can_manage(&listing) {
            return Err(DomainError::Forbidden("Not authorized to update this post".into()));
        }
        validate_update(&listing, &update)?;

        if let Some(status) = update.status {
            let touches_flag = status == ListingStatus::Flagged || listing.status == ListingStatus::Flagged;
            if touches_flag && !actor.role.is_staff() && status != listing.status {
                return Err(DomainError::Forbidden("Only moderators can change a flagged status".into()));
            }
        }

        let rescan = update.touches_text();
        if let Some(title) = update.title {
            listing.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            listing.description = description.trim().to_string();
        }
        if let Some(location) = update.location {
            listing.location = location;
        }
        if let Some(price) = update.price {
            listing.price = Some(price);
        }
        if let Some(details) = update.details {
            listing.details = Some(details);
        }
        if let Some(status) = update.status {
            listing.status = status;
        }

        let now = Utc::now();
        if rescan {
            let analysis = self.moderator.check(&format!("{} {}", listing.title, listing.description));
            if should_auto_flag(&analysis) {
                listing.status = ListingStatus::Flagged;
                listing.moderation = analysis.to_info(FLAG_REASON_EDIT, true, now);
                warn!(listing_id = %listing.id, severity = analysis.severity.as_str(), "listing auto-flagged after edit");
            }
        }
        listing.updated_at = now;

        let listing = self.repo.update(listing).await?;
        info!(listing_id = %listing.id, actor = %actor.id, "listing updated");
        Ok(listing)
    }

    /// Soft removal: the listing is kept with status `removed`.
    pub async fn remove_listing(&self, actor: &Actor, id: Uuid) -> Result<(), DomainError> {
        let mut listing = self.fetch(id).await?;
        if listing.status == ListingStatus::Removed {
            return Err(DomainError::not_found("Listing", id));
        }
        if !actor.can_manage(&listing) {
            return Err(DomainError::Forbidden("Not authorized to delete this post".into()));
        }

        listing.status = ListingStatus::Removed;
        listing.updated_at = Utc::now();
        self.repo.update(listing).await?;
        info!(listing_id = %id, actor = %actor.id, "listing removed");
        Ok(())
    }

    /// Runs the discovery pipeline for one page of results.
    pub async fn discover(&self, request: DiscoveryRequest) -> Result<DiscoveryPage, DomainError> {
        let (page, limit) = self.paging(request.page, request.limit)?;
        validate_price_range(request.price_min, request.price_max)?;
        let mut params = request.location;
        validate_location(&params)?;
        params.radius_km.get_or_insert(self.settings.default_radius_km);

        let search = request.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let now = Utc::now();

        // 1. Filter
        let location = build_location_query(&params);
        let mut parts = vec![
            location.filter,
            FilterExpr::StatusIs(ListingStatus::Active),
            FilterExpr::ExpiresAfter(now),
        ];
        if let Some(category) = params.category {
            parts.push(FilterExpr::CategoryIs(category));
        }
        parts.push(FilterExpr::price_between(request.price_min, request.price_max));
        if let Some(prefilter) = search.and_then(build_search_prefilter) {
            parts.push(prefilter);
        }
        let filter = FilterExpr::all_of(parts);

        // 2. Store
        let candidates = self.repo.find(&filter).await?;
        debug!(candidates = candidates.len(), search = ?search, "discovery candidates fetched");

        // 3. Order
        let ordered = match search {
            Some(text) => rank_by_relevance(&SearchQuery::parse(text), candidates, now),
            None => newest_first(candidates),
        };

        // 4. Location metadata
        let user = params.point();
        let mut located = add_location_metadata(ordered, user);
        if user.is_some() && search.is_none() {
            sort_by_location_relevance(&mut located);
        }
        if let Some(sort) = request.sort {
            sort.apply(&mut located);
        }

        // 5. Page
        let (listings, pagination) = paginate(located, page, limit);

        Ok(DiscoveryPage {
            listings,
            location: location.metadata,
            pagination,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Listing, DomainError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Listing", id))
    }

    fn paging(&self, page: Option<usize>, limit: Option<usize>) -> Result<(usize, usize), DomainError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(self.settings.default_page_size);
        if page == 0 {
            return Err(DomainError::Validation("page must be at least 1".into()));
        }
        if limit == 0 || limit > self.settings.max_page_size {
            return Err(DomainError::Validation(format!(
                "limit must be between 1 and {}",
                self.settings.max_page_size
            )));
        }
        Ok((page, limit))
    }
}

fn newest_first(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listings
}

/// Slices one page out of `items`. Pages past the end are empty, including
/// pages whose offset does not fit in `usize`.
fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(page, limit, items.len());
    let offset = page.saturating_sub(1).checked_mul(limit).unwrap_or(usize::MAX);
    (items.into_iter().skip(offset).take(limit).collect(), pagination)
}

fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    let len = char_len(value);
    if len < min || len > max {
        return Err(DomainError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn validate_location_fields(location: &Location) -> Result<(), DomainError> {
    validate_length("City", &location.city, MIN_CITY_LEN, MAX_CITY_LEN)?;
    if let Some(state) = &location.state {
        validate_length("State", state, 0, MAX_CITY_LEN)?;
    }
    if let Some(point) = location.coordinates {
        validate_coordinates(point.lat, point.lng)?;
    }
    Ok(())
}

fn validate_price(price: &Price) -> Result<(), DomainError> {
    if !price.amount.is_finite() || price.amount < 0.0 {
        return Err(DomainError::Validation("Price must be a positive number".into()));
    }
    Ok(())
}

fn validate_submission(new: &NewListing) -> Result<(), DomainError> {
    validate_length("Title", &new.title, MIN_TITLE_LEN, MAX_TITLE_LEN)?;
    validate_length("Description", &new.description, MIN_DESCRIPTION_LEN, MAX_DESCRIPTION_LEN)?;
    validate_location_fields(&new.location)?;
    if let Some(price) = &new.price {
        validate_price(price)?;
    }
    if let Some(details) = &new.details {
        if !details.fits(new.category) {
            return Err(DomainError::Validation(format!(
                "details do not match category '{}'",
                new.category
            )));
        }
    }
    Ok(())
}

fn validate_update(current: &Listing, update: &ListingUpdate) -> Result<(), DomainError> {
    if let Some(title) = &update.title {
        validate_length("Title", title, MIN_TITLE_LEN, MAX_TITLE_LEN)?;
    }
    if let Some(description) = &update.description {
        validate_length("Description", description, MIN_DESCRIPTION_LEN, MAX_DESCRIPTION_LEN)?;
    }
    if let Some(location) = &update.location {
        validate_location_fields(location)?;
    }
    if let Some(price) = &update.price {
        validate_price(price)?;
    }
    if let Some(details) = &update.details {
        if !details.fits(current.category) {
            return Err(DomainError::Validation(format!(
                "details do not match category '{}'",
                current.category
            )));
        }
    }
    if update.status == Some(ListingStatus::Removed) {
        return Err(DomainError::Validation("use removal to remove a post".into()));
    }
    Ok(())
}

fn validate_price_range(min: Option<f64>, max: Option<f64>) -> Result<(), DomainError> {
    for bound in [min, max].into_iter().flatten() {
        if !bound.is_finite() || bound < 0.0 {
            return Err(DomainError::Validation("price bounds must be non-negative numbers".into()));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(DomainError::Validation("priceMin must not exceed priceMax".into()));
        }
    }
    Ok(())
}

fn validate_coordinates(lat: f64, lng: f64) -> Result<(), DomainError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(DomainError::Validation("lat must be between -90 and 90".into()));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(DomainError::Validation("lng must be between -180 and 180".into()));
    }
    Ok(())
}

/// Range checks for discovery location input.
pub fn validate_location(params: &LocationParams) -> Result<(), DomainError> {
    if let Some(lat) = params.lat {
        validate_coordinates(lat, 0.0)?;
    }
    if let Some(lng) = params.lng {
        validate_coordinates(0.0, lng)?;
    }
    if let Some(radius) = params.radius_km {
        if !(radius > 0.0 && radius <= MAX_RADIUS_KM) {
            return Err(DomainError::Validation(format!(
                "radius must be greater than 0 and at most {MAX_RADIUS_KM} km"
            )));
        }
    }
    Ok(())
}
