//! Destination reviews screen state.
//!
//! # Responsibility
//! - Hold the loaded reviews, either all of them or one destination's.
//! - Derive the search/sort view and destination suggestions.
//!
//! # Invariants
//! - A new review is shown immediately after it is stored, at the position
//!   the active order gives it.
//! - Refreshing keeps the destination scope of the last load.

use super::{PhaseListener, ScreenPhase, ScreenStatus};
use crate::identity::IdentityProvider;
use crate::model::destinations::{suggest_destinations, DEFAULT_SUGGESTION_LIMIT};
use crate::model::review::Review;
use crate::repo::review_repo::ReviewRepository;
use crate::repo::{RepoError, RepoResult, SortOrder};
use crate::store::DocumentStore;
use log::{info, warn};
use std::time::{Duration, Instant};

const SCREEN: &str = "reviews";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewsConfig {
    pub order: SortOrder,
    pub suggestion_limit: usize,
    /// Minimum gap between a refresh and a reconcile triggered by
    /// `poll_reconcile`.
    pub refresh_interval: Duration,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            order: SortOrder::CreatedAtDesc,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Ordering of the visible review list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSort {
    #[default]
    Newest,
    /// Highest rating first, newest first among equal ratings.
    HighestRated,
}

pub struct ReviewsState<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    repo: ReviewRepository<'a, S, I>,
    config: ReviewsConfig,
    reviews: Vec<Review>,
    destination: Option<String>,
    status: ScreenStatus,
}

impl<'a, S, I> ReviewsState<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    pub fn new(store: &'a S, identity: &'a I, config: ReviewsConfig) -> Self {
        Self {
            repo: ReviewRepository::new(store, identity),
            config,
            reviews: Vec::new(),
            destination: None,
            status: ScreenStatus::default(),
        }
    }

    pub fn set_phase_listener(&mut self, listener: PhaseListener) {
        self.status.set_listener(listener);
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Destination the list is scoped to, if any.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn phase(&self) -> ScreenPhase {
        self.status.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.status.phase() == ScreenPhase::Loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.status.last_error()
    }

    pub fn clear_error(&mut self) {
        self.status.clear_error();
    }

    /// Whether optimistic changes await reconciliation.
    pub fn is_stale(&self) -> bool {
        self.status.is_stale()
    }

    /// Refreshes when an optimistic add is pending and the refresh interval
    /// has elapsed. Returns whether a refresh ran.
    pub fn poll_reconcile(&mut self) -> RepoResult<bool> {
        self.poll_reconcile_at(Instant::now())
    }

    pub fn poll_reconcile_at(&mut self, now: Instant) -> RepoResult<bool> {
        if !self.status.reconcile_due(now, self.config.refresh_interval) {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    /// Reloads the current scope, keeping old data on failure.
    pub fn refresh(&mut self) -> RepoResult<()> {
        self.status.begin_loading();
        let loaded = match self.destination.as_deref() {
            Some(destination) => self.repo.list_by_destination(destination),
            None => self.repo.list_all(self.config.order),
        };
        let result = match loaded {
            Ok(reviews) => {
                info!(
                    "event=screen_refresh module=state screen={SCREEN} status=ok reviews={}",
                    reviews.len()
                );
                self.reviews = reviews;
                self.status.mark_refreshed(Instant::now());
                Ok(())
            }
            Err(err) => {
                self.status.record_error(SCREEN, &err);
                Err(err)
            }
        };
        self.status.finish_loading();
        result
    }

    /// Scopes the list to one destination and reloads.
    ///
    /// A blank destination resets the scope to every review.
    pub fn load_by_destination(&mut self, destination: &str) -> RepoResult<()> {
        let destination = destination.trim();
        self.destination = (!destination.is_empty()).then(|| destination.to_string());
        self.refresh()
    }

    /// Stores a review and places it in the loaded list when it belongs to
    /// the current scope.
    pub fn add(&mut self, review: &Review) -> RepoResult<String> {
        match self.repo.insert_review(review) {
            Ok(stored) => {
                let id = stored.id.clone();
                if self
                    .destination
                    .as_deref()
                    .map_or(true, |destination| destination == stored.destination)
                {
                    let order = self.active_order();
                    order.insert_sorted(&mut self.reviews, stored);
                }
                self.status.mark_stale();
                Ok(id)
            }
            Err(err) => Err(self.write_failed(err)),
        }
    }

    pub fn update(&mut self, review: &Review) -> RepoResult<()> {
        let write = self.repo.update(review).map_err(|err| self.write_failed(err));
        let refreshed = self.refresh();
        write.and(refreshed)
    }

    pub fn delete(&mut self, review_id: &str) -> RepoResult<()> {
        let write = self.repo.delete(review_id).map_err(|err| self.write_failed(err));
        let refreshed = self.refresh();
        write.and(refreshed)
    }

    /// Loaded reviews matching `search` in destination or comment,
    /// case-insensitively, in `sort` order.
    pub fn visible(&self, search: &str, sort: ReviewSort) -> Vec<&Review> {
        let needle = search.trim().to_lowercase();
        let mut visible: Vec<&Review> = self
            .reviews
            .iter()
            .filter(|review| {
                needle.is_empty()
                    || review.destination.to_lowercase().contains(&needle)
                    || review.comment.to_lowercase().contains(&needle)
            })
            .collect();
        match sort {
            ReviewSort::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ReviewSort::HighestRated => visible.sort_by(|a, b| {
                b.rating
                    .cmp(&a.rating)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
        visible
    }

    /// Popular destinations matching `input`.
    pub fn suggestions(&self, input: &str) -> Vec<&'static str> {
        suggest_destinations(input, self.config.suggestion_limit)
    }

    /// Order of the loaded list; destination loads are always newest first.
    fn active_order(&self) -> SortOrder {
        if self.destination.is_some() {
            SortOrder::CreatedAtDesc
        } else {
            self.config.order
        }
    }

    fn write_failed(&mut self, err: RepoError) -> RepoError {
        warn!("event=screen_write module=state screen={SCREEN} status=error");
        self.status.record_error(SCREEN, &err);
        err
    }
}
