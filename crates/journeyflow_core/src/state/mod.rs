//! Per-screen view state.
//!
//! # Responsibility
//! - Own the in-memory copy of each list a screen renders.
//! - Track the screen phase and the last error for presentation.
//!
//! # Invariants
//! - A failed refresh keeps previously loaded data.
//! - `last_error` is cleared only by `clear_error`.
//! - Every `refresh` re-enters `Loading`.
//! - Optimistic patches mark the holder stale until the next successful
//!   refresh; `poll_reconcile` refreshes stale holders once the configured
//!   interval has passed.

pub mod checklist_state;
pub mod reviews_state;

use crate::repo::RepoError;
use log::debug;
use std::time::{Duration, Instant};

/// Lifecycle of one screen's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    LoadedWithError,
}

/// Callback notified on each phase change.
pub type PhaseListener = Box<dyn FnMut(ScreenPhase) + Send>;

/// Phase, last error and listener shared by every holder.
#[derive(Default)]
pub(crate) struct ScreenStatus {
    phase: ScreenPhase,
    last_error: Option<String>,
    listener: Option<PhaseListener>,
    last_refresh: Option<Instant>,
    stale: bool,
}

impl ScreenStatus {
    pub(crate) fn phase(&self) -> ScreenPhase {
        self.phase
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn set_listener(&mut self, listener: PhaseListener) {
        self.listener = Some(listener);
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale
    }

    /// Records an optimistic local patch not yet confirmed by a refresh.
    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub(crate) fn mark_refreshed(&mut self, at: Instant) {
        self.last_refresh = Some(at);
        self.stale = false;
    }

    /// Whether a stale holder should refresh at `now`.
    pub(crate) fn reconcile_due(&self, now: Instant, interval: Duration) -> bool {
        self.stale
            && self
                .last_refresh
                .map_or(true, |last| now.saturating_duration_since(last) >= interval)
    }

    pub(crate) fn begin_loading(&mut self) {
        self.transition(ScreenPhase::Loading);
    }

    /// Leaves `Loading`, reporting the error phase while an error is held.
    pub(crate) fn finish_loading(&mut self) {
        let next = if self.last_error.is_some() {
            ScreenPhase::LoadedWithError
        } else {
            ScreenPhase::Loaded
        };
        self.transition(next);
    }

    pub(crate) fn record_error(&mut self, screen: &str, err: &RepoError) {
        debug!("event=screen_error module=state screen={screen} status=error");
        self.last_error = Some(err.to_string());
        if matches!(self.phase, ScreenPhase::Loaded) {
            self.transition(ScreenPhase::LoadedWithError);
        }
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
        if matches!(self.phase, ScreenPhase::LoadedWithError) {
            self.transition(ScreenPhase::Loaded);
        }
    }

    fn transition(&mut self, next: ScreenPhase) {
        if self.phase == next {
            return;
        }
        self.phase = next;
        if let Some(listener) = self.listener.as_mut() {
            listener(next);
        }
    }
}

impl std::fmt::Debug for ScreenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenStatus")
            .field("phase", &self.phase)
            .field("last_error", &self.last_error)
            .field("has_listener", &self.listener.is_some())
            .field("last_refresh", &self.last_refresh)
            .field("stale", &self.stale)
            .finish()
    }
}

/// Share of checked items as a whole percentage, rounded half up.
///
/// Returns 0 when there are no items.
pub fn completion_percent(checked: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let checked = checked.min(total) as u64;
    let total = total as u64;
    ((200 * checked + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::{completion_percent, ScreenPhase, ScreenStatus};
    use crate::repo::RepoError;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[test]
    fn reconcile_is_due_only_when_stale_and_interval_elapsed() {
        let interval = Duration::from_secs(30);
        let start = Instant::now();
        let mut status = ScreenStatus::default();
        assert!(!status.reconcile_due(start, interval));

        status.mark_stale();
        assert!(status.reconcile_due(start, interval));

        status.mark_refreshed(start);
        status.mark_stale();
        assert!(!status.reconcile_due(start + Duration::from_secs(29), interval));
        assert!(status.reconcile_due(start + interval, interval));

        status.mark_refreshed(start + interval);
        assert!(!status.is_stale());
        assert!(!status.reconcile_due(start + interval * 3, interval));
    }

    #[test]
    fn completion_percent_guards_empty_and_rounds() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(4, 4), 100);
    }

    #[test]
    fn status_notifies_listener_and_keeps_error_until_cleared() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut status = ScreenStatus::default();
        status.set_listener(Box::new(move |phase| sink.lock().unwrap().push(phase)));

        status.begin_loading();
        status.record_error("checklist", &RepoError::Unauthenticated);
        status.finish_loading();
        assert_eq!(status.phase(), ScreenPhase::LoadedWithError);

        status.begin_loading();
        status.finish_loading();
        assert!(status.last_error().is_some());

        status.clear_error();
        assert_eq!(status.phase(), ScreenPhase::Loaded);
        assert!(status.last_error().is_none());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ScreenPhase::Loading,
                ScreenPhase::LoadedWithError,
                ScreenPhase::Loading,
                ScreenPhase::LoadedWithError,
                ScreenPhase::Loaded,
            ]
        );
    }
}
