//! Core logic for JourneyFlow, a travel companion.
//! This crate is the single source of truth for the packing checklist and
//! destination reviews.

pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod state;
pub mod store;

pub use identity::{IdentityProvider, Session};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::packing::{Category, Item};
pub use model::review::Review;
pub use model::{Record, ValidationError};
pub use repo::packing_repo::{PackingRepository, PackingSnapshot};
pub use repo::review_repo::ReviewRepository;
pub use repo::{RepoError, RepoResult, SortOrder};
pub use state::checklist_state::{
    BootstrapPolicy, CategoryGroup, ChecklistConfig, ChecklistState, ItemFilter,
};
pub use state::reviews_state::{ReviewSort, ReviewsConfig, ReviewsState};
pub use state::{completion_percent, ScreenPhase};
pub use store::{DocumentStore, SqliteDocumentStore, StoreError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
