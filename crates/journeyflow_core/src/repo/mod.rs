//! Repository layer over the document store.
//!
//! # Responsibility
//! - Translate domain operations into owner-scoped store calls.
//! - Translate store failures into domain errors; store types never leak.
//!
//! # Invariants
//! - Layout is flat: one top-level collection per record type, scoped by
//!   the `userId` field.
//! - Writes without a signed-in owner fail with `Unauthenticated`.
//! - Owner-scoped reads without a signed-in owner return empty lists.
//! - Update/delete of a missing or foreign document fail with `NotFound`.

pub mod collection;
pub mod packing_repo;
pub mod review_repo;

use crate::model::{Record, ValidationError, FIELD_CREATED_AT, FIELD_NAME};
use crate::store::{OrderBy, StoreError};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Domain-level repository error.
#[derive(Debug)]
pub enum RepoError {
    /// No owner identifier is available.
    Unauthenticated,
    /// Target record does not exist or belongs to another owner.
    NotFound { kind: &'static str, id: String },
    /// Record failed field-level validation.
    Validation(ValidationError),
    /// Any store-level failure, with a human-readable context.
    Persistence { context: String, source: StoreError },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "user not authenticated - please sign in again"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence { source, .. } => Some(source),
            Self::Unauthenticated | Self::NotFound { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl RepoError {
    /// Wraps a store failure, keeping store `NotFound` as a domain `NotFound`.
    pub(crate) fn from_store(kind: &'static str, action: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => Self::NotFound { kind, id },
            other => Self::Persistence {
                context: format!("failed to {action} {kind}"),
                source: other,
            },
        }
    }
}

/// Ordering applied to list calls.
///
/// Screens disagree on ordering, so callers pick one per list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    CreatedAtAsc,
    /// Newest first.
    CreatedAtDesc,
    /// Alphabetical by display name.
    NameAsc,
}

impl SortOrder {
    pub(crate) fn order_by(self) -> OrderBy {
        match self {
            Self::CreatedAtAsc => OrderBy::asc(FIELD_CREATED_AT),
            Self::CreatedAtDesc => OrderBy::desc(FIELD_CREATED_AT),
            Self::NameAsc => OrderBy::asc(FIELD_NAME),
        }
    }

    /// Compares two records by this order's sort key only.
    ///
    /// Records without a name sort first under `NameAsc`, as missing fields
    /// do in the store.
    pub fn compare<R: Record>(self, a: &R, b: &R) -> Ordering {
        match self {
            Self::CreatedAtAsc => a.created_at().cmp(&b.created_at()),
            Self::CreatedAtDesc => b.created_at().cmp(&a.created_at()),
            Self::NameAsc => a.display_name().cmp(&b.display_name()),
        }
    }

    /// Inserts a just-stored record where a fresh list query would place it.
    ///
    /// `sorted` must already follow this order. Sort-key ties break on
    /// insertion sequence in the query direction, so the newest record goes
    /// after its equals when ascending and before them when descending.
    pub fn insert_sorted<R: Record>(self, sorted: &mut Vec<R>, record: R) {
        let index = match self {
            Self::CreatedAtDesc => {
                sorted.partition_point(|existing| self.compare(existing, &record).is_lt())
            }
            Self::CreatedAtAsc | Self::NameAsc => {
                sorted.partition_point(|existing| self.compare(existing, &record).is_le())
            }
        };
        sorted.insert(index, record);
    }
}
