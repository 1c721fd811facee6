//! Domain records for the packing checklist and destination reviews.
//!
//! # Responsibility
//! - Define the one canonical shape of every persisted record.
//! - Describe what repositories need to know about a record (`Record`).
//!
//! # Invariants
//! - A record's `id` is empty until the store has assigned one.
//! - Wire field names are camelCase; the owner is stored as `userId`.
//! - Every field has a default, so partially written documents decode.

pub mod defaults;
pub mod destinations;
pub mod packing;
pub mod review;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Wire name of the owner field used for owner-scoped queries.
pub const FIELD_OWNER_ID: &str = "userId";
/// Wire name of the creation timestamp.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Wire name of the display name.
pub const FIELD_NAME: &str = "name";
/// Wire name of an item's owning category reference.
pub const FIELD_CATEGORY_ID: &str = "categoryId";
/// Wire name of a review's destination.
pub const FIELD_DESTINATION: &str = "destination";

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Validation failures raised before any write reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Display name is blank after trim.
    BlankName { kind: &'static str },
    /// Color is not `#RRGGBB` or `#AARRGGBB`.
    InvalidColor(String),
    /// Review destination is blank after trim.
    BlankDestination,
    /// Review comment is blank after trim.
    BlankComment,
    /// Review rating outside 1..=5.
    RatingOutOfRange(u8),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName { kind } => write!(f, "{kind} name must not be blank"),
            Self::InvalidColor(value) => {
                write!(f, "color `{value}` must be #RRGGBB or #AARRGGBB")
            }
            Self::BlankDestination => write!(f, "review destination must not be blank"),
            Self::BlankComment => write!(f, "review comment must not be blank"),
            Self::RatingOutOfRange(value) => {
                write!(f, "review rating must be between 1 and 5, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

/// A persisted record owned by one signed-in user.
///
/// Repositories rely on this to stamp ownership and creation time and to
/// fold the store-assigned identifier back into the record.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Store collection holding this record type.
    const COLLECTION: &'static str;
    /// Short lowercase noun used in error messages and log events.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn owner_id(&self) -> &str;
    fn set_owner_id(&mut self, owner_id: String);
    fn created_at(&self) -> i64;
    fn set_created_at(&mut self, epoch_ms: i64);

    /// Value stored under the `name` field, for record types that have one.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Checks field-level invariants before persistence.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Applied on every write after ownership stamping.
    fn touch(&mut self, _epoch_ms: i64) {}
}
