//! Destination review record.
//!
//! Reviews are global: every signed-in user sees every review, but only the
//! author may change or remove one.

use super::{Record, ValidationError};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Username stamped on reviews whose author has no display name.
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Review {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub username: String,
    /// Free text, loosely matched against the popular destination list.
    pub destination: String,
    /// Star rating, 1..=5.
    pub rating: u8,
    pub comment: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds, refreshed on every write.
    pub updated_at: i64,
}

impl Review {
    /// Creates an unsaved review.
    pub fn new(destination: impl Into<String>, rating: u8, comment: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            rating,
            comment: comment.into(),
            ..Self::default()
        }
    }
}

impl Record for Review {
    const COLLECTION: &'static str = "reviews";
    const KIND: &'static str = "review";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn set_owner_id(&mut self, owner_id: String) {
        self.owner_id = owner_id;
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn set_created_at(&mut self, epoch_ms: i64) {
        self.created_at = epoch_ms;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.destination.trim().is_empty() {
            return Err(ValidationError::BlankDestination);
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        if self.comment.trim().is_empty() {
            return Err(ValidationError::BlankComment);
        }
        Ok(())
    }

    fn touch(&mut self, epoch_ms: i64) {
        self.updated_at = epoch_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::Review;
    use crate::model::{Record, ValidationError};

    #[test]
    fn validate_requires_destination_rating_and_comment() {
        assert!(Review::new("Paris, France", 5, "Great trip").validate().is_ok());
        assert_eq!(
            Review::new(" ", 5, "Great trip").validate(),
            Err(ValidationError::BlankDestination)
        );
        assert_eq!(
            Review::new("Paris, France", 0, "Great trip").validate(),
            Err(ValidationError::RatingOutOfRange(0))
        );
        assert_eq!(
            Review::new("Paris, France", 6, "Great trip").validate(),
            Err(ValidationError::RatingOutOfRange(6))
        );
        assert_eq!(
            Review::new("Paris, France", 3, "").validate(),
            Err(ValidationError::BlankComment)
        );
    }

    #[test]
    fn touch_refreshes_updated_at_only() {
        let mut review = Review::new("Rome, Italy", 4, "Food!");
        review.created_at = 10;
        review.touch(99);
        assert_eq!(review.created_at, 10);
        assert_eq!(review.updated_at, 99);
    }
}
