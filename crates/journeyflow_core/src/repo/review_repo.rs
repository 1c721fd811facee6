//! Destination review repository.
//!
//! # Responsibility
//! - Global review listing (not owner-scoped), newest first by default.
//! - Author-only update/delete through the owner-scoped collection.

use super::collection::OwnedCollection;
use super::{RepoResult, SortOrder};
use crate::identity::IdentityProvider;
use crate::model::review::{Review, ANONYMOUS_USERNAME};
use crate::model::{FIELD_DESTINATION, FIELD_OWNER_ID};
use crate::store::{DocumentStore, FieldFilter, Query};

pub struct ReviewRepository<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    identity: &'a I,
    reviews: OwnedCollection<'a, S, I, Review>,
}

impl<'a, S, I> ReviewRepository<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    pub fn new(store: &'a S, identity: &'a I) -> Self {
        Self {
            identity,
            reviews: OwnedCollection::new(store, identity),
        }
    }

    /// Lists every review regardless of author.
    pub fn list_all(&self, order: SortOrder) -> RepoResult<Vec<Review>> {
        self.reviews.fetch(&Query::new().order_by(order.order_by()))
    }

    /// Lists reviews whose destination equals `destination` exactly, newest
    /// first.
    pub fn list_by_destination(&self, destination: &str) -> RepoResult<Vec<Review>> {
        self.reviews.fetch(
            &Query::new()
                .filter(FieldFilter::equals(FIELD_DESTINATION, destination.trim()))
                .order_by(SortOrder::CreatedAtDesc.order_by()),
        )
    }

    /// Lists reviews written by `owner_id`, newest first.
    pub fn list_by_owner(&self, owner_id: &str) -> RepoResult<Vec<Review>> {
        self.reviews.fetch(
            &Query::new()
                .filter(FieldFilter::equals(FIELD_OWNER_ID, owner_id))
                .order_by(SortOrder::CreatedAtDesc.order_by()),
        )
    }

    /// Loads one of the signed-in author's reviews.
    pub fn get(&self, review_id: &str) -> RepoResult<Option<Review>> {
        self.reviews.get(review_id)
    }

    /// Persists a new review and returns its store id.
    pub fn add(&self, review: &Review) -> RepoResult<String> {
        self.insert_review(review).map(|stored| stored.id)
    }

    /// Persists a new review and returns the stored copy.
    ///
    /// The destination is trimmed. A blank username is replaced by the
    /// signed-in display name, falling back to `Anonymous`.
    pub fn insert_review(&self, review: &Review) -> RepoResult<Review> {
        let mut review = trimmed(review);
        if review.username.trim().is_empty() {
            review.username = self
                .identity
                .display_name()
                .unwrap_or_else(|| ANONYMOUS_USERNAME.to_string());
        }
        self.reviews.insert_record(&review)
    }

    /// Overwrites one of the author's reviews; `updated_at` is refreshed.
    pub fn update(&self, review: &Review) -> RepoResult<()> {
        self.reviews.update(&trimmed(review))
    }

    pub fn delete(&self, review_id: &str) -> RepoResult<()> {
        self.reviews.delete(review_id)
    }
}

/// Copy of `review` with the destination trimmed, so exact destination
/// filters match what users typed.
fn trimmed(review: &Review) -> Review {
    Review {
        destination: review.destination.trim().to_string(),
        ..review.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::ReviewRepository;
    use crate::db::open_db_in_memory;
    use crate::identity::Session;
    use crate::model::review::Review;
    use crate::repo::{RepoError, SortOrder};
    use crate::store::SqliteDocumentStore;

    #[test]
    fn username_falls_back_to_display_name_then_anonymous() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let named = Session::signed_in("u1", Some("ana".to_string()));
        let unnamed = Session::signed_in("u2", None);

        let by_ana = ReviewRepository::new(&store, &named)
            .insert_review(&Review::new("Paris, France", 5, "Lovely"))
            .unwrap();
        let by_anonymous = ReviewRepository::new(&store, &unnamed)
            .insert_review(&Review::new("Rome, Italy", 4, "Busy"))
            .unwrap();

        assert_eq!(by_ana.username, "ana");
        assert_eq!(by_anonymous.username, "Anonymous");
        assert_eq!(by_ana.created_at, by_ana.updated_at);
    }

    #[test]
    fn listing_is_global_but_writes_are_author_only() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let alice = Session::signed_in("alice", None);
        let bob = Session::signed_in("bob", None);
        let alice_repo = ReviewRepository::new(&store, &alice);
        let bob_repo = ReviewRepository::new(&store, &bob);

        let review = alice_repo
            .insert_review(&Review::new("Tokyo, Japan", 5, "Great food"))
            .unwrap();
        bob_repo
            .add(&Review::new("Tokyo, Japan", 3, "Crowded"))
            .unwrap();

        assert_eq!(bob_repo.list_all(SortOrder::CreatedAtDesc).unwrap().len(), 2);
        assert_eq!(bob_repo.list_by_destination(" Tokyo, Japan ").unwrap().len(), 2);
        assert_eq!(bob_repo.list_by_owner("alice").unwrap(), vec![review.clone()]);
        assert!(matches!(
            bob_repo.delete(&review.id),
            Err(RepoError::NotFound { kind: "review", .. })
        ));
        alice_repo.delete(&review.id).unwrap();
        assert_eq!(bob_repo.list_all(SortOrder::CreatedAtAsc).unwrap().len(), 1);
    }

    #[test]
    fn destinations_are_stored_trimmed() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let session = Session::signed_in("u1", None);
        let repo = ReviewRepository::new(&store, &session);

        let stored = repo
            .insert_review(&Review::new(" Paris, France ", 5, "Great trip"))
            .unwrap();
        assert_eq!(stored.destination, "Paris, France");
        assert_eq!(repo.list_by_destination("Paris, France").unwrap().len(), 1);

        let moved = Review {
            destination: "\tRome, Italy  ".to_string(),
            ..stored
        };
        repo.update(&moved).unwrap();
        let reloaded = repo.get(&moved.id).unwrap().unwrap();
        assert_eq!(reloaded.destination, "Rome, Italy");
        assert_eq!(repo.list_by_destination("Rome, Italy").unwrap().len(), 1);
        assert!(repo.list_by_destination("Paris, France").unwrap().is_empty());
    }

    #[test]
    fn invalid_rating_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let session = Session::signed_in("u1", None);
        let repo = ReviewRepository::new(&store, &session);

        assert!(matches!(
            repo.add(&Review::new("Paris, France", 6, "Too good")),
            Err(RepoError::Validation(_))
        ));
        assert!(repo.list_all(SortOrder::CreatedAtAsc).unwrap().is_empty());
    }
}
