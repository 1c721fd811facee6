//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose checklist and review use cases to Dart via FRB.
//! - Flatten core records into plain response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call opens its own connection; no state survives between calls
//!   except the resolved database path.
//! - The owner id is supplied by the auth provider on the Dart side.

use journeyflow_core::db::open_db;
use journeyflow_core::model::destinations::{suggest_destinations, DEFAULT_SUGGESTION_LIMIT};
use journeyflow_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, ChecklistConfig, ChecklistState, Item, PackingRepository, RepoError, Review,
    ReviewRepository, Session, SortOrder, SqliteDocumentStore,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_FILE_NAME: &str = "journeyflow.sqlite3";
const DB_PATH_ENV: &str = "JOURNEYFLOW_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error`, case-insensitive.
/// - `log_dir`: absolute directory for rolling log files.
/// - Idempotent for the same arguments.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_default: bool,
    pub created_at_epoch_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub is_checked: bool,
    pub created_at_epoch_ms: i64,
}

/// Checklist screen payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistResponse {
    pub ok: bool,
    pub categories: Vec<CategoryView>,
    pub items: Vec<ItemView>,
    /// Checked share of all items, 0..=100.
    pub completion_percent: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewView {
    pub id: String,
    pub username: String,
    pub destination: String,
    pub rating: u8,
    pub comment: String,
    pub created_at_epoch_ms: i64,
    pub updated_at_epoch_ms: i64,
    /// Whether the requesting owner wrote this review.
    pub is_mine: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewsResponse {
    pub ok: bool,
    pub reviews: Vec<ReviewView>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Identifier of the created record, when one was created.
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn created(message: impl Into<String>, id: String) -> Self {
        Self {
            ok: true,
            id: Some(id),
            message: message.into(),
        }
    }

    fn done(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: None,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Loads the owner's checklist, seeding the default list for new accounts.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn checklist_load(owner_id: String) -> ChecklistResponse {
    let loaded = with_session(&owner_id, None, |store, session| {
        let mut screen = ChecklistState::new(store, session, ChecklistConfig::default());
        screen.refresh()?;
        Ok(ChecklistResponse {
            ok: true,
            categories: screen.categories().iter().map(to_category_view).collect(),
            items: screen.items().iter().map(to_item_view).collect(),
            completion_percent: screen.completion_percent(),
            message: format!(
                "{} of {} item(s) packed.",
                screen.checked_count(),
                screen.items().len()
            ),
        })
    });
    loaded.unwrap_or_else(|message| ChecklistResponse {
        ok: false,
        categories: Vec::new(),
        items: Vec::new(),
        completion_percent: 0,
        message: format!("checklist_load failed: {message}"),
    })
}

/// Creates a category. A blank `color` uses the default category color.
#[flutter_rust_bridge::frb(sync)]
pub fn checklist_add_category(owner_id: String, name: String, color: String) -> ActionResponse {
    let created = with_session(&owner_id, None, |store, session| {
        let mut category = Category {
            name: name.trim().to_string(),
            ..Category::default()
        };
        if !color.trim().is_empty() {
            category.color = color.trim().to_string();
        }
        PackingRepository::new(store, session).add_category(&category)
    });
    match created {
        Ok(id) => ActionResponse::created("Category created.", id),
        Err(err) => ActionResponse::failure(format!("checklist_add_category failed: {err}")),
    }
}

/// Renames or recolors a category and updates its items' category name.
#[flutter_rust_bridge::frb(sync)]
pub fn checklist_update_category(
    owner_id: String,
    category_id: String,
    name: String,
    color: String,
) -> ActionResponse {
    let updated = with_session(&owner_id, None, |store, session| {
        let repo = PackingRepository::new(store, session);
        let current = repo
            .get_category(&category_id)?
            .ok_or_else(|| category_not_found(&category_id))?;
        let category = Category {
            name: name.trim().to_string(),
            color: if color.trim().is_empty() {
                current.color.clone()
            } else {
                color.trim().to_string()
            },
            ..current
        };
        repo.update_category(&category)?;
        repo.sync_category_name(&category)
    });
    match updated {
        Ok(synced) => ActionResponse::done(format!("Category updated; {synced} item(s) renamed.")),
        Err(err) => ActionResponse::failure(format!("checklist_update_category failed: {err}")),
    }
}

/// Deletes a category together with its items.
#[flutter_rust_bridge::frb(sync)]
pub fn checklist_delete_category(owner_id: String, category_id: String) -> ActionResponse {
    let deleted = with_session(&owner_id, None, |store, session| {
        PackingRepository::new(store, session).delete_category(&category_id)
    });
    match deleted {
        Ok(()) => ActionResponse::done("Category deleted."),
        Err(err) => ActionResponse::failure(format!("checklist_delete_category failed: {err}")),
    }
}

/// Creates an unchecked item under an existing category.
#[flutter_rust_bridge::frb(sync)]
pub fn checklist_add_item(owner_id: String, category_id: String, name: String) -> ActionResponse {
    let created = with_session(&owner_id, None, |store, session| {
        let repo = PackingRepository::new(store, session);
        let category = repo
            .get_category(&category_id)?
            .ok_or_else(|| category_not_found(&category_id))?;
        repo.add_item(&Item::new(name.trim(), &category))
    });
    match created {
        Ok(id) => ActionResponse::created("Item added.", id),
        Err(err) => ActionResponse::failure(format!("checklist_add_item failed: {err}")),
    }
}

/// Sets the checked flag of one item.
#[flutter_rust_bridge::frb(sync)]
pub fn checklist_set_item_checked(
    owner_id: String,
    item_id: String,
    checked: bool,
) -> ActionResponse {
    let updated = with_session(&owner_id, None, |store, session| {
        let repo = PackingRepository::new(store, session);
        let item = repo.get_item(&item_id)?.ok_or_else(|| RepoError::NotFound {
            kind: "item",
            id: item_id.clone(),
        })?;
        repo.update_item(&item.with_checked(checked))
    });
    match updated {
        Ok(()) => ActionResponse::done(if checked { "Item packed." } else { "Item unpacked." }),
        Err(err) => ActionResponse::failure(format!("checklist_set_item_checked failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn checklist_delete_item(owner_id: String, item_id: String) -> ActionResponse {
    let deleted = with_session(&owner_id, None, |store, session| {
        PackingRepository::new(store, session).delete_item(&item_id)
    });
    match deleted {
        Ok(()) => ActionResponse::done("Item deleted."),
        Err(err) => ActionResponse::failure(format!("checklist_delete_item failed: {err}")),
    }
}

/// Lists reviews newest first, optionally for one destination.
///
/// `owner_id` only marks which reviews the caller wrote; it may be blank.
#[flutter_rust_bridge::frb(sync)]
pub fn reviews_list(owner_id: String, destination: Option<String>) -> ReviewsResponse {
    let listed = with_session(&owner_id, None, |store, session| {
        let repo = ReviewRepository::new(store, session);
        match destination.as_deref().map(str::trim) {
            Some(destination) if !destination.is_empty() => {
                repo.list_by_destination(destination)
            }
            _ => repo.list_all(SortOrder::CreatedAtDesc),
        }
    });
    match listed {
        Ok(reviews) => {
            let owner_id = owner_id.trim();
            let reviews: Vec<ReviewView> = reviews
                .iter()
                .map(|review| to_review_view(review, owner_id))
                .collect();
            ReviewsResponse {
                ok: true,
                message: format!("{} review(s).", reviews.len()),
                reviews,
            }
        }
        Err(err) => ReviewsResponse {
            ok: false,
            reviews: Vec::new(),
            message: format!("reviews_list failed: {err}"),
        },
    }
}

/// Publishes a review under `username`, or `Anonymous` when blank.
#[flutter_rust_bridge::frb(sync)]
pub fn reviews_add(
    owner_id: String,
    username: Option<String>,
    destination: String,
    rating: u8,
    comment: String,
) -> ActionResponse {
    let created = with_session(&owner_id, username, |store, session| {
        let review = Review::new(destination.trim(), rating, comment.trim());
        ReviewRepository::new(store, session).add(&review)
    });
    match created {
        Ok(id) => ActionResponse::created("Review published.", id),
        Err(err) => ActionResponse::failure(format!("reviews_add failed: {err}")),
    }
}

/// Edits one of the caller's reviews; `updated_at` is refreshed.
#[flutter_rust_bridge::frb(sync)]
pub fn reviews_update(
    owner_id: String,
    review_id: String,
    destination: String,
    rating: u8,
    comment: String,
) -> ActionResponse {
    let updated = with_session(&owner_id, None, |store, session| {
        let repo = ReviewRepository::new(store, session);
        let current = repo.get(&review_id)?.ok_or_else(|| RepoError::NotFound {
            kind: "review",
            id: review_id.clone(),
        })?;
        repo.update(&Review {
            destination: destination.trim().to_string(),
            rating,
            comment: comment.trim().to_string(),
            ..current
        })
    });
    match updated {
        Ok(()) => ActionResponse::done("Review updated."),
        Err(err) => ActionResponse::failure(format!("reviews_update failed: {err}")),
    }
}

/// Deletes one of the caller's reviews.
#[flutter_rust_bridge::frb(sync)]
pub fn reviews_delete(owner_id: String, review_id: String) -> ActionResponse {
    let deleted = with_session(&owner_id, None, |store, session| {
        ReviewRepository::new(store, session).delete(&review_id)
    });
    match deleted {
        Ok(()) => ActionResponse::done("Review deleted."),
        Err(err) => ActionResponse::failure(format!("reviews_delete failed: {err}")),
    }
}

/// Popular destinations containing `input`, for the review form.
#[flutter_rust_bridge::frb(sync)]
pub fn destination_suggestions(input: String) -> Vec<String> {
    suggest_destinations(&input, DEFAULT_SUGGESTION_LIMIT)
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Opens the database and runs `f` as `owner_id`.
///
/// Setup failures and use-case failures both come back as display strings.
fn with_session<T>(
    owner_id: &str,
    display_name: Option<String>,
    f: impl FnOnce(&SqliteDocumentStore<'_>, &Session) -> Result<T, RepoError>,
) -> Result<T, String> {
    let conn = open_db(resolve_db_path()).map_err(|err| {
        warn!("event=ffi_db_open module=ffi status=error");
        format!("database open failed: {err}")
    })?;
    let store = SqliteDocumentStore::try_new(&conn)
        .map_err(|err| format!("store init failed: {err}"))?;
    let session = Session::signed_in(owner_id, display_name);
    f(&store, &session).map_err(|err| err.to_string())
}

fn category_not_found(category_id: &str) -> RepoError {
    RepoError::NotFound {
        kind: "category",
        id: category_id.to_string(),
    }
}

fn to_category_view(category: &Category) -> CategoryView {
    CategoryView {
        id: category.id.clone(),
        name: category.name.clone(),
        color: category.color.clone(),
        is_default: category.is_default,
        created_at_epoch_ms: category.created_at,
    }
}

fn to_item_view(item: &Item) -> ItemView {
    ItemView {
        id: item.id.clone(),
        name: item.name.clone(),
        category_id: item.category_id.clone(),
        category_name: item.category_name.clone(),
        is_checked: item.is_checked,
        created_at_epoch_ms: item.created_at,
    }
}

fn to_review_view(review: &Review, owner_id: &str) -> ReviewView {
    ReviewView {
        id: review.id.clone(),
        username: review.username.clone(),
        destination: review.destination.clone(),
        rating: review.rating,
        comment: review.comment.clone(),
        created_at_epoch_ms: review.created_at,
        updated_at_epoch_ms: review.updated_at,
        is_mine: !owner_id.is_empty() && review.owner_id == owner_id,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        checklist_add_category, checklist_add_item, checklist_delete_category, checklist_load,
        checklist_set_item_checked, checklist_update_category, core_version,
        destination_suggestions, init_logging, ping, reviews_add, reviews_delete, reviews_list,
        reviews_update,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn checklist_load_seeds_new_owner() {
        let owner = unique_token("owner-seed");
        let first = checklist_load(owner.clone());
        assert!(first.ok, "{}", first.message);
        assert_eq!(first.categories.len(), 5);
        assert!(!first.items.is_empty());
        assert_eq!(first.completion_percent, 0);

        let second = checklist_load(owner);
        assert_eq!(second.categories, first.categories);
        assert_eq!(second.items.len(), first.items.len());
    }

    #[test]
    fn checklist_flow_add_check_rename_delete() {
        let owner = unique_token("owner-flow");
        let category = checklist_add_category(owner.clone(), "Clothing".to_string(), String::new());
        assert!(category.ok, "{}", category.message);
        let category_id = category.id.unwrap();

        let item = checklist_add_item(owner.clone(), category_id.clone(), "Socks".to_string());
        assert!(item.ok, "{}", item.message);
        let item_id = item.id.unwrap();

        let checked = checklist_set_item_checked(owner.clone(), item_id.clone(), true);
        assert!(checked.ok, "{}", checked.message);

        let renamed = checklist_update_category(
            owner.clone(),
            category_id.clone(),
            "Clothes".to_string(),
            "#FF03DAC5".to_string(),
        );
        assert!(renamed.ok, "{}", renamed.message);

        let loaded = checklist_load(owner.clone());
        let socks = loaded.items.iter().find(|item| item.id == item_id).unwrap();
        assert!(socks.is_checked);
        assert_eq!(socks.category_name, "Clothes");
        assert_eq!(loaded.completion_percent, 100);

        let deleted = checklist_delete_category(owner.clone(), category_id);
        assert!(deleted.ok, "{}", deleted.message);
        let after = checklist_load(owner);
        assert!(after.items.iter().all(|item| item.id != item_id));
    }

    #[test]
    fn checklist_add_item_requires_known_category() {
        let owner = unique_token("owner-missing");
        let response = checklist_add_item(owner, "missing".to_string(), "Socks".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("not found"));
    }

    #[test]
    fn blank_owner_is_rejected_for_writes() {
        let response = checklist_add_category(String::new(), "Clothing".to_string(), String::new());
        assert!(!response.ok);
        assert!(response.message.contains("not authenticated"));
    }

    #[test]
    fn reviews_round_trip_through_ffi() {
        let owner = unique_token("owner-review");
        let destination = unique_token("Somewhere");
        let created = reviews_add(
            owner.clone(),
            None,
            destination.clone(),
            5,
            "Great trip".to_string(),
        );
        assert!(created.ok, "{}", created.message);
        let review_id = created.id.unwrap();

        let listed = reviews_list(owner.clone(), Some(destination.clone()));
        assert!(listed.ok, "{}", listed.message);
        assert_eq!(listed.reviews.len(), 1);
        assert_eq!(listed.reviews[0].username, "Anonymous");
        assert!(listed.reviews[0].is_mine);

        let stranger = reviews_delete(unique_token("stranger"), review_id.clone());
        assert!(!stranger.ok);
        let removed = reviews_delete(owner.clone(), review_id);
        assert!(removed.ok, "{}", removed.message);
        assert!(reviews_list(owner, Some(destination)).reviews.is_empty());
    }

    #[test]
    fn reviews_update_is_author_only() {
        let owner = unique_token("owner-edit");
        let destination = unique_token("Elsewhere");
        let created = reviews_add(owner.clone(), None, destination.clone(), 3, "Ok".to_string());
        assert!(created.ok, "{}", created.message);
        let review_id = created.id.unwrap();

        let stranger = reviews_update(
            unique_token("stranger"),
            review_id.clone(),
            destination.clone(),
            1,
            "Bad".to_string(),
        );
        assert!(!stranger.ok);
        assert!(stranger.message.contains("not found"));

        let edited = reviews_update(
            owner.clone(),
            review_id.clone(),
            format!(" {destination} "),
            5,
            "Better on a second visit".to_string(),
        );
        assert!(edited.ok, "{}", edited.message);

        let listed = reviews_list(owner, Some(destination));
        assert_eq!(listed.reviews.len(), 1);
        assert_eq!(listed.reviews[0].id, review_id);
        assert_eq!(listed.reviews[0].rating, 5);
        assert_eq!(listed.reviews[0].comment, "Better on a second visit");
        assert!(listed.reviews[0].updated_at_epoch_ms >= listed.reviews[0].created_at_epoch_ms);
    }

    #[test]
    fn reviews_add_rejects_out_of_range_rating() {
        let response = reviews_add(
            unique_token("owner-rating"),
            Some("ana".to_string()),
            "Paris, France".to_string(),
            0,
            "Meh".to_string(),
        );
        assert!(!response.ok);
    }

    #[test]
    fn suggestions_are_capped() {
        assert!(destination_suggestions("a".to_string()).len() <= 5);
        assert_eq!(
            destination_suggestions("paris".to_string()),
            vec!["Paris, France".to_string()]
        );
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
