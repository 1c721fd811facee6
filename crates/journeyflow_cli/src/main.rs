//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive `journeyflow_core` against a local database file.
//! - Print the checklist progress and newest reviews for quick sanity checks.
//!
//! Environment: `JOURNEYFLOW_DB_PATH` (database file, defaults to the temp
//! dir) and `JOURNEYFLOW_OWNER` (owner id, defaults to `demo-traveller`).

use journeyflow_core::db::open_db;
use journeyflow_core::{
    ChecklistConfig, ChecklistState, ReviewSort, ReviewsConfig, ReviewsState, Session,
    SqliteDocumentStore,
};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_OWNER: &str = "demo-traveller";
const REVIEW_PREVIEW: usize = 3;

fn main() -> ExitCode {
    println!("journeyflow_core ping={}", journeyflow_core::ping());
    println!("journeyflow_core version={}", journeyflow_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("journeyflow_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let db_path = env_var("JOURNEYFLOW_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("journeyflow.sqlite3"));
    let owner_id = env_var("JOURNEYFLOW_OWNER").unwrap_or_else(|| DEFAULT_OWNER.to_string());

    let conn = open_db(&db_path).map_err(|err| err.to_string())?;
    let store = SqliteDocumentStore::try_new(&conn).map_err(|err| err.to_string())?;
    let session = Session::signed_in(owner_id.as_str(), None);
    println!("db={} owner={owner_id}", db_path.display());

    let mut checklist = ChecklistState::new(&store, &session, ChecklistConfig::default());
    checklist.refresh().map_err(|err| err.to_string())?;
    for group in checklist.grouped() {
        let packed = group.items.iter().filter(|item| item.is_checked).count();
        println!(
            "  {} [{packed}/{}]",
            group.category.name,
            group.items.len()
        );
    }
    println!(
        "packed {}/{} ({}%)",
        checklist.checked_count(),
        checklist.items().len(),
        checklist.completion_percent()
    );

    let mut reviews = ReviewsState::new(&store, &session, ReviewsConfig::default());
    reviews.refresh().map_err(|err| err.to_string())?;
    for review in reviews
        .visible("", ReviewSort::Newest)
        .into_iter()
        .take(REVIEW_PREVIEW)
    {
        println!(
            "  {} {}/5 by {}",
            review.destination, review.rating, review.username
        );
    }
    println!("reviews={}", reviews.reviews().len());
    Ok(())
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
