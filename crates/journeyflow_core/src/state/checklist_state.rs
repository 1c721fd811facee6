//! Packing checklist screen state.
//!
//! # Responsibility
//! - Hold categories and items for the checklist screen.
//! - Apply optimistic adds; refresh after updates and deletes.
//! - Seed the default packing list according to `BootstrapPolicy`.
//!
//! # Invariants
//! - Optimistic adds mark the holder stale until the next refresh.
//! - Bootstrap never runs for a signed-out session.

use super::{completion_percent, PhaseListener, ScreenPhase, ScreenStatus};
use crate::identity::IdentityProvider;
use crate::model::defaults::{default_categories, default_items_for};
use crate::model::packing::{Category, Item};
use crate::repo::packing_repo::PackingRepository;
use crate::repo::{RepoError, RepoResult, SortOrder};
use crate::store::DocumentStore;
use log::{info, warn};
use std::time::{Duration, Instant};

const SCREEN: &str = "checklist";

/// When the default packing list is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapPolicy {
    /// Reseed categories whenever none exist, then items whenever none exist.
    Always,
    /// Seed only when the owner has neither categories nor items.
    #[default]
    FreshAccountOnly,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistConfig {
    pub category_order: SortOrder,
    pub item_order: SortOrder,
    pub bootstrap: BootstrapPolicy,
    /// Minimum gap between a refresh and a reconcile triggered by
    /// `poll_reconcile`.
    pub refresh_interval: Duration,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self {
            category_order: SortOrder::CreatedAtAsc,
            item_order: SortOrder::CreatedAtAsc,
            bootstrap: BootstrapPolicy::default(),
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Conjunctive item filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub remaining_only: bool,
    pub category_id: Option<String>,
    /// Case-insensitive substring of the item name.
    pub search: Option<String>,
}

impl ItemFilter {
    fn matches(&self, item: &Item, needle: Option<&str>) -> bool {
        if self.remaining_only && item.is_checked {
            return false;
        }
        if let Some(category_id) = &self.category_id {
            if &item.category_id != category_id {
                return false;
            }
        }
        needle.map_or(true, |needle| item.name.to_lowercase().contains(needle))
    }
}

/// One category and the items filed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'s> {
    pub category: &'s Category,
    pub items: Vec<&'s Item>,
}

pub struct ChecklistState<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    repo: PackingRepository<'a, S, I>,
    config: ChecklistConfig,
    categories: Vec<Category>,
    items: Vec<Item>,
    status: ScreenStatus,
}

impl<'a, S, I> ChecklistState<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    pub fn new(store: &'a S, identity: &'a I, config: ChecklistConfig) -> Self {
        Self {
            repo: PackingRepository::new(store, identity),
            config,
            categories: Vec::new(),
            items: Vec::new(),
            status: ScreenStatus::default(),
        }
    }

    pub fn set_phase_listener(&mut self, listener: PhaseListener) {
        self.status.set_listener(listener);
    }

    pub fn config(&self) -> &ChecklistConfig {
        &self.config
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn items(&self) -> &[Item] {
        &self.items
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

    /// Reloads both lists, seeding defaults first when the policy asks for it.
    ///
    /// On failure the previous lists are kept and the error is recorded.
    pub fn refresh(&mut self) -> RepoResult<()> {
        self.status.begin_loading();
        let result = self.load();
        if let Err(err) = &result {
            self.status.record_error(SCREEN, err);
        }
        self.status.finish_loading();
        result
    }

    /// Refreshes when optimistic changes are pending and the refresh
    /// interval has elapsed. Returns whether a refresh ran.
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

    /// Persists a category and places the stored copy locally in
    /// `category_order`.
    pub fn add_category(&mut self, category: &Category) -> RepoResult<String> {
        let stored = self.track(|repo| repo.insert_category(category))?;
        let id = stored.id.clone();
        self.config
            .category_order
            .insert_sorted(&mut self.categories, stored);
        self.status.mark_stale();
        Ok(id)
    }

    /// Persists an item and places the stored copy locally in `item_order`.
    pub fn add_item(&mut self, item: &Item) -> RepoResult<String> {
        let stored = self.track(|repo| repo.insert_item(item))?;
        let id = stored.id.clone();
        self.config.item_order.insert_sorted(&mut self.items, stored);
        self.status.mark_stale();
        Ok(id)
    }

    /// Overwrites a category, rewrites its items' category name, then
    /// refreshes.
    pub fn update_category(&mut self, category: &Category) -> RepoResult<()> {
        let write = self.track(|repo| {
            repo.update_category(category)?;
            repo.sync_category_name(category).map(|_| ())
        });
        self.refresh_after(write)
    }

    /// Deletes a category with its items, then refreshes.
    pub fn delete_category(&mut self, category_id: &str) -> RepoResult<()> {
        let write = self.track(|repo| repo.delete_category(category_id));
        self.refresh_after(write)
    }

    pub fn update_item(&mut self, item: &Item) -> RepoResult<()> {
        let write = self.track(|repo| repo.update_item(item));
        self.refresh_after(write)
    }

    pub fn delete_item(&mut self, item_id: &str) -> RepoResult<()> {
        let write = self.track(|repo| repo.delete_item(item_id));
        self.refresh_after(write)
    }

    /// Flips the checked flag of a loaded item.
    pub fn toggle_item(&mut self, item_id: &str) -> RepoResult<()> {
        let checked = self.loaded_item(item_id)?.is_checked;
        self.set_item_checked(item_id, !checked)
    }

    pub fn set_item_checked(&mut self, item_id: &str, checked: bool) -> RepoResult<()> {
        let item = self.loaded_item(item_id)?.clone().with_checked(checked);
        self.update_item(&item)
    }

    pub fn remaining_items(&self) -> Vec<&Item> {
        self.items.iter().filter(|item| !item.is_checked).collect()
    }

    pub fn items_in_category(&self, category_id: &str) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.category_id == category_id)
            .collect()
    }

    /// Items grouped under their categories, in category order.
    pub fn grouped(&self) -> Vec<CategoryGroup<'_>> {
        self.categories
            .iter()
            .map(|category| CategoryGroup {
                category,
                items: self.items_in_category(&category.id),
            })
            .collect()
    }

    /// Items whose category is not loaded.
    pub fn orphaned_items(&self) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| {
                !self
                    .categories
                    .iter()
                    .any(|category| category.id == item.category_id)
            })
            .collect()
    }

    pub fn filtered_items(&self, filter: &ItemFilter) -> Vec<&Item> {
        let needle = filter
            .search
            .as_deref()
            .map(|search| search.trim().to_lowercase())
            .filter(|search| !search.is_empty());
        self.items
            .iter()
            .filter(|item| filter.matches(item, needle.as_deref()))
            .collect()
    }

    /// Categories whose name contains `query`, case-insensitively.
    pub fn search_categories(&self, query: &str) -> Vec<&Category> {
        let needle = query.trim().to_lowercase();
        self.categories
            .iter()
            .filter(|category| needle.is_empty() || category.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_checked).count()
    }

    pub fn completion_percent(&self) -> u8 {
        completion_percent(self.checked_count(), self.items.len())
    }

    fn load(&mut self) -> RepoResult<()> {
        let mut snapshot = self
            .repo
            .snapshot(self.config.category_order, self.config.item_order)?;

        if self.bootstrap(&snapshot.categories, &snapshot.items)? {
            snapshot = self
                .repo
                .snapshot(self.config.category_order, self.config.item_order)?;
        }

        self.categories = snapshot.categories;
        self.items = snapshot.items;
        self.status.mark_refreshed(Instant::now());
        info!(
            "event=screen_refresh module=state screen={SCREEN} status=ok categories={} items={}",
            self.categories.len(),
            self.items.len()
        );
        Ok(())
    }

    /// Writes default data when the policy applies. Returns whether anything
    /// was written.
    fn bootstrap(&self, categories: &[Category], items: &[Item]) -> RepoResult<bool> {
        if !self.repo.is_authenticated() {
            return Ok(false);
        }
        match self.config.bootstrap {
            BootstrapPolicy::Disabled => Ok(false),
            BootstrapPolicy::FreshAccountOnly => {
                if !categories.is_empty() || !items.is_empty() {
                    return Ok(false);
                }
                self.repo.seed_default_packing_list()?;
                Ok(true)
            }
            BootstrapPolicy::Always => {
                let mut wrote = false;
                let mut seeded_categories = Vec::new();
                let categories = if categories.is_empty() {
                    for category in default_categories() {
                        seeded_categories.push(self.repo.insert_category(&category)?);
                    }
                    wrote = true;
                    seeded_categories.as_slice()
                } else {
                    categories
                };
                if items.is_empty() {
                    for item in default_items_for(categories) {
                        self.repo.add_item(&item)?;
                        wrote = true;
                    }
                }
                if wrote {
                    info!("event=checklist_bootstrap module=state status=ok policy=always");
                }
                Ok(wrote)
            }
        }
    }

    fn loaded_item(&mut self, item_id: &str) -> RepoResult<&Item> {
        let position = self.items.iter().position(|item| item.id == item_id);
        match position {
            Some(index) => Ok(&self.items[index]),
            None => {
                let err = RepoError::NotFound {
                    kind: "item",
                    id: item_id.to_string(),
                };
                self.status.record_error(SCREEN, &err);
                Err(err)
            }
        }
    }

    /// Runs a repository write, recording its error for presentation.
    fn track<T>(
        &mut self,
        write: impl FnOnce(&PackingRepository<'a, S, I>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let result = write(&self.repo);
        if let Err(err) = &result {
            warn!("event=screen_write module=state screen={SCREEN} status=error");
            self.status.record_error(SCREEN, err);
        }
        result
    }

    /// Refreshes whether or not the preceding write succeeded; the write
    /// error wins.
    fn refresh_after(&mut self, write: RepoResult<()>) -> RepoResult<()> {
        let refreshed = self.refresh();
        write.and(refreshed)
    }
}
