//! Packing checklist repository.
//!
//! # Responsibility
//! - CRUD for categories and items in `packing_categories` /
//!   `packing_items`, scoped by owner.
//! - Multi-document operations: cascading category delete, batched
//!   upserts, default list seeding, denormalized name sync.
//!
//! # Invariants
//! - Deleting a category deletes every item referencing it in the same
//!   atomic batch.
//! - Batched writes re-stamp the signed-in owner on every record.

use super::collection::OwnedCollection;
use super::{RepoError, RepoResult, SortOrder};
use crate::identity::IdentityProvider;
use crate::model::defaults::{default_categories, default_items_for};
use crate::model::packing::{Category, Item};
use crate::model::{Record, FIELD_CATEGORY_ID};
use crate::store::{DocumentStore, FieldFilter, WriteBatch};
use log::info;

/// Categories and items loaded together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackingSnapshot {
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
}

/// Owner-scoped repository for the packing checklist.
pub struct PackingRepository<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    store: &'a S,
    categories: OwnedCollection<'a, S, I, Category>,
    items: OwnedCollection<'a, S, I, Item>,
}

impl<'a, S, I> PackingRepository<'a, S, I>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    pub fn new(store: &'a S, identity: &'a I) -> Self {
        Self {
            store,
            categories: OwnedCollection::new(store, identity),
            items: OwnedCollection::new(store, identity),
        }
    }

    /// Whether a signed-in owner is available for writes.
    pub fn is_authenticated(&self) -> bool {
        self.categories.owner_id().is_some()
    }

    pub fn list_categories(&self, order: SortOrder) -> RepoResult<Vec<Category>> {
        self.categories.list(Vec::new(), order)
    }

    pub fn get_category(&self, category_id: &str) -> RepoResult<Option<Category>> {
        self.categories.get(category_id)
    }

    /// Persists a new category and returns its store id.
    pub fn add_category(&self, category: &Category) -> RepoResult<String> {
        self.categories.add(category)
    }

    /// Persists a new category and returns the stored copy.
    pub fn insert_category(&self, category: &Category) -> RepoResult<Category> {
        self.categories.insert_record(category)
    }

    pub fn update_category(&self, category: &Category) -> RepoResult<()> {
        self.categories.update(category)
    }

    /// Deletes a category and every item filed under it, atomically.
    pub fn delete_category(&self, category_id: &str) -> RepoResult<()> {
        let owner_id = self.categories.require_owner()?;
        self.categories.ensure_owned(&owner_id, category_id)?;

        let item_ids = self
            .items
            .list_ids(vec![FieldFilter::equals(FIELD_CATEGORY_ID, category_id)])?;

        let mut batch = WriteBatch::new();
        for item_id in &item_ids {
            batch.delete(Item::COLLECTION, item_id.as_str());
        }
        batch.delete(Category::COLLECTION, category_id);
        self.store
            .commit(batch)
            .map_err(|err| RepoError::from_store(Category::KIND, "delete", err))?;

        info!(
            "event=category_delete module=repo status=ok id={category_id} removed_items={}",
            item_ids.len()
        );
        Ok(())
    }

    pub fn list_items(&self, order: SortOrder) -> RepoResult<Vec<Item>> {
        self.items.list(Vec::new(), order)
    }

    pub fn list_items_by_category(
        &self,
        category_id: &str,
        order: SortOrder,
    ) -> RepoResult<Vec<Item>> {
        self.items.list(
            vec![FieldFilter::equals(FIELD_CATEGORY_ID, category_id)],
            order,
        )
    }

    pub fn get_item(&self, item_id: &str) -> RepoResult<Option<Item>> {
        self.items.get(item_id)
    }

    /// Persists a new item and returns its store id.
    ///
    /// The category reference is not checked against existing categories.
    pub fn add_item(&self, item: &Item) -> RepoResult<String> {
        self.items.add(item)
    }

    /// Persists a new item and returns the stored copy.
    pub fn insert_item(&self, item: &Item) -> RepoResult<Item> {
        self.items.insert_record(item)
    }

    pub fn update_item(&self, item: &Item) -> RepoResult<()> {
        self.items.update(item)
    }

    pub fn delete_item(&self, item_id: &str) -> RepoResult<()> {
        self.items.delete(item_id)
    }

    /// Upserts every item in one batch.
    pub fn batch_update_items(&self, items: &[Item]) -> RepoResult<()> {
        let owner_id = self.items.require_owner()?;
        let mut batch = WriteBatch::new();
        for item in items {
            self.items.stage_set(&mut batch, &owner_id, item)?;
        }
        self.commit_batch(batch, Item::KIND)
    }

    /// Upserts every category in one batch.
    pub fn batch_update_categories(&self, categories: &[Category]) -> RepoResult<()> {
        let owner_id = self.categories.require_owner()?;
        let mut batch = WriteBatch::new();
        for category in categories {
            self.categories.stage_set(&mut batch, &owner_id, category)?;
        }
        self.commit_batch(batch, Category::KIND)
    }

    /// Rewrites the denormalized `category_name` of items filed under
    /// `category`. Returns how many items changed.
    pub fn sync_category_name(&self, category: &Category) -> RepoResult<usize> {
        let stale: Vec<Item> = self
            .list_items_by_category(&category.id, SortOrder::CreatedAtAsc)?
            .into_iter()
            .filter(|item| item.category_name != category.name)
            .map(|item| Item {
                category_name: category.name.clone(),
                ..item
            })
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        self.batch_update_items(&stale)?;
        Ok(stale.len())
    }

    /// Writes the default categories and their starter items in one batch.
    pub fn seed_default_packing_list(&self) -> RepoResult<PackingSnapshot> {
        let owner_id = self.categories.require_owner()?;
        let mut batch = WriteBatch::new();

        let mut categories = Vec::new();
        for category in default_categories() {
            categories.push(self.categories.stage_insert(&mut batch, &owner_id, &category)?);
        }
        let mut items = Vec::new();
        for item in default_items_for(&categories) {
            items.push(self.items.stage_insert(&mut batch, &owner_id, &item)?);
        }

        self.commit_batch(batch, Category::KIND)?;
        info!(
            "event=packing_seed module=repo status=ok categories={} items={}",
            categories.len(),
            items.len()
        );
        Ok(PackingSnapshot { categories, items })
    }

    /// Loads the owner's categories and items together.
    pub fn snapshot(
        &self,
        category_order: SortOrder,
        item_order: SortOrder,
    ) -> RepoResult<PackingSnapshot> {
        Ok(PackingSnapshot {
            categories: self.list_categories(category_order)?,
            items: self.list_items(item_order)?,
        })
    }

    fn commit_batch(&self, batch: WriteBatch, kind: &'static str) -> RepoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let ops = batch.len();
        self.store
            .commit(batch)
            .map_err(|err| RepoError::from_store(kind, "batch write", err))?;
        info!("event=batch_write module=repo kind={kind} status=ok ops={ops}");
        Ok(())
    }
}
