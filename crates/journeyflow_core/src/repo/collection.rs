//! Generic owner-scoped collection.
//!
//! # Responsibility
//! - Implement list/add/update/delete once for every `Record` type.
//! - Stamp owner, creation time and write time; fold store ids back.
//!
//! # Invariants
//! - Record bodies never carry `id`; it is restored from the document.
//! - Undecodable documents are skipped on read, never returned half-built.
//! - Every write validates the stamped record first.

use super::{RepoError, RepoResult, SortOrder};
use crate::identity::IdentityProvider;
use crate::model::{now_epoch_ms, Record, FIELD_OWNER_ID};
use crate::store::{Document, DocumentStore, FieldFilter, Query, StoreError, WriteBatch};
use log::{debug, info, warn};
use serde_json::Value;
use std::marker::PhantomData;

/// Store collection of `R` records, scoped to the signed-in owner.
pub struct OwnedCollection<'a, S, I, R>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
    R: Record,
{
    store: &'a S,
    identity: &'a I,
    _record: PhantomData<fn() -> R>,
}

impl<'a, S, I, R> OwnedCollection<'a, S, I, R>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
    R: Record,
{
    pub fn new(store: &'a S, identity: &'a I) -> Self {
        Self {
            store,
            identity,
            _record: PhantomData,
        }
    }

    /// Signed-in owner id, ignoring blank values.
    pub fn owner_id(&self) -> Option<String> {
        self.identity
            .current_owner_id()
            .map(|owner_id| owner_id.trim().to_string())
            .filter(|owner_id| !owner_id.is_empty())
    }

    pub fn require_owner(&self) -> RepoResult<String> {
        self.owner_id().ok_or(RepoError::Unauthenticated)
    }

    /// Lists the owner's records matching `filters`.
    ///
    /// Signed-out callers get an empty list.
    pub fn list(&self, filters: Vec<FieldFilter>, order: SortOrder) -> RepoResult<Vec<R>> {
        let Some(owner_id) = self.owner_id() else {
            debug!(
                "event=record_list module=repo kind={} status=skipped reason=unauthenticated",
                R::KIND
            );
            return Ok(Vec::new());
        };

        let mut query = Query::new()
            .filter(FieldFilter::equals(FIELD_OWNER_ID, owner_id))
            .order_by(order.order_by());
        query.filters.extend(filters);
        self.fetch(&query)
    }

    /// Runs `query` without owner scoping and decodes the results.
    pub fn fetch(&self, query: &Query) -> RepoResult<Vec<R>> {
        let documents = self
            .store
            .query(R::COLLECTION, query)
            .map_err(|err| RepoError::from_store(R::KIND, "list", err))?;

        let total = documents.len();
        let records: Vec<R> = documents.into_iter().filter_map(decode_or_skip).collect();
        if records.len() != total {
            warn!(
                "event=record_list module=repo kind={} status=partial skipped={}",
                R::KIND,
                total - records.len()
            );
        }
        Ok(records)
    }

    /// Identifiers of the owner's documents matching `filters`, decodable
    /// or not.
    pub fn list_ids(&self, filters: Vec<FieldFilter>) -> RepoResult<Vec<String>> {
        let owner_id = self.require_owner()?;
        let mut query = Query::new().filter(FieldFilter::equals(FIELD_OWNER_ID, owner_id));
        query.filters.extend(filters);
        let documents = self
            .store
            .query(R::COLLECTION, &query)
            .map_err(|err| RepoError::from_store(R::KIND, "list", err))?;
        Ok(documents.into_iter().map(|document| document.id).collect())
    }

    /// Loads one of the owner's records.
    pub fn get(&self, id: &str) -> RepoResult<Option<R>> {
        let Some(owner_id) = self.owner_id() else {
            return Ok(None);
        };
        let document = self
            .store
            .get(R::COLLECTION, id)
            .map_err(|err| RepoError::from_store(R::KIND, "load", err))?;
        Ok(document
            .filter(|document| is_owned_by(document, &owner_id))
            .and_then(decode_or_skip))
    }

    /// Persists a new record and returns the stamped copy with its id.
    pub fn insert_record(&self, record: &R) -> RepoResult<R> {
        let owner_id = self.require_owner()?;
        let now = now_epoch_ms();
        let mut stamped = record.clone();
        stamped.set_owner_id(owner_id);
        stamped.set_created_at(now);
        stamped.touch(now);
        stamped.validate()?;

        let body = encode_record(&stamped)?;
        let id = self
            .store
            .insert(R::COLLECTION, &body)
            .map_err(|err| RepoError::from_store(R::KIND, "add", err))?;
        info!(
            "event=record_add module=repo kind={} status=ok id={id}",
            R::KIND
        );
        stamped.set_id(id);
        Ok(stamped)
    }

    /// Persists a new record and returns the store-assigned identifier.
    pub fn add(&self, record: &R) -> RepoResult<String> {
        self.insert_record(record).map(|stored| stored.id().to_string())
    }

    /// Overwrites an existing record in full.
    pub fn update(&self, record: &R) -> RepoResult<()> {
        let owner_id = self.require_owner()?;
        self.ensure_owned(&owner_id, record.id())?;

        let mut stamped = record.clone();
        stamped.set_owner_id(owner_id);
        stamped.touch(now_epoch_ms());
        stamped.validate()?;

        let body = encode_record(&stamped)?;
        self.store
            .overwrite(R::COLLECTION, record.id(), &body)
            .map_err(|err| RepoError::from_store(R::KIND, "update", err))?;
        info!(
            "event=record_update module=repo kind={} status=ok id={}",
            R::KIND,
            record.id()
        );
        Ok(())
    }

    /// Removes one of the owner's records.
    pub fn delete(&self, id: &str) -> RepoResult<()> {
        let owner_id = self.require_owner()?;
        self.ensure_owned(&owner_id, id)?;
        self.store
            .delete(R::COLLECTION, id)
            .map_err(|err| RepoError::from_store(R::KIND, "delete", err))?;
        info!(
            "event=record_delete module=repo kind={} status=ok id={id}",
            R::KIND
        );
        Ok(())
    }

    /// Queues an upsert of `record` stamped for `owner_id`.
    ///
    /// Fails with `NotFound` when the id is blank or belongs to another owner.
    pub fn stage_set(
        &self,
        batch: &mut WriteBatch,
        owner_id: &str,
        record: &R,
    ) -> RepoResult<()> {
        if record.id().is_empty() {
            return Err(not_found::<R>(""));
        }
        let existing = self
            .store
            .get(R::COLLECTION, record.id())
            .map_err(|err| RepoError::from_store(R::KIND, "load", err))?;
        if existing.is_some_and(|document| !is_owned_by(&document, owner_id)) {
            return Err(not_found::<R>(record.id()));
        }

        let mut stamped = record.clone();
        stamped.set_owner_id(owner_id.to_string());
        stamped.touch(now_epoch_ms());
        stamped.validate()?;
        batch.set(R::COLLECTION, record.id(), encode_record(&stamped)?);
        Ok(())
    }

    /// Queues a brand-new record, returning the stamped copy with its
    /// reserved id.
    pub fn stage_insert(
        &self,
        batch: &mut WriteBatch,
        owner_id: &str,
        record: &R,
    ) -> RepoResult<R> {
        let now = now_epoch_ms();
        let mut stamped = record.clone();
        stamped.set_owner_id(owner_id.to_string());
        stamped.set_created_at(now);
        stamped.touch(now);
        stamped.validate()?;
        let id = batch.insert(R::COLLECTION, encode_record(&stamped)?);
        stamped.set_id(id);
        Ok(stamped)
    }

    /// Fails with `NotFound` unless `id` exists and belongs to `owner_id`.
    pub fn ensure_owned(&self, owner_id: &str, id: &str) -> RepoResult<()> {
        if id.is_empty() {
            return Err(not_found::<R>(id));
        }
        let document = self
            .store
            .get(R::COLLECTION, id)
            .map_err(|err| RepoError::from_store(R::KIND, "load", err))?;
        match document {
            Some(document) if is_owned_by(&document, owner_id) => Ok(()),
            _ => Err(not_found::<R>(id)),
        }
    }
}

/// Serializes a record into a store body, dropping the `id` field.
pub(crate) fn encode_record<R: Record>(record: &R) -> RepoResult<Value> {
    let mut body = serde_json::to_value(record)
        .map_err(|err| RepoError::from_store(R::KIND, "encode", StoreError::Encode(err)))?;
    if let Value::Object(fields) = &mut body {
        fields.remove("id");
    }
    Ok(body)
}

fn decode_or_skip<R: Record>(document: Document) -> Option<R> {
    let id = document.id;
    match serde_json::from_value::<R>(document.body) {
        Ok(mut record) => {
            record.set_id(id);
            Some(record)
        }
        Err(err) => {
            warn!(
                "event=record_decode module=repo kind={} status=error id={id} error={err}",
                R::KIND
            );
            None
        }
    }
}

fn is_owned_by(document: &Document, owner_id: &str) -> bool {
    document.body.get(FIELD_OWNER_ID).and_then(Value::as_str) == Some(owner_id)
}

fn not_found<R: Record>(id: &str) -> RepoError {
    RepoError::NotFound {
        kind: R::KIND,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_record, OwnedCollection};
    use crate::db::open_db_in_memory;
    use crate::identity::Session;
    use crate::model::packing::Item;
    use crate::model::Record;
    use crate::repo::{RepoError, SortOrder};
    use crate::store::{DocumentStore, SqliteDocumentStore};
    use serde_json::json;

    #[test]
    fn encode_drops_id_field() {
        let item = Item {
            id: "abc".to_string(),
            name: "Socks".to_string(),
            ..Item::default()
        };
        let body = encode_record(&item).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["name"], "Socks");
    }

    #[test]
    fn list_skips_undecodable_documents() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let session = Session::signed_in("u1", None);
        let items: OwnedCollection<'_, _, _, Item> = OwnedCollection::new(&store, &session);

        store
            .insert(
                Item::COLLECTION,
                &json!({"userId": "u1", "name": 42, "createdAt": 1}),
            )
            .unwrap();
        let socks = Item {
            name: "Socks".to_string(),
            ..Item::default()
        };
        items.add(&socks).unwrap();

        let listed = items.list(Vec::new(), SortOrder::CreatedAtAsc).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Socks");
    }

    #[test]
    fn foreign_documents_are_invisible_and_immutable() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let alice = Session::signed_in("alice", None);
        let bob = Session::signed_in("bob", None);
        let alice_items: OwnedCollection<'_, _, _, Item> = OwnedCollection::new(&store, &alice);
        let bob_items: OwnedCollection<'_, _, _, Item> = OwnedCollection::new(&store, &bob);

        let passport = Item {
            name: "Passport".to_string(),
            ..Item::default()
        };
        let stored = alice_items.insert_record(&passport).unwrap();

        assert!(bob_items.get(&stored.id).unwrap().is_none());
        assert!(bob_items
            .list(Vec::new(), SortOrder::CreatedAtAsc)
            .unwrap()
            .is_empty());
        assert!(matches!(
            bob_items.update(&stored),
            Err(RepoError::NotFound { kind: "item", .. })
        ));
        assert!(matches!(
            bob_items.delete(&stored.id),
            Err(RepoError::NotFound { .. })
        ));
        assert!(alice_items.get(&stored.id).unwrap().is_some());
    }
}
