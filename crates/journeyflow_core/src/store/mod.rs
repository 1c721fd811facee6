//! Document store contract.
//!
//! # Responsibility
//! - Describe the four per-collection operations the app relies on
//!   (insert, overwrite, delete, query) plus atomic batched writes.
//! - Keep storage-engine types out of repository and state code.
//!
//! # Invariants
//! - Identifiers are assigned by the store and never stored inside `body`.
//! - `overwrite` and `delete` report `NotFound` for unknown identifiers.
//! - `commit` applies every batched operation or none of them.

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite_store;

pub use sqlite_store::SqliteDocumentStore;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by document store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying storage engine failure.
    Db(DbError),
    /// No document with this identifier exists in the collection.
    NotFound { collection: String, id: String },
    /// Document body could not be encoded or decoded as JSON.
    Encode(serde_json::Error),
    /// Query or batch shape is not supported.
    InvalidQuery(String),
    /// Persisted data is malformed.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::Encode(err) => write!(f, "document encoding failed: {err}"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::NotFound { .. }
            | Self::InvalidQuery(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// One stored document: store-assigned identifier plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

/// Comparison used by a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Eq => "IS",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Single-field predicate. `value` must be a JSON scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// Collection query. Filters are conjunctive; ties in `order_by` fall back to
/// insertion order in the same direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rejects field names that cannot be used as a JSON path segment and
    /// filter values that are not scalars.
    pub fn validate(&self) -> StoreResult<()> {
        for filter in &self.filters {
            ensure_field_name(&filter.field)?;
            if filter.value.is_array() || filter.value.is_object() {
                return Err(StoreError::InvalidQuery(format!(
                    "filter on `{}` must compare against a scalar",
                    filter.field
                )));
            }
        }
        if let Some(order) = &self.order_by {
            ensure_field_name(&order.field)?;
        }
        Ok(())
    }
}

pub(crate) fn ensure_field_name(field: &str) -> StoreResult<()> {
    if FIELD_NAME_RE.is_match(field) {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!(
            "unsupported field name `{field}`"
        )))
    }
}

/// One buffered write inside a `WriteBatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create or fully replace the document.
    Set {
        collection: String,
        id: String,
        body: Value,
    },
    /// Remove the document; missing documents are ignored.
    Delete { collection: String, id: String },
}

/// Buffered multi-document write applied atomically by `DocumentStore::commit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a new document and returns the identifier reserved for it.
    pub fn insert(&mut self, collection: &str, body: Value) -> String {
        let id = new_document_id();
        self.set(collection, id.clone(), body);
        id
    }

    pub fn set(&mut self, collection: &str, id: impl Into<String>, body: Value) {
        self.ops.push(BatchOp::Set {
            collection: collection.to_string(),
            id: id.into(),
            body,
        });
    }

    pub fn delete(&mut self, collection: &str, id: impl Into<String>) {
        self.ops.push(BatchOp::Delete {
            collection: collection.to_string(),
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub(crate) fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Generates a store identifier. Simple-form UUID v4, 32 hex characters.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Storage contract consumed by repositories.
pub trait DocumentStore {
    /// Persists a new document and returns the identifier assigned to it.
    fn insert(&self, collection: &str, body: &Value) -> StoreResult<String>;
    /// Loads one document by identifier.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    /// Replaces the whole body of an existing document.
    fn overwrite(&self, collection: &str, id: &str, body: &Value) -> StoreResult<()>;
    /// Removes one existing document.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
    /// Lists documents matching `query`.
    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;
    /// Applies all operations in `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
