//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents per collection in the `documents` table.
//! - Translate `Query` filters/ordering into `json_extract` predicates.
//!
//! # Invariants
//! - Filter values are always bound. Field paths are spliced only after
//!   passing the identifier check in `Query::validate`.
//! - Ordering ties are broken by insertion sequence in the same direction.
//! - Batches run in one transaction and roll back on the first failure.

use super::{
    BatchOp, Direction, Document, DocumentStore, Query, StoreError, StoreResult, WriteBatch,
};
use crate::db::migrations::latest_version;
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;

/// Document store over a migrated SQLite connection.
#[derive(Debug)]
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn insert(&self, collection: &str, body: &Value) -> StoreResult<String> {
        let id = super::new_document_id();
        let text = encode_body(body)?;
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
            params![collection, id.as_str(), text],
        )?;
        Ok(id)
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row = self
            .conn
            .query_row(
                "SELECT doc_id, body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection, id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((doc_id, body)) => Ok(Some(decode_document(doc_id, &body)?)),
            None => Ok(None),
        }
    }

    fn overwrite(&self, collection: &str, id: &str, body: &Value) -> StoreResult<()> {
        let text = encode_body(body)?;
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?1 AND doc_id = ?2;",
            params![collection, id, text],
        )?;
        if changed == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![collection, id],
        )?;
        if changed == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let (sql, bind_values) = select_sql(collection, query)?;

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }

        Ok(documents)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let op_count = batch.len();
        let tx = self.conn.unchecked_transaction()?;

        for op in batch.into_ops() {
            match op {
                BatchOp::Set {
                    collection,
                    id,
                    body,
                } => {
                    let text = encode_body(&body)?;
                    tx.execute(
                        "INSERT INTO documents (collection, doc_id, body)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT (collection, doc_id) DO UPDATE SET
                            body = excluded.body,
                            updated_at = (strftime('%s', 'now') * 1000);",
                        params![collection, id, text],
                    )?;
                }
                BatchOp::Delete { collection, id } => {
                    tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                        params![collection, id],
                    )?;
                }
            }
        }

        tx.commit()?;
        debug!("event=batch_commit module=store status=ok ops={op_count}");
        Ok(())
    }
}

fn parse_document_row(row: &Row<'_>) -> StoreResult<Document> {
    let doc_id: String = row.get("doc_id")?;
    let body: String = row.get("body")?;
    decode_document(doc_id, &body)
}

fn decode_document(doc_id: String, body: &str) -> StoreResult<Document> {
    let body: Value = serde_json::from_str(body).map_err(|err| {
        StoreError::InvalidData(format!("document `{doc_id}` has unreadable body: {err}"))
    })?;
    if !body.is_object() {
        return Err(StoreError::InvalidData(format!(
            "document `{doc_id}` body is not an object"
        )));
    }
    Ok(Document { id: doc_id, body })
}

fn encode_body(body: &Value) -> StoreResult<String> {
    if !body.is_object() {
        return Err(StoreError::InvalidQuery(
            "document body must be a JSON object".to_string(),
        ));
    }
    Ok(serde_json::to_string(body)?)
}

fn scalar_to_sql(value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(SqlValue::Integer(int))
            } else if let Some(float) = number.as_f64() {
                Ok(SqlValue::Real(float))
            } else {
                Err(StoreError::InvalidQuery(format!(
                    "unsupported numeric filter value {number}"
                )))
            }
        }
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidQuery(
            "filter value must be a scalar".to_string(),
        )),
    }
}

/// Builds the SELECT for `query`.
///
/// Field paths are written as SQL literals so expression indexes such as
/// `idx_documents_owner` can match; `Query::validate` restricts them to
/// identifier characters first.
fn select_sql(collection: &str, query: &Query) -> StoreResult<(String, Vec<SqlValue>)> {
    query.validate()?;

    let mut sql = String::from("SELECT doc_id, body FROM documents WHERE collection = ?");
    let mut bind_values = vec![SqlValue::Text(collection.to_string())];

    for filter in &query.filters {
        sql.push_str(&format!(
            " AND {} {} ?",
            json_field(&filter.field),
            filter.op.sql()
        ));
        bind_values.push(scalar_to_sql(&filter.value)?);
    }

    match &query.order_by {
        Some(order) => {
            let direction = direction_sql(order.direction);
            sql.push_str(&format!(
                " ORDER BY {} {direction}, seq {direction}",
                json_field(&order.field)
            ));
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(SqlValue::Integer(i64::from(limit)));
    }

    Ok((sql, bind_values))
}

fn json_field(field: &str) -> String {
    format!("json_extract(body, '$.{field}')")
}

fn direction_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    }
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{select_sql, SqliteDocumentStore};
    use crate::db::open_db_in_memory;
    use crate::store::{
        DocumentStore, FieldFilter, FilterOp, OrderBy, Query, StoreError, WriteBatch,
    };
    use rusqlite::Connection;
    use serde_json::json;

    #[test]
    fn insert_assigns_id_and_get_reads_back_body() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();

        let id = store
            .insert("packing_categories", &json!({"name": "Clothing"}))
            .unwrap();
        assert!(!id.is_empty());

        let doc = store.get("packing_categories", &id).unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.body["name"], "Clothing");
        assert!(store.get("packing_items", &id).unwrap().is_none());
    }

    #[test]
    fn overwrite_and_delete_report_missing_documents() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();

        let err = store
            .overwrite("packing_items", "missing", &json!({"name": "x"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = store.delete("packing_items", "missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref id, .. } if id == "missing"));
    }

    #[test]
    fn overwrite_replaces_whole_body() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();

        let id = store
            .insert("packing_items", &json!({"name": "Socks", "isChecked": false}))
            .unwrap();
        store
            .overwrite("packing_items", &id, &json!({"name": "Wool socks"}))
            .unwrap();

        let doc = store.get("packing_items", &id).unwrap().unwrap();
        assert_eq!(doc.body, json!({"name": "Wool socks"}));
    }

    #[test]
    fn query_filters_on_scalars_and_orders_with_stable_ties() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();

        let a = store
            .insert("items", &json!({"owner": "u1", "rank": 2, "done": true}))
            .unwrap();
        let b = store
            .insert("items", &json!({"owner": "u1", "rank": 1, "done": false}))
            .unwrap();
        let c = store
            .insert("items", &json!({"owner": "u1", "rank": 2, "done": false}))
            .unwrap();
        store
            .insert("items", &json!({"owner": "u2", "rank": 0, "done": false}))
            .unwrap();

        let asc = store
            .query(
                "items",
                &Query::new()
                    .filter(FieldFilter::equals("owner", "u1"))
                    .order_by(OrderBy::asc("rank")),
            )
            .unwrap();
        let ids: Vec<_> = asc.iter().map(|doc| doc.id.clone()).collect();
        assert_eq!(ids, vec![b.clone(), a.clone(), c.clone()]);

        let desc = store
            .query(
                "items",
                &Query::new()
                    .filter(FieldFilter::equals("owner", "u1"))
                    .order_by(OrderBy::desc("rank")),
            )
            .unwrap();
        let ids: Vec<_> = desc.iter().map(|doc| doc.id.clone()).collect();
        assert_eq!(ids, vec![c, a.clone(), b]);

        let done = store
            .query("items", &Query::new().filter(FieldFilter::equals("done", true)))
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, a);

        let ranked = store
            .query(
                "items",
                &Query::new()
                    .filter(FieldFilter::new("rank", FilterOp::Ge, 1))
                    .limit(2),
            )
            .unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let kept = store.insert("items", &json!({"name": "kept"})).unwrap();

        let mut batch = WriteBatch::new();
        batch.insert("items", json!({"name": "new"}));
        batch.delete("items", kept.clone());
        batch.set("items", "broken", json!("not an object"));
        assert!(store.commit(batch).is_err());

        let all = store.query("items", &Query::new()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, kept);
    }

    #[test]
    fn commit_upserts_and_ignores_missing_deletes() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(&conn).unwrap();
        let existing = store.insert("items", &json!({"name": "old"})).unwrap();

        let mut batch = WriteBatch::new();
        batch.set("items", existing.clone(), json!({"name": "renamed"}));
        batch.delete("items", "never-existed");
        let created = batch.insert("items", json!({"name": "fresh"}));
        store.commit(batch).unwrap();

        assert_eq!(
            store.get("items", &existing).unwrap().unwrap().body["name"],
            "renamed"
        );
        assert!(store.get("items", &created).unwrap().is_some());
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteDocumentStore::try_new(&conn);
        assert!(matches!(
            result,
            Err(StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }

    #[test]
    fn owner_scoped_query_uses_owner_index() {
        let conn = open_db_in_memory().unwrap();
        let query = Query::new()
            .filter(FieldFilter::equals("userId", "u1"))
            .order_by(OrderBy::asc("createdAt"));
        let (sql, bind_values) = select_sql("packing_items", &query).unwrap();

        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}")).unwrap();
        let details: Vec<String> = stmt
            .query_map(rusqlite::params_from_iter(bind_values), |row| row.get(3))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_documents_owner") && detail.contains("<expr>")),
            "{details:?}"
        );
    }

    #[test]
    fn spliced_field_names_are_validated_first() {
        let query = Query::new().filter(FieldFilter::equals("name') OR 1=1 --", "x"));
        assert!(matches!(
            select_sql("reviews", &query),
            Err(StoreError::InvalidQuery(_))
        ));
    }
}
