//! PostgreSQL document store
//!
//! Each collection is a table of JSONB documents:
//!
//! ```sql
//! CREATE TABLE "<collection>" (
//!     id          BIGSERIAL PRIMARY KEY,
//!     doc         JSONB NOT NULL,
//!     inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE UNIQUE INDEX "<collection>_key_uidx" ON "<collection>" ((doc->>'qid'), ...);
//! ```
//!
//! A batch goes in as a single `INSERT ... SELECT FROM UNNEST(...) ON CONFLICT
//! DO NOTHING`. The rows it returns tell which keys were inserted; the rest
//! of the batch hit the unique index. If the statement as a whole fails for a
//! reason other than connectivity, the batch is retried one record at a time
//! so that only the offending records are reported.

use async_trait::async_trait;
use qbank_common::config::DbConfig;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DocumentStore, WriteResult};
use crate::error::StoreError;
use crate::record::{Collection, Key, Record, RecordKind};

/// Longest accepted collection name; leaves room for the index suffix
/// within PostgreSQL's 63 byte identifier limit
const MAX_COLLECTION_NAME_LEN: usize = 54;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool established"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert records one by one; used when the batch statement is rejected
    async fn insert_each(
        &self,
        table: &str,
        documents: Vec<(Key, Value)>,
        result: &mut WriteResult,
    ) -> Result<(), StoreError> {
        let sql = format!(
            r#"INSERT INTO "{table}" (doc) VALUES ($1) ON CONFLICT DO NOTHING RETURNING id"#
        );

        for (key, doc) in documents {
            let inserted = sqlx::query_scalar::<_, i64>(&sql)
                .bind(Json(doc))
                .fetch_optional(&self.pool)
                .await;

            match inserted.map_err(classify) {
                Ok(Some(_)) => result.inserted += 1,
                Ok(None) => {
                    result.conflicts.insert(key);
                },
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => result.other_errors.push((key, e.to_string())),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn ensure_unique_index(&self, collection: &Collection) -> Result<(), StoreError> {
        let table = table_name(collection)?;
        let key_columns = collection
            .kind()
            .key_fields()
            .iter()
            .map(|field| format!("(doc->>'{field}')"))
            .collect::<Vec<_>>()
            .join(", ");

        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                id BIGSERIAL PRIMARY KEY,
                doc JSONB NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ))
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(&format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "{table}_key_uidx" ON "{table}" ({key_columns})"#
        ))
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        debug!(table = %table, key_columns = %key_columns, "Unique index ready");
        Ok(())
    }

    async fn existing_keys(&self, collection: &Collection) -> Result<HashSet<Key>, StoreError> {
        let table = table_name(collection)?;

        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1::text) IS NOT NULL")
            .bind(format!(r#""{table}""#))
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        if !exists {
            return Ok(HashSet::new());
        }

        let projections: Vec<Value> = sqlx::query_scalar(&format!(
            r#"SELECT {} FROM "{table}""#,
            key_projection(collection.kind())
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        let kind = collection.kind();
        let mut keys = HashSet::with_capacity(projections.len());
        let mut unreadable = 0usize;
        for projection in &projections {
            match kind.key_from_document(projection) {
                Some(key) => {
                    keys.insert(key);
                },
                None => unreadable += 1,
            }
        }
        if unreadable > 0 {
            warn!(table = %table, unreadable, "Stored documents without a readable key");
        }
        Ok(keys)
    }

    async fn insert_many(
        &self,
        collection: &Collection,
        records: &[Record],
    ) -> Result<WriteResult, StoreError> {
        let table = table_name(collection)?;
        let mut result = WriteResult::default();

        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            match record.to_document() {
                Ok(doc) => documents.push((record.key(), doc)),
                Err(e) => result.other_errors.push((record.key(), e.to_string())),
            }
        }
        if documents.is_empty() {
            return Ok(result);
        }

        let sql = format!(
            r#"INSERT INTO "{table}" (doc)
               SELECT d FROM UNNEST($1::jsonb[]) AS batch(d)
               ON CONFLICT DO NOTHING
               RETURNING {}"#,
            key_projection(collection.kind())
        );
        let docs: Vec<Json<Value>> = documents.iter().map(|(_, doc)| Json(doc.clone())).collect();

        let returned = match sqlx::query_scalar::<_, Value>(&sql)
            .bind(docs)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
        {
            Ok(rows) => rows,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                warn!(
                    table = %table,
                    batch_size = documents.len(),
                    error = %e,
                    "Batch insert rejected, retrying record by record"
                );
                self.insert_each(&table, documents, &mut result).await?;
                return Ok(result);
            },
        };

        // One returned key per inserted row; repeated keys within a batch are
        // matched off as a multiset
        let kind = collection.kind();
        let mut inserted: HashMap<Key, usize> = HashMap::new();
        for projection in &returned {
            if let Some(key) = kind.key_from_document(projection) {
                *inserted.entry(key).or_default() += 1;
            }
        }
        for (key, _) in documents {
            match inserted.get_mut(&key) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    result.inserted += 1;
                },
                _ => {
                    result.conflicts.insert(key);
                },
            }
        }

        Ok(result)
    }
}

/// Validate the collection name for use as a quoted table identifier
fn table_name(collection: &Collection) -> Result<String, StoreError> {
    let name = collection.name();
    let valid = !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LEN
        && name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid {
        Ok(name.to_string())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

/// `jsonb_build_object` over the kind's key fields
fn key_projection(kind: RecordKind) -> String {
    let pairs = kind
        .key_fields()
        .iter()
        .map(|field| format!("'{field}', doc->'{field}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("jsonb_build_object({pairs})")
}

/// Connection-level failures make the store unavailable; anything else is a
/// rejected operation
fn classify(err: sqlx::Error) -> StoreError {
    let unreachable = match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        // SQLSTATE class 08 is connection exception, 57P01 admin shutdown
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code == "57P01"),
        _ => false,
    };

    if unreachable {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Operation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Language;

    #[test]
    fn test_table_name_validation() {
        assert_eq!(
            table_name(&Collection::solutions(Language::Cpp)).unwrap(),
            "cpp_solutions"
        );
        assert!(table_name(&Collection::metadata("_scratch2")).is_ok());

        for bad in ["", "Questions", "2fast", "drop table;", "a\"b", "x-y"] {
            assert!(
                matches!(
                    table_name(&Collection::metadata(bad)),
                    Err(StoreError::InvalidCollection(_))
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(table_name(&Collection::metadata("a".repeat(55))).is_err());
    }

    #[test]
    fn test_key_projection() {
        assert_eq!(
            key_projection(RecordKind::Metadata),
            "jsonb_build_object('qid', doc->'qid')"
        );
        assert_eq!(
            key_projection(RecordKind::Solution),
            "jsonb_build_object('qid', doc->'qid', 'language', doc->'language')"
        );
    }

    #[test]
    fn test_classify_connection_errors() {
        assert!(classify(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(classify(sqlx::Error::PoolClosed).is_unavailable());
        assert!(classify(sqlx::Error::Io(std::io::Error::other("reset"))).is_unavailable());
        assert!(!classify(sqlx::Error::RowNotFound).is_unavailable());
    }
}
