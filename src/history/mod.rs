//! Async history store.
//!
//! One trait, three backends. The HTTP layer only ever sees
//! `Arc<dyn HistoryStore>`, so the backend is a deployment choice.

mod pooled;
#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;

pub use pooled::PooledSqliteStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::config::{Backend, DatabaseConfig};
use crate::db::{BmiRecord, NewRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a calculation; the store assigns `id` and `timestamp`
    async fn append(&self, record: NewRecord) -> Result<BmiRecord>;

    /// Every record, newest first
    async fn list_all(&self) -> Result<Vec<BmiRecord>>;

    /// Irreversibly delete every record, returning how many were removed
    async fn clear_all(&self) -> Result<usize>;

    fn backend_name(&self) -> &'static str;

    /// Release connections at shutdown
    async fn close(&self) {}
}

/// Open the configured backend and make sure its schema exists
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn HistoryStore>> {
    let store: Arc<dyn HistoryStore> = match config.backend {
        Backend::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
        Backend::SqlitePool => {
            Arc::new(PooledSqliteStore::open(&config.path, config.pool_size).await?)
        }
        #[cfg(feature = "postgres")]
        Backend::Postgres => Arc::new(PostgresStore::connect(config).await?),
        #[cfg(not(feature = "postgres"))]
        Backend::Postgres => {
            return Err(crate::error::Error::Config(
                "postgres backend not compiled in; rebuild with --features postgres".to_string(),
            ))
        }
    };

    info!(backend = store.backend_name(), "History store ready");
    Ok(store)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::calculator::calculate;

    pub fn new_record(name: &str, weight: f64, height: f64) -> NewRecord {
        let result = calculate(weight, height).unwrap();
        NewRecord {
            name: name.to_string(),
            height,
            weight,
            bmi: result.bmi,
            category: result.category,
        }
    }

    /// Behaviour every backend must share
    pub async fn exercise_store(store: &dyn HistoryStore) {
        assert!(store.list_all().await.unwrap().is_empty());

        let older = store.append(new_record("older", 70.0, 1.75)).await.unwrap();
        let newer = store.append(new_record("newer", 95.0, 1.75)).await.unwrap();
        assert!(newer.id != older.id);
        assert_eq!(older.bmi, 22.86);

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
        assert_eq!(listed[1].name, "older");
        assert_eq!(listed[1].category, older.category);

        assert_eq!(store.clear_all().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
