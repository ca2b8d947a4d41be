use super::HistoryStore;
use crate::db::{self, BmiRecord, NewRecord};
use crate::error::{Error, Result};
use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Embedded SQLite behind a deadpool connection pool.
///
/// Every call checks out a connection and runs the query on deadpool's
/// blocking thread via `interact`, so concurrent readers do not queue
/// behind each other the way they do with [`super::SqliteStore`].
pub struct PooledSqliteStore {
    pool: Pool,
    db_path: PathBuf,
}

impl PooledSqliteStore {
    pub async fn open(path: &Path, max_connections: usize) -> Result<Self> {
        let mut cfg = Config::new(path);
        cfg.pool = Some(PoolConfig::new(max_connections));

        let pool = cfg
            .create_pool(Runtime::Tokio1)
            .map_err(|e| Error::Storage(format!("failed to create pool: {e}")))?;

        let store = Self {
            pool,
            db_path: path.to_path_buf(),
        };

        // First checkout doubles as the connectivity check
        store.interact(db::setup_database).await?;
        debug!(path = %store.db_path.display(), max_connections, "SQLite pool opened");

        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn interact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| f(conn)).await?
    }
}

#[async_trait]
impl HistoryStore for PooledSqliteStore {
    async fn append(&self, record: NewRecord) -> Result<BmiRecord> {
        self.interact(move |conn| db::insert_record(conn, record)).await
    }

    async fn list_all(&self) -> Result<Vec<BmiRecord>> {
        self.interact(db::get_all_records).await
    }

    async fn clear_all(&self) -> Result<usize> {
        self.interact(db::delete_all_records).await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite-pool"
    }

    async fn close(&self) {
        self.pool.close();
    }
}
