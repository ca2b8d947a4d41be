use super::HistoryStore;
use crate::db::{self, BmiRecord, NewRecord};
use crate::error::{Error, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Embedded SQLite behind a single shared connection.
///
/// Requests serialize on the mutex; each statement is short, so the
/// lock is never held across an await point.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Storage("database connection lock poisoned".to_string()))?;
        f(&conn)
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn append(&self, record: NewRecord) -> Result<BmiRecord> {
        self.with_conn(|conn| db::insert_record(conn, record))
    }

    async fn list_all(&self) -> Result<Vec<BmiRecord>> {
        self.with_conn(db::get_all_records)
    }

    async fn clear_all(&self) -> Result<usize> {
        self.with_conn(db::delete_all_records)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
