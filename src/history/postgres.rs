//! PostgreSQL backend, for deployments with a separate database server.

use super::HistoryStore;
use crate::config::DatabaseConfig;
use crate::db::{BmiRecord, NewRecord};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::{NoTls, Row};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS bmi_history (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        height DOUBLE PRECISION NOT NULL,
        weight DOUBLE PRECISION NOT NULL,
        bmi DOUBLE PRECISION NOT NULL,
        category VARCHAR(50) NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    CREATE INDEX IF NOT EXISTS idx_bmi_history_timestamp ON bmi_history(timestamp);
";

pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Build the pool, check connectivity and create the table
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.user = Some(config.user.clone());
        cfg.password = Some(config.password.clone());
        cfg.dbname = Some(config.name.clone());
        cfg.pool = Some(PoolConfig::new(config.pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::Storage(format!("failed to create pool: {e}")))?;

        let conn = pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        debug!(host = %config.host, db = %config.name, "PostgreSQL pool opened");

        Ok(Self { pool })
    }
}

fn row_to_record(row: &Row) -> Result<BmiRecord> {
    let category: String = row.try_get("category")?;
    let timestamp: DateTime<Utc> = row.try_get("timestamp")?;

    Ok(BmiRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        height: row.try_get("height")?,
        weight: row.try_get("weight")?,
        bmi: row.try_get("bmi")?,
        category: category.parse()?,
        timestamp,
    })
}

#[async_trait]
impl HistoryStore for PostgresStore {
    async fn append(&self, record: NewRecord) -> Result<BmiRecord> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_one(
                "INSERT INTO bmi_history (name, height, weight, bmi, category)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, timestamp",
                &[
                    &record.name,
                    &record.height,
                    &record.weight,
                    &record.bmi,
                    &record.category.as_str(),
                ],
            )
            .await?;

        let id: i64 = row.try_get("id")?;
        let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
        Ok(BmiRecord::from_new(record, id, timestamp))
    }

    async fn list_all(&self) -> Result<Vec<BmiRecord>> {
        let conn = self.pool.get().await?;
        let rows = conn
            .query(
                "SELECT id, name, height, weight, bmi, category, timestamp
                 FROM bmi_history
                 ORDER BY timestamp DESC, id DESC",
                &[],
            )
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn clear_all(&self) -> Result<usize> {
        let conn = self.pool.get().await?;
        let deleted = conn.execute("DELETE FROM bmi_history", &[]).await?;
        Ok(deleted as usize)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}
