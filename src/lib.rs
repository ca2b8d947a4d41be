// BMI Service - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod calculator;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod history;

// Re-export commonly used types
pub use calculator::{calculate, classify, round2, BmiCategory, BmiResult};
pub use config::{AppConfig, Backend, DatabaseConfig, LogConfig};
pub use db::{
    BmiRecord, NewRecord,
    open_database, setup_database, insert_record, get_all_records,
    delete_all_records, verify_count,
};
pub use error::{Error, Result};

#[cfg(feature = "server")]
pub use api::{router, AppState};
#[cfg(feature = "server")]
pub use history::{connect, HistoryStore, PooledSqliteStore, SqliteStore};
#[cfg(feature = "postgres")]
pub use history::PostgresStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compute and persist one calculation on a plain connection.
///
/// Shared by the CLI and the terminal UI, which talk to the
/// embedded database directly instead of going through HTTP.
pub fn record_measurement(
    conn: &rusqlite::Connection,
    name: &str,
    weight: f64,
    height: f64,
) -> Result<BmiRecord> {
    let result = calculate(weight, height)?;

    insert_record(
        conn,
        NewRecord {
            name: name.to_string(),
            height,
            weight,
            bmi: result.bmi,
            category: result.category,
        },
    )
}
