//! Environment-driven configuration.
//!
//! Every setting has a default so a bare `bmi-server` starts against a
//! local SQLite file. A `.env` file in the working directory is loaded first.

use crate::error::{Error, Result};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DATABASE_PATH: &str = "bmi.db";
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Which storage engine backs the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Embedded file, one shared connection
    Sqlite,
    /// Embedded file, connection pool
    SqlitePool,
    /// Client-server database, connection pool
    Postgres,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::SqlitePool => "sqlite-pool",
            Backend::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "sqlite-pool" | "sqlite_pool" => Ok(Backend::SqlitePool),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(Error::Config(format!(
                "unknown DATABASE_BACKEND '{}' (expected sqlite, sqlite-pool or postgres)",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub path: PathBuf,
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: u16,
    pub pool_size: usize,
}

// Hand-written so the password never lands in a log line
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("path", &self.path)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("port", &self.port)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
            name: "bmi_database".to_string(),
            port: 5432,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Directory for daily-rotated JSON logs; stderr only when unset
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = DatabaseConfig::default();

        let database = DatabaseConfig {
            backend: match get("DATABASE_BACKEND") {
                Some(v) => v.parse()?,
                None => defaults.backend,
            },
            path: get("DATABASE_PATH").map(PathBuf::from).unwrap_or(defaults.path),
            host: get("DATABASE_HOST").unwrap_or(defaults.host),
            user: get("DATABASE_USER").unwrap_or(defaults.user),
            // An empty password is a legitimate value
            password: lookup("DATABASE_PASSWORD").unwrap_or(defaults.password),
            name: get("DATABASE_NAME").unwrap_or(defaults.name),
            port: parse_var("DATABASE_PORT", get("DATABASE_PORT"), defaults.port)?,
            pool_size: parse_var(
                "DATABASE_POOL_SIZE",
                get("DATABASE_POOL_SIZE"),
                defaults.pool_size,
            )?,
        };

        if database.pool_size == 0 {
            return Err(Error::Config("DATABASE_POOL_SIZE must be at least 1".to_string()));
        }

        let bind_addr = parse_var(
            "BMI_BIND_ADDR",
            get("BMI_BIND_ADDR"),
            SocketAddr::from(([0, 0, 0, 0], 8000)),
        )?;

        Ok(Self {
            bind_addr,
            database,
            log: LogConfig {
                dir: get("BMI_LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse_var<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} = '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
