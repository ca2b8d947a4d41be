use crate::calculator::BmiCategory;
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A calculation about to be stored (no id or timestamp yet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub name: String,
    pub height: f64,
    pub weight: f64,
    pub bmi: f64,
    pub category: BmiCategory,
}

/// A stored calculation
/// Immutable once written: the only destructive operation is clearing the whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiRecord {
    pub id: i64,
    pub name: String,
    pub height: f64,
    pub weight: f64,
    pub bmi: f64,
    pub category: BmiCategory,
    pub timestamp: DateTime<Utc>,
}

impl BmiRecord {
    pub fn from_new(record: NewRecord, id: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            name: record.name,
            height: record.height,
            weight: record.weight,
            bmi: record.bmi,
            category: record.category,
            timestamp,
        }
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text so that
/// lexical order in SQLite matches chronological order
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL lets pooled readers proceed while a write is in flight.
    // In-memory databases report "memory" and ignore it.
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bmi_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            height REAL NOT NULL,
            weight REAL NOT NULL,
            bmi REAL NOT NULL,
            category TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bmi_history_timestamp ON bmi_history(timestamp)",
        [],
    )?;

    Ok(())
}

pub fn insert_record(conn: &Connection, record: NewRecord) -> Result<BmiRecord> {
    let timestamp = Utc::now().trunc_subsecs(6);

    conn.execute(
        "INSERT INTO bmi_history (name, height, weight, bmi, category, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.name,
            record.height,
            record.weight,
            record.bmi,
            record.category.as_str(),
            format_timestamp(&timestamp),
        ],
    )?;

    let id = conn.last_insert_rowid();
    Ok(BmiRecord::from_new(record, id, timestamp))
}

/// All records, newest first; same-instant inserts fall back to id order
pub fn get_all_records(conn: &Connection) -> Result<Vec<BmiRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, height, weight, bmi, category, timestamp
         FROM bmi_history
         ORDER BY timestamp DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([], raw_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(RawRow::into_record).collect()
}

/// Delete every record, returning how many were removed
pub fn delete_all_records(conn: &Connection) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM bmi_history", [])?;
    Ok(deleted)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM bmi_history", [], |row| row.get(0))?;

    Ok(count)
}

// Text columns are validated outside the rusqlite closure so a bad
// category or timestamp becomes our Storage error, not InvalidQuery
struct RawRow {
    id: i64,
    name: String,
    height: f64,
    weight: f64,
    bmi: f64,
    category: String,
    timestamp: String,
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        name: row.get(1)?,
        height: row.get(2)?,
        weight: row.get(3)?,
        bmi: row.get(4)?,
        category: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

impl RawRow {
    fn into_record(self) -> Result<BmiRecord> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| {
                Error::Storage(format!(
                    "record {} has unreadable timestamp '{}': {}",
                    self.id, self.timestamp, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(BmiRecord {
            id: self.id,
            name: self.name,
            height: self.height,
            weight: self.weight,
            bmi: self.bmi,
            category: self.category.parse()?,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate;

    fn new_record(name: &str, weight: f64, height: f64) -> NewRecord {
        let result = calculate(weight, height).unwrap();
        NewRecord {
            name: name.to_string(),
            height,
            weight,
            bmi: result.bmi,
            category: result.category,
        }
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_assigns_id_and_timestamp() {
        let conn = test_conn();

        let stored = insert_record(&conn, new_record("John Doe", 70.0, 1.75)).unwrap();

        assert!(stored.id > 0);
        assert_eq!(stored.name, "John Doe");
        assert_eq!(stored.bmi, 22.86);
        assert_eq!(stored.category, BmiCategory::NormalWeight);
        assert_eq!(verify_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let conn = test_conn();

        let first = insert_record(&conn, new_record("first", 60.0, 1.70)).unwrap();
        let second = insert_record(&conn, new_record("second", 90.0, 1.70)).unwrap();
        let third = insert_record(&conn, new_record("third", 45.0, 1.70)).unwrap();

        let records = get_all_records(&conn).unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(records[0], third);
    }

    #[test]
    fn test_delete_all_records() {
        let conn = test_conn();
        insert_record(&conn, new_record("a", 60.0, 1.70)).unwrap();
        insert_record(&conn, new_record("b", 61.0, 1.70)).unwrap();

        assert_eq!(delete_all_records(&conn).unwrap(), 2);
        assert!(get_all_records(&conn).unwrap().is_empty());
        assert_eq!(delete_all_records(&conn).unwrap(), 0);
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let conn = test_conn();
        let before = insert_record(&conn, new_record("a", 60.0, 1.70)).unwrap();
        delete_all_records(&conn).unwrap();
        let after = insert_record(&conn, new_record("b", 60.0, 1.70)).unwrap();

        assert!(after.id > before.id);
    }

    #[test]
    fn test_unknown_category_is_storage_error() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO bmi_history (name, height, weight, bmi, category, timestamp)
             VALUES ('x', 1.7, 60.0, 20.76, 'Sturdy', '2024-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();

        let err = get_all_records(&conn).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_missing_table_is_storage_error() {
        let conn = Connection::open_in_memory().unwrap();

        assert!(matches!(get_all_records(&conn), Err(Error::Storage(_))));
    }
}
