//! SQLite database for the eligibility log

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::eligibility::ServiceType;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS eligibility_logs (
         id           INTEGER PRIMARY KEY AUTOINCREMENT,
         user_id      TEXT NOT NULL,
         service_type TEXT NOT NULL,
         input_data   TEXT NOT NULL,
         result       TEXT NOT NULL,
         created_at   TEXT NOT NULL DEFAULT (datetime('now'))
     );
     CREATE INDEX IF NOT EXISTS idx_eligibility_logs_user ON eligibility_logs(user_id);";

/// Record handed to the log store; opaque beyond these four fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityLog {
    pub user_id: String,
    pub service_type: ServiceType,
    pub input_data: Value,
    pub result: String,
}

/// A stored log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Row id assigned by the store
    pub id: i64,
    #[serde(flatten)]
    pub log: EligibilityLog,
    /// UTC timestamp, `YYYY-MM-DD HH:MM:SS`
    pub created_at: String,
}

/// Persistence collaborator for eligibility results and completed forms
pub trait LogStore {
    /// Insert one record, returning its id
    fn insert(&self, log: &EligibilityLog) -> Result<i64>;
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open log database at {:?}", path))?;
        let db = Self { conn };
        db.init_schema()?;
        info!("Eligibility log opened at {:?}", path);
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to initialize eligibility_logs schema")
    }

    /// Most recent records for a user, newest first
    pub fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, service_type, input_data, result, created_at
             FROM eligibility_logs
             WHERE user_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

impl LogStore for Database {
    fn insert(&self, log: &EligibilityLog) -> Result<i64> {
        let input_json = serde_json::to_string(&log.input_data)?;
        self.conn
            .execute(
                "INSERT INTO eligibility_logs (user_id, service_type, input_data, result)
                 VALUES (?1, ?2, ?3, ?4)",
                params![log.user_id, log.service_type.as_str(), input_json, log.result],
            )
            .context("Failed to insert eligibility log")?;

        let id = self.conn.last_insert_rowid();
        debug!("Logged {} result as row {}", log.service_type, id);
        Ok(id)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let service: String = row.get(2)?;
    let service_type = ServiceType::parse(&service).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown service type '{}'", service).into(),
        )
    })?;

    let input: String = row.get(3)?;
    let input_data = serde_json::from_str(&input).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(LogEntry {
        id: row.get(0)?,
        log: EligibilityLog {
            user_id: row.get(1)?,
            service_type,
            input_data,
            result: row.get(4)?,
        },
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample(user: &str, service_type: ServiceType, result: &str) -> EligibilityLog {
        EligibilityLog {
            user_id: user.to_string(),
            service_type,
            input_data: json!({ "salary": 40000.0, "existing_cards": 2 }),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert(&sample("u1", ServiceType::CreditCard, "Eligible"))
            .unwrap();

        let entries = db.recent("u1", 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].log.service_type, ServiceType::CreditCard);
        assert_eq!(entries[0].log.input_data["existing_cards"], 2);
        assert!(!entries[0].created_at.is_empty());
    }

    #[test]
    fn test_recent_is_newest_first_and_per_user() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&sample("u1", ServiceType::Visa, "first")).unwrap();
        db.insert(&sample("u2", ServiceType::Loan, "other user")).unwrap();
        db.insert(&sample("u1", ServiceType::Insurance, "second")).unwrap();
        db.insert(&sample("u1", ServiceType::FormFiller, "third")).unwrap();

        let entries = db.recent("u1", 2).unwrap();
        let results: Vec<&str> = entries.iter().map(|e| e.log.result.as_str()).collect();
        assert_eq!(results, vec!["third", "second"]);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert(&sample("u1", ServiceType::Loan, "kept")).unwrap();
        }

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.recent("u1", 5).unwrap()[0].log.result, "kept");
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        assert!(Database::open(Path::new("/nonexistent/dir/logs.db")).is_err());
    }
}
