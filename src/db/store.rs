//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::models::Channel;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;

        Ok(())
    }

    // --- Channel CRUD ---

    /// Add a new channel.
    pub fn add_channel(&self, channel: &Channel) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO channels (id, name, is_active, is_online, last_checked, check_error) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                channel.id,
                channel.name,
                channel.is_active,
                channel.is_online,
                channel.last_checked.map(format_db_time),
                channel.check_error,
            ],
        )?;
        Ok(())
    }

    /// Get a channel by ID.
    pub fn get_channel(&self, id: &str) -> Result<Channel, DbError> {
        let conn = self.conn.lock().unwrap();
        let channel = conn
            .query_row(
                "SELECT id, name, is_active, is_online, last_checked, check_error \
                 FROM channels WHERE id = ?1",
                params![id],
                row_to_channel,
            )
            .optional()?
            .ok_or(DbError::NotFound)?;
        Ok(channel)
    }

    /// Get channels, optionally restricted to active ones, up to `limit`.
    pub fn get_channels(&self, active_only: bool, limit: i64) -> Result<Vec<Channel>, DbError> {
        let conn = self.conn.lock().unwrap();
        let sql = if active_only {
            "SELECT id, name, is_active, is_online, last_checked, check_error \
             FROM channels WHERE is_active = 1 ORDER BY name ASC LIMIT ?1"
        } else {
            "SELECT id, name, is_active, is_online, last_checked, check_error \
             FROM channels ORDER BY name ASC LIMIT ?1"
        };
        let mut stmt = conn.prepare(sql)?;

        let channels = stmt
            .query_map(params![limit], row_to_channel)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(channels)
    }

    /// Delete a channel.
    pub fn delete_channel(&self, id: &str) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM channels WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // --- Status persistence ---

    /// Record a probe outcome against a channel: online flag, check time, error text.
    ///
    /// Each call fully replaces the prior recorded status.
    pub fn update_channel_status(
        &self,
        id: &str,
        is_online: bool,
        error: Option<&str>,
    ) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE channels SET is_online = ?1, last_checked = ?2, check_error = ?3 WHERE id = ?4",
            params![is_online, format_db_time(Utc::now()), error, id],
        )?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

fn row_to_channel(row: &rusqlite::Row<'_>) -> SqlResult<Channel> {
    let last_checked: Option<String> = row.get(4)?;
    Ok(Channel {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
        is_online: row.get(3)?,
        last_checked: last_checked.as_deref().and_then(parse_db_time),
        check_error: row.get(5)?,
    })
}

fn format_db_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    // Try various formats
    let formats = [
        "%Y-%m-%d %H:%M:%S%.9f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    // Try ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_channel_crud() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        // Create
        let channel = Channel {
            id: "abc123".to_string(),
            name: "Test".to_string(),
            ..Default::default()
        };
        store.add_channel(&channel).unwrap();

        // Read
        let fetched = store.get_channel("abc123").unwrap();
        assert_eq!(fetched.name, "Test");
        assert!(fetched.is_active);
        assert_eq!(fetched.is_online, None);
        assert_eq!(fetched.last_checked, None);

        // Delete
        store.delete_channel("abc123").unwrap();
        assert!(matches!(store.get_channel("abc123"), Err(DbError::NotFound)));
    }

    #[test]
    fn test_update_channel_status() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        store
            .add_channel(&Channel {
                id: "abc123".to_string(),
                name: "Test".to_string(),
                ..Default::default()
            })
            .unwrap();

        store
            .update_channel_status("abc123", false, Some("HTTP 500"))
            .unwrap();

        let fetched = store.get_channel("abc123").unwrap();
        assert_eq!(fetched.is_online, Some(false));
        assert_eq!(fetched.check_error.as_deref(), Some("HTTP 500"));
        assert!(fetched.last_checked.is_some());

        // A later success replaces the error
        store.update_channel_status("abc123", true, None).unwrap();
        let fetched = store.get_channel("abc123").unwrap();
        assert_eq!(fetched.is_online, Some(true));
        assert_eq!(fetched.check_error, None);
    }

    #[test]
    fn test_update_status_unknown_channel() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let result = store.update_channel_status("missing", true, None);
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    #[test]
    fn test_get_channels_active_filter() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        for (id, active) in [("a", true), ("b", false), ("c", true)] {
            store
                .add_channel(&Channel {
                    id: id.to_string(),
                    name: id.to_string(),
                    is_active: active,
                    ..Default::default()
                })
                .unwrap();
        }

        assert_eq!(store.get_channels(false, 100).unwrap().len(), 3);
        let active = store.get_channels(true, 100).unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|c| c.is_active));
    }
}
