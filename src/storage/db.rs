use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Local};
use rusqlite::Connection;

use crate::{
    config::Database,
    storage::{error::StorageError, schema},
};

pub type SecondsSinceUnix = i64;

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &std::path::Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

/// Opens the configured database and makes sure the schema exists
pub fn open(config: &Database) -> Result<rusqlite::Connection, StorageError> {
    let db = match config {
        Database::InMemory => open_in_memory()?,
        Database::OnDisk { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            open_from_file(path)?
        }
    };
    schema::init(&db)?;
    Ok(db)
}

/// converts time to number of seconds since unix_epoch
pub fn system_time_to_i64(time: SystemTime) -> anyhow::Result<SecondsSinceUnix> {
    i64::try_from(
        time.duration_since(UNIX_EPOCH)
            .with_context(|| "failed to get unix timestamp")?
            .as_secs(),
    )
    .with_context(|| "failed to get timestamp in seconds")
}

/// converts number of seconds since unix epoch local time to local date time
pub fn i64_seconds_to_local_time(since_unix: i64) -> anyhow::Result<DateTime<Local>> {
    let datetime = DateTime::from_timestamp_secs(since_unix).ok_or(anyhow!(
        "failed to convert {since_unix} s timestamp to datetime"
    ))?;

    Ok(DateTime::from(datetime))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::{
        config::Database,
        storage::{db::open, schema},
    };

    fn table_names(db: &rusqlite::Connection) -> Vec<String> {
        let mut stmt = db
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();

        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn open_in_memory_db_initializes_schema() {
        let db = open(&Database::InMemory).unwrap();
        let tables = table_names(&db);

        for table in schema::tables::ALL_TABLES {
            assert!(tables.contains(&table.to_string()));
        }

        let foreign_keys: i64 = db
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_on_disk_creates_parent_dirs_and_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tracksync.db");
        let config = Database::OnDisk { path: path.clone() };

        let db = open(&config).unwrap();
        db.execute(
            "INSERT INTO artists (id, name, created_at, updated_at) VALUES (1, 'a', 0, 0)",
            [],
        )
        .unwrap();
        drop(db);

        assert!(path.exists());

        // schema init is idempotent and keeps rows
        let db = open(&config).unwrap();
        let count: i64 = db
            .query_row("SELECT COUNT(*) FROM artists", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
