use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{ReelwatchError, Result};
use crate::domain::Bucket;
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| ReelwatchError::Other(format!("State migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ReelwatchError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

impl Store for SqliteStore {
    fn load_bucket(&self) -> Result<Bucket> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT url FROM downloads ORDER BY position")?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(urls.into_iter().collect())
    }

    fn save_bucket(&self, bucket: &Bucket) -> Result<()> {
        let mut conn = self.conn()?;
        let saved_at = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM downloads", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO downloads (position, url, saved_at) VALUES (?1, ?2, ?3)",
            )?;
            for (position, url) in bucket.iter().enumerate() {
                insert.execute(params![position as i64, url, saved_at])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Saved {} bucket entries", bucket.len());
        Ok(())
    }
}
