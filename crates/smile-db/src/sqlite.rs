use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, ErrorCode, ffi};
use tokio::time::Instant;
use tracing::info;

use smile_types::models::{NewEntry, WhitelistEntry};

use crate::{StoreError, WhitelistStore, migrations};

const LOCK_POLL: Duration = Duration::from_millis(2);

/// Local whitelist store backed by a single SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Whitelist DB opened at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn get_entry(&self, fid: u64) -> Result<Option<WhitelistEntry>> {
        let fid = i64::try_from(fid)?;
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT fid, username, display_name, pfp_url, joined_at
                     FROM whitelist_entries WHERE fid = ?1",
                    [fid],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(fid, username, display_name, pfp_url, joined_at)| -> Result<WhitelistEntry> {
                Ok(WhitelistEntry {
                    fid: u64::try_from(fid)?,
                    username,
                    display_name,
                    pfp_url,
                    joined_at: DateTime::parse_from_rfc3339(&joined_at)?.with_timezone(&Utc),
                })
            })
            .transpose()
        })
    }

    pub fn count_entries(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM whitelist_entries", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }
}

#[async_trait]
impl WhitelistStore for SqliteStore {
    async fn insert(&self, entry: NewEntry, deadline: Instant) -> Result<WhitelistEntry, StoreError> {
        let conn = self.conn.clone();
        let deadline = deadline.into_std();
        tokio::task::spawn_blocking(move || {
            let conn = lock_until(&conn, deadline)?;
            // Checked under the lock, right before the write.
            if std::time::Instant::now() >= deadline {
                return Err(StoreError::Timeout);
            }
            insert_entry(&conn, entry)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("insert task failed: {}", e)))?
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Wait for the connection, giving up once `deadline` passes.
fn lock_until(
    conn: &Mutex<Connection>,
    deadline: std::time::Instant,
) -> Result<MutexGuard<'_, Connection>, StoreError> {
    loop {
        match conn.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(e)) => {
                return Err(StoreError::Backend(format!("DB lock poisoned: {}", e)));
            }
            Err(TryLockError::WouldBlock) => {
                if std::time::Instant::now() >= deadline {
                    return Err(StoreError::Timeout);
                }
                std::thread::sleep(LOCK_POLL);
            }
        }
    }
}

fn insert_entry(conn: &Connection, entry: NewEntry) -> Result<WhitelistEntry, StoreError> {
    let fid = i64::try_from(entry.fid)
        .map_err(|_| StoreError::Backend(format!("fid {} is out of range", entry.fid)))?;

    // joined_at never goes backwards, even if the wall clock does.
    let last: Option<String> = conn
        .query_row("SELECT MAX(joined_at) FROM whitelist_entries", [], |r| r.get(0))
        .map_err(backend_error)?;
    // Stored at microsecond precision, so stamp at the same precision.
    let now = Utc::now().trunc_subsecs(6);
    let joined_at = match last.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()) {
        Some(last) if last.with_timezone(&Utc) > now => last.with_timezone(&Utc),
        _ => now,
    };

    let result = conn.execute(
        "INSERT INTO whitelist_entries (fid, username, display_name, pfp_url, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            fid,
            &entry.username,
            &entry.display_name,
            &entry.pfp_url,
            // Fixed-width UTC text so MAX() orders chronologically.
            joined_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    );

    match result {
        Ok(_) => Ok(entry.stamped(joined_at)),
        Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateKey { fid: entry.fid }),
        Err(e) => Err(backend_error(e)),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

fn backend_error(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
