//! SQLite-backed store: connection, migrations, and timestamp helpers.
//! Request/file CRUD lives in `requests`.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::BdmConfig;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed request/file store.
///
/// By default the database lives under the XDG state directory:
/// `~/.local/state/bdm/bdm.db` on Debian.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open the store configured in `cfg` (explicit `db_path`, else the XDG default).
    pub async fn open(cfg: &BdmConfig) -> Result<Self> {
        match &cfg.db_path {
            Some(path) => Self::open_at(path).await,
            None => Self::open_default().await,
        }
    }

    /// Open (or create) the default database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("bdm")?;
        let db_path = xdg_dirs.get_state_home().join("bdm.db");
        Self::open_at(db_path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let store = SqliteStore { pool };
        store.migrate().await?;
        tracing::debug!("store opened at {}", path.display());
        Ok(store)
    }

    pub(crate) async fn migrate(&self) -> Result<()> {
        // - `timeout_ms` keeps the caller's batch deadline so stranded requests can be re-run.
        // - A file row is pending while both `data` and `error_code` are NULL.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                status TEXT NOT NULL,
                timeout_ms INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL REFERENCES requests(id) ON DELETE CASCADE,
                url TEXT NOT NULL,
                data BLOB,
                error_code TEXT,
                updated_at INTEGER NOT NULL,
                CHECK (data IS NULL OR error_code IS NULL)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS files_request_url ON files (request_id, url);")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<SqliteStore> {
    // Single connection so the pool never hands back a different empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = SqliteStore { pool };
    store.migrate().await?;
    Ok(store)
}
