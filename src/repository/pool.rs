//! SQLite connection handling.
//!
//! There is no real pooling: a consume or purge run holds exactly one
//! connection for its whole duration (see [`super::context::RunContext`]),
//! so connections are simply opened on demand.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::to_diesel_error;

pub type DieselError = diesel::result::Error;

/// Async wrapper around a blocking Diesel SQLite connection.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Opens connections to one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqlitePool {
    path: String,
}

impl SqlitePool {
    /// Accepts either a bare path or a `sqlite:` URL.
    pub fn new(database_url: &str) -> Self {
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            path: path.to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Open a connection, creating the database file if it is missing.
    pub async fn get(&self) -> Result<SqliteConn, DieselError> {
        let mut conn = SqliteConn::establish(&self.path)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))
            .await?;
        Ok(conn)
    }

    /// Filesystem path of the database.
    pub fn database_url(&self) -> &str {
        &self.path
    }
}
