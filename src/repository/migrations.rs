//! Schema migrations using cetane.
//!
//! cetane drives a synchronous rusqlite connection, so every entry point here
//! runs on the blocking thread pool.

use cetane::backend::Sqlite;
use cetane::migrator::{MigrationStateStore, Migrator};
use tracing::info;

use super::pool::DieselError;

const STATE_TABLE: &str = "__cetane_migrations";

fn migration_error(msg: impl std::fmt::Display) -> DieselError {
    DieselError::QueryBuilderError(msg.to_string().into())
}

/// Open the database behind `database_url` with rusqlite and run `f` on a
/// blocking thread.
async fn with_migration_db<T, F>(database_url: &str, f: F) -> Result<T, DieselError>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T, DieselError> + Send + 'static,
{
    let path = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string();

    tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&path).map_err(migration_error)?;
        f(&conn)
    })
    .await
    .map_err(|e| DieselError::QueryBuilderError(Box::new(e)))?
}

/// Apply every pending migration and return the names applied by this call.
pub async fn run_migrations(database_url: &str) -> Result<Vec<String>, DieselError> {
    let applied = with_migration_db(database_url, |conn| {
        let registry = crate::migrations::registry();
        let state = AppliedTable::open(conn)?;
        let mut migrator = Migrator::new(&registry, &Sqlite, state);
        let applied = migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map_err(migration_error)?;
        Ok(applied
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>())
    })
    .await?;

    if applied.is_empty() {
        info!("Database schema is up to date");
    }
    for name in &applied {
        info!("Applied migration {}", name);
    }
    Ok(applied)
}

/// Names of the migrations already applied, in order.
pub async fn applied_migrations(database_url: &str) -> Result<Vec<String>, DieselError> {
    with_migration_db(database_url, |conn| {
        AppliedTable::open(conn)?
            .applied_migrations()
            .map_err(migration_error)
    })
    .await
}

/// cetane state kept in a table of the migrated database itself.
struct AppliedTable<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> AppliedTable<'a> {
    fn open(conn: &'a rusqlite::Connection) -> Result<Self, DieselError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            STATE_TABLE
        ))
        .map_err(migration_error)?;
        Ok(Self { conn })
    }
}

impl MigrationStateStore for AppliedTable<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT name FROM {} ORDER BY name", STATE_TABLE))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", STATE_TABLE),
                [name],
            )
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(&format!("DELETE FROM {} WHERE name = ?1", STATE_TABLE), [name])
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
