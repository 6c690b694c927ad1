//! Per-run database context.
//!
//! A run owns exactly one connection plus the ledger memo and the dimension
//! caches. Everything is dropped when the run ends.

use chrono::{DateTime, Utc};

use super::dimension::DimensionCache;
use super::ledger::{FileLedger, LogFileHandle};
use super::pool::{DieselError, SqliteConn, SqlitePool};
use crate::error::ConsumerError;
use crate::models::{DimensionKind, DimensionRow, EventKind, FileCounters, SampleRate};

/// Project that non-detail projects are aggregated under.
pub const OTHER_PROJECT_CODE: &str = "other_project";

/// Language that non-detail languages are aggregated under.
pub const OTHER_LANGUAGE_CODE: &str = "other";

pub struct RunContext {
    conn: SqliteConn,
    ledger: FileLedger,
    dimensions: DimensionCache,
    other_project: Option<DimensionRow>,
    other_language: Option<DimensionRow>,
}

impl RunContext {
    /// Open a context without checking the ledger (purge and status).
    pub async fn open(pool: &SqlitePool) -> Result<Self, DieselError> {
        Ok(Self {
            conn: pool.get().await?,
            ledger: FileLedger::new(),
            dimensions: DimensionCache::new(),
            other_project: None,
            other_language: None,
        })
    }

    /// Open a context for ingesting files of `kind`.
    ///
    /// Fails if a previous run left files of that kind at `processing`.
    pub async fn open_for_run(pool: &SqlitePool, kind: EventKind) -> Result<Self, ConsumerError> {
        let mut ctx = Self::open(pool).await?;
        let residue = FileLedger::processing_ids(&mut ctx.conn, kind).await?;
        if !residue.is_empty() {
            return Err(ConsumerError::ProcessingFilesFound { kind });
        }
        Ok(ctx)
    }

    pub fn conn(&mut self) -> &mut SqliteConn {
        &mut self.conn
    }

    // -- ledger --

    pub async fn is_known(&mut self, filename: &str) -> Result<bool, DieselError> {
        self.ledger.is_known(&mut self.conn, filename).await
    }

    pub async fn begin(
        &mut self,
        filename: &str,
        directory: &str,
        timestamp: &DateTime<Utc>,
        kind: EventKind,
        sample_rate: Option<SampleRate>,
    ) -> Result<LogFileHandle, DieselError> {
        self.ledger
            .begin(
                &mut self.conn,
                filename,
                directory,
                timestamp,
                kind,
                sample_rate,
            )
            .await
    }

    pub async fn complete(
        &mut self,
        handle: LogFileHandle,
        counters: FileCounters,
    ) -> Result<(), DieselError> {
        self.ledger.complete(&mut self.conn, handle, counters).await
    }

    pub async fn latest_consumed_time(
        &mut self,
        kind: EventKind,
    ) -> Result<Option<DateTime<Utc>>, DieselError> {
        FileLedger::latest_consumed_time(&mut self.conn, kind).await
    }

    pub(crate) fn forget_known_files(&mut self) {
        self.ledger.forget();
    }

    // -- dimensions --

    pub async fn dimension(
        &mut self,
        kind: DimensionKind,
        code: &str,
    ) -> Result<DimensionRow, ConsumerError> {
        self.dimensions
            .get_or_create(&mut self.conn, kind, code)
            .await
    }

    /// Shared row for projects without detail tracking.
    pub async fn other_project(&mut self) -> Result<DimensionRow, ConsumerError> {
        if let Some(ref row) = self.other_project {
            return Ok(row.clone());
        }
        let row = self
            .dimension(DimensionKind::Project, OTHER_PROJECT_CODE)
            .await?;
        self.other_project = Some(row.clone());
        Ok(row)
    }

    /// Shared row for languages without detail tracking.
    pub async fn other_language(&mut self) -> Result<DimensionRow, ConsumerError> {
        if let Some(ref row) = self.other_language {
            return Ok(row.clone());
        }
        let row = self
            .dimension(DimensionKind::Language, OTHER_LANGUAGE_CODE)
            .await?;
        self.other_language = Some(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::repository::migrations::run_migrations;

    async fn pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("ctx.db").display());
        run_migrations(&url).await.unwrap();
        (dir, SqlitePool::new(&url))
    }

    #[tokio::test]
    async fn test_processing_residue_blocks_only_its_kind() {
        let (_dir, pool) = pool().await;
        let time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

        let mut ctx = RunContext::open_for_run(&pool, EventKind::CentralNotice)
            .await
            .unwrap();
        ctx.begin("a.log", "/cn", &time, EventKind::CentralNotice, None)
            .await
            .unwrap();
        drop(ctx);

        let blocked = RunContext::open_for_run(&pool, EventKind::CentralNotice).await;
        assert!(matches!(
            blocked,
            Err(ConsumerError::ProcessingFilesFound {
                kind: EventKind::CentralNotice
            })
        ));

        assert!(RunContext::open_for_run(&pool, EventKind::LandingPage)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_sentinels_are_created_once() {
        let (_dir, pool) = pool().await;
        let mut ctx = RunContext::open(&pool).await.unwrap();

        let project = ctx.other_project().await.unwrap();
        assert_eq!(project.code, OTHER_PROJECT_CODE);
        assert_eq!(ctx.other_project().await.unwrap(), project);

        let language = ctx.other_language().await.unwrap();
        assert_eq!(language.code, OTHER_LANGUAGE_CODE);
        assert_eq!(language.kind, DimensionKind::Language);

        // Asking for the code directly gives the same row.
        let direct = ctx
            .dimension(DimensionKind::Project, OTHER_PROJECT_CODE)
            .await
            .unwrap();
        assert_eq!(direct.id, project.id);
    }
}
