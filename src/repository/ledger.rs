//! File-processing ledger.
//!
//! Tracks every log file a run has started, with a two-state lifecycle:
//! a row is inserted at `processing` and flipped once to `consumed`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::models::{FileRecord, NewFile};
use super::pool::{DieselError, SqliteConn};
use super::util::{format_timestamp, parse_timestamp};
use crate::models::{EventKind, FileCounters, FileStatus, LogFileRecord, SampleRate};
use crate::schema::files;

fn invalid_column(column: &str, value: &str) -> DieselError {
    DieselError::DeserializationError(format!("invalid {} value: {:?}", column, value).into())
}

fn counter(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Convert a database record to a domain model.
impl TryFrom<FileRecord> for LogFileRecord {
    type Error = DieselError;

    fn try_from(record: FileRecord) -> Result<Self, Self::Error> {
        let kind = EventKind::from_str(&record.impression_type)
            .ok_or_else(|| invalid_column("impression_type", &record.impression_type))?;
        let status = FileStatus::from_str(&record.status)
            .ok_or_else(|| invalid_column("status", &record.status))?;

        let counters = match (
            record.consumed_events,
            record.ignored_events,
            record.invalid_events,
        ) {
            (Some(consumed), Some(ignored), Some(invalid)) => Some(FileCounters {
                consumed: consumed.max(0) as u32,
                ignored: ignored.max(0) as u32,
                invalid: invalid.max(0) as u32,
            }),
            _ => None,
        };

        Ok(LogFileRecord {
            id: record.id,
            timestamp: parse_timestamp(&record.timestamp)?,
            filename: record.filename,
            directory: record.directory,
            kind,
            sample_rate: record
                .sample_rate
                .and_then(|rate| u32::try_from(rate).ok())
                .and_then(SampleRate::new),
            status,
            counters,
        })
    }
}

/// A file that has been started but not completed.
///
/// Only [`FileLedger::complete`] consumes it, so a handle can't be completed
/// twice.
#[derive(Debug)]
pub struct LogFileHandle {
    id: i32,
    filename: String,
    kind: EventKind,
}

impl LogFileHandle {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Ledger of log files, memoizing filenames known to be in the store.
#[derive(Debug, Default)]
pub struct FileLedger {
    known: HashSet<String>,
}

impl FileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file of any kind with this name is in the ledger.
    pub async fn is_known(
        &mut self,
        conn: &mut SqliteConn,
        filename: &str,
    ) -> Result<bool, DieselError> {
        if self.known.contains(filename) {
            return Ok(true);
        }

        let count: i64 = files::table
            .filter(files::filename.eq(filename))
            .count()
            .get_result(conn)
            .await?;

        if count > 0 {
            self.known.insert(filename.to_string());
        }
        Ok(count > 0)
    }

    /// Insert a `processing` record for a file and return its handle.
    pub async fn begin(
        &mut self,
        conn: &mut SqliteConn,
        filename: &str,
        directory: &str,
        timestamp: &DateTime<Utc>,
        kind: EventKind,
        sample_rate: Option<SampleRate>,
    ) -> Result<LogFileHandle, DieselError> {
        let timestamp = format_timestamp(timestamp);

        diesel::insert_into(files::table)
            .values(NewFile {
                filename,
                impression_type: kind.as_str(),
                timestamp: &timestamp,
                directory,
                sample_rate: sample_rate.map(|rate| rate.get() as i32),
                status: FileStatus::Processing.as_str(),
            })
            .execute(conn)
            .await?;

        let id: i32 = files::table
            .filter(files::filename.eq(filename))
            .select(files::id)
            .first(conn)
            .await?;

        self.known.insert(filename.to_string());

        Ok(LogFileHandle {
            id,
            filename: filename.to_string(),
            kind,
        })
    }

    /// Flip a started file to `consumed` with its final counters.
    pub async fn complete(
        &mut self,
        conn: &mut SqliteConn,
        handle: LogFileHandle,
        counters: FileCounters,
    ) -> Result<(), DieselError> {
        let updated = diesel::update(
            files::table
                .find(handle.id)
                .filter(files::status.eq(FileStatus::Processing.as_str())),
        )
        .set((
            files::status.eq(FileStatus::Consumed.as_str()),
            files::consumed_events.eq(Some(counter(counters.consumed))),
            files::ignored_events.eq(Some(counter(counters.ignored))),
            files::invalid_events.eq(Some(counter(counters.invalid))),
        ))
        .execute(conn)
        .await?;

        if updated == 0 {
            return Err(DieselError::NotFound);
        }
        debug!(
            "Completed {} file {}: {:?}",
            handle.kind(),
            handle.filename(),
            counters
        );
        Ok(())
    }

    /// Latest file timestamp among consumed files of a kind.
    pub async fn latest_consumed_time(
        conn: &mut SqliteConn,
        kind: EventKind,
    ) -> Result<Option<DateTime<Utc>>, DieselError> {
        let latest: Option<String> = files::table
            .filter(files::impression_type.eq(kind.as_str()))
            .filter(files::status.eq(FileStatus::Consumed.as_str()))
            .select(diesel::dsl::max(files::timestamp))
            .first(conn)
            .await?;

        latest.as_deref().map(parse_timestamp).transpose()
    }

    /// Files of a kind left at `processing`, oldest first.
    pub async fn processing_files(
        conn: &mut SqliteConn,
        kind: EventKind,
    ) -> Result<Vec<LogFileRecord>, DieselError> {
        files::table
            .filter(files::impression_type.eq(kind.as_str()))
            .filter(files::status.eq(FileStatus::Processing.as_str()))
            .order((files::timestamp.asc(), files::id.asc()))
            .select(FileRecord::as_select())
            .load(conn)
            .await
            .and_then(|records| records.into_iter().map(LogFileRecord::try_from).collect())
    }

    /// Ids of the files of a kind left at `processing`.
    pub async fn processing_ids(
        conn: &mut SqliteConn,
        kind: EventKind,
    ) -> Result<Vec<i32>, DieselError> {
        files::table
            .filter(files::impression_type.eq(kind.as_str()))
            .filter(files::status.eq(FileStatus::Processing.as_str()))
            .select(files::id)
            .load(conn)
            .await
    }

    /// Delete the `processing` records of a kind.
    pub async fn delete_processing(
        conn: &mut SqliteConn,
        kind: EventKind,
    ) -> Result<usize, DieselError> {
        diesel::delete(
            files::table
                .filter(files::impression_type.eq(kind.as_str()))
                .filter(files::status.eq(FileStatus::Processing.as_str())),
        )
        .execute(conn)
        .await
    }

    /// Look up a file by name.
    pub async fn find(
        conn: &mut SqliteConn,
        filename: &str,
    ) -> Result<Option<LogFileRecord>, DieselError> {
        files::table
            .filter(files::filename.eq(filename))
            .select(FileRecord::as_select())
            .first(conn)
            .await
            .optional()
            .and_then(|opt| opt.map(LogFileRecord::try_from).transpose())
    }

    /// Drop memoized filenames. Needed after records have been deleted.
    pub fn forget(&mut self) {
        self.known.clear();
    }
}
