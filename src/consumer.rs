//! Run controller: consume log files, purge incomplete runs, report status.
//!
//! Files are processed strictly one after another. Each file is started in
//! the ledger, fully ingested, then completed, before the next is opened.

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{compile_match_regex, compile_search_regex, Settings};
use crate::error::ConsumerError;
use crate::events::{EventParser, LineOutcome};
use crate::log_files::{self, find_log_files, DiscoveryOptions, LogFileInfo, LogLines};
use crate::models::{EventKind, FileCounters, LogFileRecord, SampleRate};
use crate::repository::{
    AggregationSession, BatchWriter, DetailFilter, FileLedger, LogFileHandle, PurgeStats,
    RunContext, SqlitePool,
};

/// What to consume.
#[derive(Debug, Clone)]
pub struct ConsumeOptions {
    pub kind: EventKind,
    /// Start from the latest consumed file of this kind (inclusive).
    pub from_latest: bool,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
}

impl ConsumeOptions {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            from_latest: false,
            from_time: None,
            to_time: None,
        }
    }
}

/// Totals for one consume run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub consumed_files: u32,
    /// Files selected by the options but already in the ledger.
    pub skipped_files: u32,
    pub consumed_events: u32,
    pub ignored_events: u32,
    pub invalid_events: u32,
}

impl RunStats {
    fn record_file(&mut self, counters: &FileCounters) {
        self.consumed_files = self.consumed_files.saturating_add(1);
        self.consumed_events = self.consumed_events.saturating_add(counters.consumed);
        self.ignored_events = self.ignored_events.saturating_add(counters.ignored);
        self.invalid_events = self.invalid_events.saturating_add(counters.invalid);
    }
}

/// Ledger overview for one event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub kind: EventKind,
    pub latest_consumed: Option<DateTime<Utc>>,
    pub processing: Vec<LogFileRecord>,
}

/// Consume new log files of one kind.
///
/// Fails before touching any file if a previous run left files of the same
/// kind at `processing`.
pub async fn consume_events(
    pool: &SqlitePool,
    settings: &Settings,
    options: &ConsumeOptions,
    progress: &ProgressBar,
) -> Result<RunStats, ConsumerError> {
    if options.from_latest && options.from_time.is_some() {
        return Err(ConsumerError::Config(
            "Can't set both from_latest and from_time".to_string(),
        ));
    }

    let kind = options.kind;
    let extract_timestamp = compile_search_regex(&settings.extract_timestamp_regex)?;
    let extract_sample_rate = compile_search_regex(&settings.extract_sample_rate_regex)?;
    let parser = EventParser::new(compile_match_regex(&settings.default_str_validation_regex)?);
    let filter = DetailFilter::new(
        compile_match_regex(&settings.detail_projects_regex)?,
        settings.detail_languages.iter().cloned(),
    );

    let mut ctx = RunContext::open_for_run(pool, kind).await?;

    let mut from_time = options.from_time;
    if options.from_latest {
        from_time = ctx.latest_consumed_time(kind).await?;
        if from_time.is_none() {
            warn!(
                "Requested processing files from latest time previously consumed, \
                 but no latest time was found. Processing with no 'from' limit"
            );
        }
    }

    let source = settings.log_source(kind);
    let files = find_log_files(&DiscoveryOptions {
        directory: &source.directory,
        file_glob: &source.file_glob,
        extract_timestamp: &extract_timestamp,
        timestamp_format: &settings.timestamp_format_in_filenames,
        from_time,
        to_time: options.to_time,
    })?;

    progress.set_length(files.len() as u64);
    let mut stats = RunStats::default();

    for file in &files {
        progress.set_message(file.filename.clone());

        if ctx.is_known(&file.filename).await? {
            debug!("Skipping already processed {}", file.filename);
            stats.skipped_files = stats.skipped_files.saturating_add(1);
            progress.inc(1);
            continue;
        }

        debug!("Processing {}", file.filename);

        let counters = match kind {
            EventKind::CentralNotice => {
                // Extracted before the ledger row exists, so a bad rate leaves
                // no trace of this file.
                let rate = log_files::sample_rate(&file.filename, &extract_sample_rate)?;
                let handle = ctx
                    .begin(&file.filename, &file.directory, &file.time, kind, Some(rate))
                    .await?;
                let counters =
                    consume_central_notice_file(&mut ctx, &handle, file, rate, &parser, &filter)
                        .await?;
                ctx.complete(handle, counters).await?;
                counters
            }
            EventKind::LandingPage => {
                let handle = ctx
                    .begin(&file.filename, &file.directory, &file.time, kind, None)
                    .await?;
                let counters = consume_landing_page_file(
                    &mut ctx,
                    &handle,
                    file,
                    settings.lp_max_batch,
                    &parser,
                )
                .await?;
                ctx.complete(handle, counters).await?;
                counters
            }
        };

        stats.record_file(&counters);
        progress.inc(1);
    }

    info!(
        "Consumed {} {} files ({} skipped): {} events consumed, {} ignored, {} invalid",
        stats.consumed_files,
        kind,
        stats.skipped_files,
        stats.consumed_events,
        stats.ignored_events,
        stats.invalid_events
    );
    Ok(stats)
}

async fn consume_central_notice_file(
    ctx: &mut RunContext,
    handle: &LogFileHandle,
    file: &LogFileInfo,
    rate: SampleRate,
    parser: &EventParser,
    filter: &DetailFilter,
) -> Result<FileCounters, ConsumerError> {
    let mut counters = FileCounters::default();
    let mut session = AggregationSession::new(handle, rate, filter);

    for line in LogLines::open(&file.path())? {
        let (line_no, line) = line?;
        match parser.parse_central_notice(&line) {
            LineOutcome::Invalid(reason) => {
                counters.record_invalid();
                debug!(
                    "Invalid data on line {} of {}: {}",
                    line_no, file.filename, reason
                );
            }
            LineOutcome::Valid(event) if event.is_ignored() => counters.record_ignored(),
            LineOutcome::Valid(event) => {
                session.add_event(&event);
                counters.record_consumed();
            }
        }
    }

    let summary = session.save(ctx).await?;
    debug!(
        "Saved {}: {} new cells, {} merged into existing cells",
        file.filename, summary.cells_inserted, summary.cells_merged
    );
    Ok(counters)
}

async fn consume_landing_page_file(
    ctx: &mut RunContext,
    handle: &LogFileHandle,
    file: &LogFileInfo,
    max_batch: usize,
    parser: &EventParser,
) -> Result<FileCounters, ConsumerError> {
    let mut counters = FileCounters::default();
    let mut writer = BatchWriter::new(handle, max_batch);

    for line in LogLines::open(&file.path())? {
        let (line_no, line) = line?;
        match parser.parse_landing_page(&line) {
            LineOutcome::Invalid(reason) => {
                counters.record_invalid();
                debug!(
                    "Invalid data on line {} of {}: {}",
                    line_no, file.filename, reason
                );
            }
            LineOutcome::Valid(event) if event.is_ignored() => counters.record_ignored(),
            LineOutcome::Valid(event) => {
                writer.add_and_maybe_flush(ctx, &event).await?;
                counters.record_consumed();
            }
        }
    }

    writer.flush_remaining(ctx).await?;
    debug!(
        "Saved {}: {} rows in {} batches",
        file.filename,
        writer.rows_written(),
        writer.flushes()
    );
    Ok(counters)
}

/// Files of a kind left at `processing` by an interrupted run.
pub async fn incomplete_files(
    pool: &SqlitePool,
    kind: EventKind,
) -> Result<Vec<LogFileRecord>, ConsumerError> {
    let mut ctx = RunContext::open(pool).await?;
    Ok(FileLedger::processing_files(ctx.conn(), kind).await?)
}

/// Remove all data and ledger records of incomplete files of a kind.
pub async fn purge_incomplete(
    pool: &SqlitePool,
    kind: EventKind,
) -> Result<PurgeStats, ConsumerError> {
    let mut ctx = RunContext::open(pool).await?;
    Ok(crate::repository::purge_incomplete(&mut ctx, kind).await?)
}

/// Latest consumed time and `processing` residue for a kind.
pub async fn ledger_status(
    pool: &SqlitePool,
    kind: EventKind,
) -> Result<LedgerStatus, ConsumerError> {
    let mut ctx = RunContext::open(pool).await?;
    let latest_consumed = ctx.latest_consumed_time(kind).await?;
    let processing = FileLedger::processing_files(ctx.conn(), kind).await?;
    Ok(LedgerStatus {
        kind,
        latest_consumed,
        processing,
    })
}
