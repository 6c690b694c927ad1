//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM through diesel-async's
//! `SyncConnectionWrapper` over SQLite.

pub mod aggregation;
pub mod batch_writer;
pub mod context;
pub mod dimension;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod recovery;
pub mod util;

pub use aggregation::{AggregationSession, DetailFilter, SaveSummary};
pub use batch_writer::BatchWriter;
pub use context::{RunContext, OTHER_LANGUAGE_CODE, OTHER_PROJECT_CODE};
pub use dimension::DimensionCache;
pub use ledger::{FileLedger, LogFileHandle};
pub use migrations::{applied_migrations, run_migrations};
pub use pool::{DieselError, SqliteConn, SqlitePool};
pub use recovery::{purge_incomplete, PurgeStats, ZERO_COUNT_TOLERANCE};
