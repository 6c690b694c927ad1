//! fruec - Fundraising user event consumer.
//!
//! Ingests rotated CentralNotice and LandingPage impression logs into SQLite.
//! CentralNotice impressions are aggregated per minute; LandingPage
//! impressions are stored as raw rows. Runs interrupted part way through can
//! be purged and re-run.

// Model types use `from_str` methods that return Option<Self>,
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod config;
pub mod consumer;
pub mod error;
pub mod events;
pub mod log_files;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;

pub use consumer::{
    consume_events, incomplete_files, ledger_status, purge_incomplete, ConsumeOptions,
    LedgerStatus, RunStats,
};
pub use error::{ConsumerError, DiscoveryError};
pub use repository::PurgeStats;
