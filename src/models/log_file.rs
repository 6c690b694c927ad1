//! Ledger models: log files and their processing status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of events a log file contains. Decides the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// CentralNotice banner impressions, aggregated per minute.
    #[value(name = "centralnotice")]
    CentralNotice,
    /// LandingPage impressions, stored as raw rows.
    #[value(name = "landingpage")]
    LandingPage,
}

impl EventKind {
    /// Value stored in the `files.impression_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CentralNotice => "banner",
            Self::LandingPage => "landingpage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "banner" => Some(Self::CentralNotice),
            "landingpage" => Some(Self::LandingPage),
            _ => None,
        }
    }

    /// Name used on the command line and in messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CentralNotice => "centralnotice",
            Self::LandingPage => "landingpage",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Processing status of a log file.
///
/// The only transition is `Processing -> Consumed`. A row left at
/// `Processing` after a run is the residue of an interrupted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processing,
    Consumed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Consumed => "consumed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "consumed" => Some(Self::Consumed),
            _ => None,
        }
    }
}

/// Server-side sample rate of a log file, as a percentage in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRate(u8);

impl SampleRate {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    /// Returns `None` unless `1 <= rate <= 100`.
    pub fn new(rate: u32) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&rate) {
            Some(Self(rate as u8))
        } else {
            None
        }
    }

    pub fn get(&self) -> u32 {
        u32::from(self.0)
    }

    /// Estimated number of real events represented by one logged event.
    pub fn weight(&self) -> f64 {
        100.0 / f64::from(self.0)
    }
}

/// Per-file event counters, set when a file is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounters {
    pub consumed: u32,
    pub ignored: u32,
    pub invalid: u32,
}

impl FileCounters {
    pub fn record_consumed(&mut self) {
        self.consumed = self.consumed.saturating_add(1);
    }

    pub fn record_ignored(&mut self) {
        self.ignored = self.ignored.saturating_add(1);
    }

    pub fn record_invalid(&mut self) {
        self.invalid = self.invalid.saturating_add(1);
    }
}

/// A log file known to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFileRecord {
    pub id: i32,
    /// Filename without directory. Unique across all event kinds.
    pub filename: String,
    pub directory: String,
    /// Time extracted from the filename.
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub sample_rate: Option<SampleRate>,
    pub status: FileStatus,
    /// `None` while the file is still processing.
    pub counters: Option<FileCounters>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_bounds() {
        assert!(SampleRate::new(0).is_none());
        assert!(SampleRate::new(101).is_none());
        assert_eq!(SampleRate::new(1).unwrap().get(), 1);
        assert_eq!(SampleRate::new(100).unwrap().get(), 100);
    }

    #[test]
    fn test_sample_rate_weight() {
        assert_eq!(SampleRate::new(100).unwrap().weight(), 1.0);
        assert_eq!(SampleRate::new(50).unwrap().weight(), 2.0);
        assert_eq!(SampleRate::new(10).unwrap().weight(), 10.0);
    }

    #[test]
    fn test_event_kind_column_values() {
        for kind in [EventKind::CentralNotice, EventKind::LandingPage] {
            assert_eq!(EventKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::CentralNotice.as_str(), "banner");
        assert_eq!(EventKind::from_str("centralnotice"), None);
    }

    #[test]
    fn test_file_status_column_values() {
        assert_eq!(FileStatus::from_str("processing"), Some(FileStatus::Processing));
        assert_eq!(FileStatus::from_str("consumed"), Some(FileStatus::Consumed));
        assert_eq!(FileStatus::from_str("done"), None);
    }

    #[test]
    fn test_counters_saturate() {
        let mut counters = FileCounters {
            consumed: u32::MAX,
            ignored: 0,
            invalid: u32::MAX - 1,
        };
        counters.record_consumed();
        counters.record_ignored();
        counters.record_invalid();
        counters.record_invalid();
        assert_eq!(counters.consumed, u32::MAX);
        assert_eq!(counters.ignored, 1);
        assert_eq!(counters.invalid, u32::MAX);
    }
}
