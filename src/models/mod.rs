//! Data models for fruec.

mod dimension;
mod event;
mod log_file;

pub use dimension::{DimensionKind, DimensionRow};
pub use event::{CentralNoticeEvent, LandingPageEvent, DONATEWIKI_PROJECT};
pub use log_file::{EventKind, FileCounters, FileStatus, LogFileRecord, SampleRate};
