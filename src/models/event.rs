//! Validated event value objects.
//!
//! These are produced by `crate::events` from single log lines. Every field
//! has already been checked and defaulted; downstream code never revalidates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project whose LandingPage events are stored. All others are ignored.
pub const DONATEWIKI_PROJECT: &str = "donatewiki";

/// A CentralNotice banner impression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralNoticeEvent {
    pub time: DateTime<Utc>,
    pub bot: bool,
    pub banner_shown: bool,
    /// Banner preview rather than a live campaign.
    pub testing: bool,
    pub banner: Option<String>,
    pub campaign: Option<String>,
    pub project: String,
    pub language: String,
    pub country: String,
}

impl CentralNoticeEvent {
    /// Declared bots and impressions where no banner was shown are not counted.
    pub fn is_ignored(&self) -> bool {
        self.bot || !self.banner_shown
    }
}

/// A LandingPage impression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingPageEvent {
    pub time: DateTime<Utc>,
    pub bot: bool,
    pub utm_source: String,
    pub utm_campaign: String,
    pub utm_medium: String,
    pub utm_key: String,
    pub contact_id: String,
    pub link_id: String,
    pub landingpage: String,
    pub project: String,
    pub language: String,
    pub country: String,
}

impl LandingPageEvent {
    pub fn is_ignored(&self) -> bool {
        self.bot || self.project != DONATEWIKI_PROJECT
    }
}
