//! Parsing and validation of single log lines.
//!
//! Each line holds one JSON event. A line either yields a validated event or
//! is rejected with a reason; a rejected line never fails the file.

mod central_notice;
mod landing_page;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::models::DimensionKind;

/// Format of the `dt` field of every event.
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Country stored for events that carry none.
pub const DEFAULT_COUNTRY_CODE: &str = "XX";

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome<E> {
    Valid(E),
    Invalid(String),
}

impl<E> LineOutcome<E> {
    pub fn valid(self) -> Option<E> {
        match self {
            Self::Valid(event) => Some(event),
            Self::Invalid(_) => None,
        }
    }
}

/// Turns raw log lines into validated events.
#[derive(Debug, Clone)]
pub struct EventParser {
    default_str_pattern: Regex,
}

/// Fields shared by both kinds of event.
#[derive(Debug, Deserialize)]
struct Envelope<E> {
    #[serde(default)]
    uuid: String,
    dt: String,
    #[serde(rename = "userAgent")]
    user_agent: UserAgent,
    #[serde(default)]
    wiki: Option<String>,
    event: E,
}

#[derive(Debug, Deserialize)]
struct UserAgent {
    is_bot: bool,
}

/// Common fields after validation.
struct Common {
    uuid: String,
    time: DateTime<Utc>,
    bot: bool,
    country: Option<String>,
    wiki: Option<String>,
}

impl EventParser {
    /// `default_str_pattern` validates string fields that have no more specific
    /// format. It is applied with `is_match`, so anchor it as needed.
    pub fn new(default_str_pattern: Regex) -> Self {
        Self {
            default_str_pattern,
        }
    }

    fn is_str_default_valid(&self, s: &str) -> bool {
        self.default_str_pattern.is_match(s)
    }

    /// Deserialize the envelope and check the fields common to all events.
    fn parse_envelope<E: DeserializeOwned>(
        &self,
        line: &str,
        country_of: impl FnOnce(&E) -> Option<String>,
    ) -> Result<(Common, E), String> {
        let envelope: Envelope<E> =
            serde_json::from_str(line.trim_end()).map_err(|e| format!("Invalid JSON: {}", e))?;

        let country = country_of(&envelope.event).filter(|c| !c.is_empty());
        if let Some(ref code) = country {
            if !DimensionKind::Country.is_valid_code(code) {
                return Err(format!("Invalid country code: {}", code));
            }
        }

        let time = NaiveDateTime::parse_from_str(&envelope.dt, EVENT_TIMESTAMP_FORMAT)
            .map_err(|e| format!("Invalid timestamp {:?}: {}", envelope.dt, e))?
            .and_utc();

        Ok((
            Common {
                uuid: envelope.uuid,
                time,
                bot: envelope.user_agent.is_bot,
                country,
                wiki: envelope.wiki,
            },
            envelope.event,
        ))
    }
}

/// Truncate `value` to `limit` characters, logging when it was too long.
/// The event stays valid.
fn truncate_field(value: &mut String, limit: usize, field: &str, uuid: &str) {
    if let Some((byte_index, _)) = value.char_indices().nth(limit) {
        warn!("Field {} too long in event {}", field, uuid);
        value.truncate(byte_index);
    }
}
