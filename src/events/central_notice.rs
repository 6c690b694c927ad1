use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{truncate_field, EventParser, LineOutcome, DEFAULT_COUNTRY_CODE};
use crate::models::{CentralNoticeEvent, DimensionKind};

/// Banner names allowed by CentralNotice.
static BANNER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid banner pattern"));

const BANNER_LIMIT: usize = 255;
const CAMPAIGN_LIMIT: usize = 255;

/// Status code sent when a banner was actually shown.
const BANNER_SHOWN_STATUS: &str = "6";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCentralNotice {
    status_code: String,
    #[serde(default)]
    testing_banner: bool,
    uselang: String,
    db: String,
    #[serde(default)]
    banner: Option<String>,
    #[serde(default)]
    campaign: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl EventParser {
    /// Parse a CentralNotice impression line.
    pub fn parse_central_notice(&self, line: &str) -> LineOutcome<CentralNoticeEvent> {
        match self.central_notice(line) {
            Ok(event) => LineOutcome::Valid(event),
            Err(reason) => {
                debug!("{}", reason);
                LineOutcome::Invalid(reason)
            }
        }
    }

    fn central_notice(&self, line: &str) -> Result<CentralNoticeEvent, String> {
        let (common, raw) =
            self.parse_envelope::<RawCentralNotice>(line, |e| e.country.clone())?;

        if !DimensionKind::Language.is_valid_code(&raw.uselang) {
            return Err(format!("Invalid language code: {}", raw.uselang));
        }

        if !DimensionKind::Project.is_valid_code(&raw.db) {
            return Err(format!("Invalid project: {}", raw.db));
        }

        if let Some(ref banner) = raw.banner {
            if !BANNER_PATTERN.is_match(banner) {
                return Err(format!("Invalid banner: {}", banner));
            }
        }

        if let Some(ref campaign) = raw.campaign {
            if !self.is_str_default_valid(campaign) {
                return Err(format!("Invalid campaign: {}", campaign));
            }
        }

        let has_campaign = raw.campaign.as_deref().is_some_and(|c| !c.is_empty());
        if !has_campaign && !raw.testing_banner {
            return Err("No campaign found, and not a banner preview".to_string());
        }

        let mut banner = raw.banner;
        let mut campaign = raw.campaign;
        if let Some(ref mut banner) = banner {
            truncate_field(banner, BANNER_LIMIT, "banner", &common.uuid);
        }
        if let Some(ref mut campaign) = campaign {
            truncate_field(campaign, CAMPAIGN_LIMIT, "campaign", &common.uuid);
        }

        Ok(CentralNoticeEvent {
            time: common.time,
            bot: common.bot,
            banner_shown: raw.status_code == BANNER_SHOWN_STATUS,
            testing: raw.testing_banner,
            banner,
            campaign,
            project: raw.db,
            language: raw.uselang,
            country: common
                .country
                .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::compile_match_regex;
    use crate::config::Settings;

    fn parser() -> EventParser {
        let pattern =
            compile_match_regex(&Settings::default().default_str_validation_regex).unwrap();
        EventParser::new(pattern)
    }

    fn line(event: &str) -> String {
        format!(
            r#"{{"uuid":"abc","dt":"2023-01-01T00:00:30Z","userAgent":{{"is_bot":false}},"event":{}}}"#,
            event
        )
    }

    #[test]
    fn test_valid_impression() {
        let outcome = parser().parse_central_notice(&line(
            r#"{"statusCode":"6","uselang":"en","db":"enwiki","banner":"BannerA","campaign":"Camp1","country":"US"}"#,
        ));

        let event = outcome.valid().unwrap();
        assert_eq!(event.time, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 30).unwrap());
        assert!(event.banner_shown);
        assert!(!event.is_ignored());
        assert_eq!(event.banner.as_deref(), Some("BannerA"));
        assert_eq!(event.campaign.as_deref(), Some("Camp1"));
        assert_eq!(event.project, "enwiki");
        assert_eq!(event.language, "en");
        assert_eq!(event.country, "US");
    }

    #[test]
    fn test_banner_not_shown_is_ignored() {
        let event = parser()
            .parse_central_notice(&line(
                r#"{"statusCode":"3","uselang":"en","db":"enwiki","campaign":"Camp1"}"#,
            ))
            .valid()
            .unwrap();
        assert!(!event.banner_shown);
        assert!(event.is_ignored());
        assert_eq!(event.country, DEFAULT_COUNTRY_CODE);
    }

    #[test]
    fn test_missing_campaign_only_valid_for_previews() {
        let p = parser();
        let live = p.parse_central_notice(&line(
            r#"{"statusCode":"6","uselang":"en","db":"enwiki","banner":"B"}"#,
        ));
        assert!(matches!(live, LineOutcome::Invalid(_)));

        let preview = p.parse_central_notice(&line(
            r#"{"statusCode":"6","uselang":"en","db":"enwiki","banner":"B","testingBanner":true}"#,
        ));
        let event = preview.valid().unwrap();
        assert!(event.testing);
        assert_eq!(event.campaign, None);
    }

    #[test]
    fn test_invalid_lines() {
        let p = parser();
        let cases = [
            "not json".to_string(),
            line(r#"{"statusCode":"6","uselang":"EN","db":"enwiki","campaign":"C"}"#),
            line(r#"{"statusCode":"6","uselang":"en","db":"En Wiki","campaign":"C"}"#),
            line(r#"{"statusCode":"6","uselang":"en","db":"enwiki","campaign":"C","banner":"a-b"}"#),
            line(r#"{"statusCode":"6","uselang":"en","db":"enwiki","campaign":"C","country":"USA"}"#),
            line(r#"{"statusCode":"6","uselang":"en","db":"enwiki","campaign":"{bad}"}"#),
            r#"{"dt":"2023-01-01 00:00:30","userAgent":{"is_bot":false},"event":{"statusCode":"6","uselang":"en","db":"enwiki","campaign":"C"}}"#.to_string(),
        ];
        for case in cases {
            assert!(
                matches!(p.parse_central_notice(&case), LineOutcome::Invalid(_)),
                "expected invalid: {}",
                case
            );
        }
    }

    #[test]
    fn test_long_banner_is_truncated() {
        let banner = "B".repeat(300);
        let event = parser()
            .parse_central_notice(&line(&format!(
                r#"{{"statusCode":"6","uselang":"en","db":"enwiki","campaign":"C","banner":"{}"}}"#,
                banner
            )))
            .valid()
            .unwrap();
        assert_eq!(event.banner.map(|b| b.len()), Some(255));
    }
}
