use serde::Deserialize;
use tracing::debug;

use super::{truncate_field, EventParser, LineOutcome, DEFAULT_COUNTRY_CODE};
use crate::models::{DimensionKind, LandingPageEvent};

const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Landing page value that is rebuilt from its component fields.
const SPECIAL_LANDING_PAGE: &str = "Special:LandingPage";
const COMPONENT_DEFAULT: &str = "default";
const COMPONENT_SEPARATOR: char = '-';
const COMPONENT_JOIN: &str = "~";

#[derive(Debug, Default, Deserialize)]
struct RawLandingPage {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    utm_source: Option<String>,
    #[serde(default)]
    utm_campaign: Option<String>,
    #[serde(default)]
    utm_medium: Option<String>,
    #[serde(default)]
    utm_key: Option<String>,
    #[serde(default)]
    contact_id: Option<String>,
    #[serde(default)]
    link_id: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    appeal: Option<String>,
    #[serde(default)]
    appeal_template: Option<String>,
    #[serde(default)]
    form_template: Option<String>,
    #[serde(default)]
    form_countryspecific: Option<String>,
    #[serde(default)]
    landingpage: Option<String>,
}

impl RawLandingPage {
    fn default_validated_fields(&self) -> [(&'static str, &Option<String>); 12] {
        [
            ("utm_source", &self.utm_source),
            ("utm_campaign", &self.utm_campaign),
            ("utm_medium", &self.utm_medium),
            ("utm_key", &self.utm_key),
            ("contact_id", &self.contact_id),
            ("link_id", &self.link_id),
            ("template", &self.template),
            ("appeal", &self.appeal),
            ("appeal_template", &self.appeal_template),
            ("form_template", &self.form_template),
            ("form_countryspecific", &self.form_countryspecific),
            ("landingpage", &self.landingpage),
        ]
    }

    /// Component fields joined into the landing page name, in join order.
    fn components(&self) -> [&Option<String>; 5] {
        [
            &self.template,
            &self.appeal_template,
            &self.appeal,
            &self.form_template,
            &self.form_countryspecific,
        ]
    }
}

/// Keep the part after the last separator, else the part before it, else the default.
fn trim_component(value: Option<&str>) -> &str {
    let value = value.unwrap_or(COMPONENT_DEFAULT);
    let trimmed = match value.rsplit_once(COMPONENT_SEPARATOR) {
        Some((before, after)) if after.is_empty() => before,
        Some((_, after)) => after,
        None => value,
    };
    if trimmed.is_empty() {
        COMPONENT_DEFAULT
    } else {
        trimmed
    }
}

impl EventParser {
    /// Parse a LandingPage impression line.
    pub fn parse_landing_page(&self, line: &str) -> LineOutcome<LandingPageEvent> {
        match self.landing_page(line) {
            Ok(event) => LineOutcome::Valid(event),
            Err(reason) => {
                debug!("{}", reason);
                LineOutcome::Invalid(reason)
            }
        }
    }

    fn landing_page(&self, line: &str) -> Result<LandingPageEvent, String> {
        let (common, raw) = self.parse_envelope::<RawLandingPage>(line, |e| e.country.clone())?;

        let language = match raw.language {
            None => DEFAULT_LANGUAGE_CODE.to_string(),
            Some(ref code) if DimensionKind::Language.is_valid_code(code) => code.clone(),
            Some(ref code) => return Err(format!("Invalid language code: {}", code)),
        };

        for (name, value) in raw.default_validated_fields() {
            if let Some(value) = value {
                if !self.is_str_default_valid(value) {
                    return Err(format!("Invalid {}: {}", name, value));
                }
            }
        }

        let project = match common.wiki {
            None => return Err("Missing wiki project field".to_string()),
            Some(wiki) if !self.is_str_default_valid(&wiki) => {
                return Err(format!("Invalid project: {}", wiki));
            }
            Some(wiki) => wiki,
        };

        let landingpage = if raw.landingpage.as_deref() == Some(SPECIAL_LANDING_PAGE) {
            raw.components()
                .iter()
                .map(|c| trim_component(c.as_deref()))
                .collect::<Vec<_>>()
                .join(COMPONENT_JOIN)
        } else {
            raw.landingpage.clone().unwrap_or_default()
        };

        let mut event = LandingPageEvent {
            time: common.time,
            bot: common.bot,
            utm_source: raw.utm_source.unwrap_or_default(),
            utm_campaign: raw.utm_campaign.unwrap_or_default(),
            utm_medium: raw.utm_medium.unwrap_or_default(),
            utm_key: raw.utm_key.unwrap_or_default(),
            contact_id: raw.contact_id.unwrap_or_default(),
            link_id: raw.link_id.unwrap_or_default(),
            landingpage,
            project,
            language,
            country: common
                .country
                .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
        };

        let uuid = common.uuid.as_str();
        truncate_field(&mut event.utm_source, 255, "utm_source", uuid);
        truncate_field(&mut event.utm_campaign, 255, "utm_campaign", uuid);
        truncate_field(&mut event.utm_medium, 255, "utm_medium", uuid);
        truncate_field(&mut event.utm_key, 128, "utm_key", uuid);
        truncate_field(&mut event.landingpage, 255, "landingpage", uuid);
        truncate_field(&mut event.contact_id, 255, "contact_id", uuid);
        truncate_field(&mut event.link_id, 128, "link_id", uuid);

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{compile_match_regex, Settings};

    fn parser() -> EventParser {
        let pattern =
            compile_match_regex(&Settings::default().default_str_validation_regex).unwrap();
        EventParser::new(pattern)
    }

    fn line(wiki: &str, is_bot: bool, event: &str) -> String {
        format!(
            r#"{{"uuid":"u1","dt":"2023-01-01T00:00:00Z","wiki":"{}","userAgent":{{"is_bot":{}}},"event":{}}}"#,
            wiki, is_bot, event
        )
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let event = parser()
            .parse_landing_page(&line("donatewiki", false, r#"{"landingpage":"Ways_to_Give"}"#))
            .valid()
            .unwrap();

        assert_eq!(event.language, "en");
        assert_eq!(event.country, "XX");
        assert_eq!(event.utm_source, "");
        assert_eq!(event.contact_id, "");
        assert_eq!(event.landingpage, "Ways_to_Give");
        assert!(!event.is_ignored());
    }

    #[test]
    fn test_special_landing_page_components_are_joined() {
        let event = parser()
            .parse_landing_page(&line(
                "donatewiki",
                false,
                r#"{"landingpage":"Special:LandingPage","template":"Lp-layout-default","appeal":"Appeal-JimmyQuote","appeal_template":"Appeal-template-","form_countryspecific":"Form-countryspecific-control","country":"GB","language":"de"}"#,
            ))
            .valid()
            .unwrap();

        assert_eq!(event.landingpage, "default~Appeal-template~JimmyQuote~default~control");
        assert_eq!(event.country, "GB");
        assert_eq!(event.language, "de");
    }

    #[test]
    fn test_trim_component() {
        assert_eq!(trim_component(None), "default");
        assert_eq!(trim_component(Some("plain")), "plain");
        assert_eq!(trim_component(Some("a-b-c")), "c");
        assert_eq!(trim_component(Some("a-")), "a");
        assert_eq!(trim_component(Some("-")), "default");
        assert_eq!(trim_component(Some("")), "default");
    }

    #[test]
    fn test_other_projects_and_bots_are_ignored() {
        let p = parser();
        let other = p
            .parse_landing_page(&line("enwiki", false, "{}"))
            .valid()
            .unwrap();
        assert!(other.is_ignored());

        let bot = p
            .parse_landing_page(&line("donatewiki", true, "{}"))
            .valid()
            .unwrap();
        assert!(bot.is_ignored());
    }

    #[test]
    fn test_invalid_lines() {
        let p = parser();
        assert!(matches!(
            p.parse_landing_page(&line("donatewiki", false, r#"{"language":"EN"}"#)),
            LineOutcome::Invalid(_)
        ));
        assert!(matches!(
            p.parse_landing_page(&line("donatewiki", false, r#"{"utm_source":"a{b}"}"#)),
            LineOutcome::Invalid(_)
        ));
        assert!(matches!(
            p.parse_landing_page(
                r#"{"dt":"2023-01-01T00:00:00Z","userAgent":{"is_bot":false},"event":{}}"#
            ),
            LineOutcome::Invalid(_)
        ));
    }

    #[test]
    fn test_utm_key_truncated_to_128() {
        let key = "k".repeat(200);
        let event = parser()
            .parse_landing_page(&line(
                "donatewiki",
                false,
                &format!(r#"{{"utm_key":"{}"}}"#, key),
            ))
            .valid()
            .unwrap();
        assert_eq!(event.utm_key.len(), 128);
    }
}
