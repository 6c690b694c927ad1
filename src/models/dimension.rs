//! Dimension models: projects, languages and countries.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PROJECT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9\-_.]+$").expect("valid project pattern"));
static LANGUAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z\-_]+$").expect("valid language pattern"));
static COUNTRY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]{2}$").expect("valid country pattern"));

const PROJECT_CODE_LIMIT: usize = 128;
const LANGUAGE_CODE_LIMIT: usize = 24;

/// The three dimension tables. Each maps a natural code to a row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    Project,
    Language,
    Country,
}

impl DimensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Language => "language",
            Self::Country => "country",
        }
    }

    /// Whether `code` is a well-formed code for this dimension.
    pub fn is_valid_code(&self, code: &str) -> bool {
        match self {
            Self::Project => {
                code.chars().count() <= PROJECT_CODE_LIMIT && PROJECT_PATTERN.is_match(code)
            }
            Self::Language => {
                code.chars().count() <= LANGUAGE_CODE_LIMIT && LANGUAGE_PATTERN.is_match(code)
            }
            Self::Country => COUNTRY_PATTERN.is_match(code),
        }
    }
}

impl std::fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored dimension row. Never updated or deleted once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionRow {
    pub kind: DimensionKind,
    pub id: i32,
    pub code: String,
}
