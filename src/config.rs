//! Configuration management.
//!
//! A config file (TOML, YAML or JSON) is optional. Every key falls back to a
//! built-in default, and `DATABASE_URL` overrides the database location.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConsumerError;
use crate::models::EventKind;

/// Default database filename.
const DEFAULT_DATABASE_FILENAME: &str = "fruec.db";

/// Basename searched for in config directories.
const CONFIG_BASENAME: &str = "fruec";

/// Extensions tried, in order, when looking for a config file.
const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const DEFAULT_EXTRACT_TIMESTAMP_REGEX: &str = r"\d{14}";
const DEFAULT_EXTRACT_SAMPLE_RATE_REGEX: &str = r"-(\d+)\.log";
const DEFAULT_STR_VALIDATION_REGEX: &str = r"^[\w\-.:~+ ]*$";
const DEFAULT_DETAIL_PROJECTS_REGEX: &str = r"[a-z]+wiki$";
const DEFAULT_DETAIL_LANGUAGES: [&str; 12] = [
    "en", "de", "fr", "it", "es", "ja", "nl", "pt", "sv", "pl", "ru", "zh",
];
const DEFAULT_LP_MAX_BATCH: usize = 500;

/// Where log files of one event kind are found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub directory: PathBuf,
    pub file_glob: String,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database URL (`sqlite:` prefix optional).
    pub database_url: String,
    /// chrono format of the timestamp embedded in log filenames.
    pub timestamp_format_in_filenames: String,
    pub extract_timestamp_regex: String,
    /// The first capture group (or the whole match) is the sample rate.
    pub extract_sample_rate_regex: String,
    /// Used for string fields without more specific validation.
    pub default_str_validation_regex: String,
    /// Languages aggregated individually. Others fold into `other`.
    pub detail_languages: Vec<String>,
    /// Projects matching this (at the start) are aggregated individually.
    pub detail_projects_regex: String,
    pub lp_max_batch: usize,
    pub centralnotice: LogSource,
    pub landingpage: LogSource,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fruec");

        Self {
            database_url: format!(
                "sqlite:{}",
                data_dir.join(DEFAULT_DATABASE_FILENAME).display()
            ),
            timestamp_format_in_filenames: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            extract_timestamp_regex: DEFAULT_EXTRACT_TIMESTAMP_REGEX.to_string(),
            extract_sample_rate_regex: DEFAULT_EXTRACT_SAMPLE_RATE_REGEX.to_string(),
            default_str_validation_regex: DEFAULT_STR_VALIDATION_REGEX.to_string(),
            detail_languages: DEFAULT_DETAIL_LANGUAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            detail_projects_regex: DEFAULT_DETAIL_PROJECTS_REGEX.to_string(),
            lp_max_batch: DEFAULT_LP_MAX_BATCH,
            centralnotice: LogSource {
                directory: PathBuf::from("/srv/fruec/centralnotice"),
                file_glob: "centralnotice-impressions-*.log*".to_string(),
            },
            landingpage: LogSource {
                directory: PathBuf::from("/srv/fruec/landingpage"),
                file_glob: "landingpage-impressions-*.log*".to_string(),
            },
        }
    }
}

impl Settings {
    /// Log file location for an event kind.
    pub fn log_source(&self, kind: EventKind) -> &LogSource {
        match kind {
            EventKind::CentralNotice => &self.centralnotice,
            EventKind::LandingPage => &self.landingpage,
        }
    }

    /// Mutable log file location for an event kind (used for CLI overrides).
    pub fn log_source_mut(&mut self, kind: EventKind) -> &mut LogSource {
        match kind {
            EventKind::CentralNotice => &mut self.centralnotice,
            EventKind::LandingPage => &mut self.landingpage,
        }
    }

    /// Ensure the directory holding the SQLite database exists.
    pub fn ensure_database_dir(&self) -> std::io::Result<()> {
        let path = self
            .database_url
            .strip_prefix("sqlite:")
            .unwrap_or(&self.database_url);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Per-kind section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_glob: Option<String>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database file path or `sqlite:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_format_in_filenames: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_timestamp_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_sample_rate_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_str_validation_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_languages: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_projects_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lp_max_batch: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centralnotice: Option<LogSourceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landingpage: Option<LogSourceConfig>,

    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    /// The format is chosen by file extension; anything unknown is read as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory used to resolve relative paths in this config.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        let base_dir = self.base_dir();

        if let Some(ref database) = self.database {
            let path = database.strip_prefix("sqlite:").unwrap_or(database);
            settings.database_url =
                format!("sqlite:{}", self.resolve_path(path, &base_dir).display());
        }
        if let Some(ref format) = self.timestamp_format_in_filenames {
            settings.timestamp_format_in_filenames = format.clone();
        }
        if let Some(ref regex) = self.extract_timestamp_regex {
            settings.extract_timestamp_regex = regex.clone();
        }
        if let Some(ref regex) = self.extract_sample_rate_regex {
            settings.extract_sample_rate_regex = regex.clone();
        }
        if let Some(ref regex) = self.default_str_validation_regex {
            settings.default_str_validation_regex = regex.clone();
        }
        if let Some(ref languages) = self.detail_languages {
            settings.detail_languages = languages.clone();
        }
        if let Some(ref regex) = self.detail_projects_regex {
            settings.detail_projects_regex = regex.clone();
        }
        if let Some(max_batch) = self.lp_max_batch {
            settings.lp_max_batch = max_batch;
        }

        for (section, kind) in [
            (&self.centralnotice, EventKind::CentralNotice),
            (&self.landingpage, EventKind::LandingPage),
        ] {
            let Some(section) = section else { continue };
            let source = settings.log_source_mut(kind);
            if let Some(ref directory) = section.directory {
                source.directory = self.resolve_path(directory, &base_dir);
            }
            if let Some(ref glob) = section.file_glob {
                source.file_glob = glob.clone();
            }
        }
    }
}

/// Find a config file: `./fruec.*`, then `<config dir>/fruec/fruec.*`.
fn discover_config_path() -> Option<PathBuf> {
    let mut dirs_to_try = vec![PathBuf::from(".")];
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_try.push(config_dir.join(CONFIG_BASENAME));
    }

    for dir in dirs_to_try {
        for ext in CONFIG_EXTENSIONS {
            let path = dir.join(format!("{}.{}", CONFIG_BASENAME, ext));
            if path.is_file() {
                return Some(path);
            }
        }
    }
    None
}

/// Load settings from an explicit config path or from the discovered one.
///
/// An explicit path that can't be read is an error. Without any config file
/// the built-in defaults are used.
pub async fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConsumerError> {
    let mut settings = Settings::default();

    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_path(),
    };

    if let Some(path) = path {
        tracing::debug!("Using configuration file: {}", path.display());
        let config = Config::load_from_path(&path)
            .await
            .map_err(ConsumerError::Config)?;
        config.apply_to_settings(&mut settings);
    }

    if let Some(url) = std::env::var("DATABASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
    {
        settings.database_url = url;
    }

    Ok(settings)
}

/// Compile a pattern so that it only matches at the start of the input.
pub fn compile_match_regex(pattern: &str) -> Result<Regex, ConsumerError> {
    Regex::new(&format!("^(?:{})", pattern))
        .map_err(|e| ConsumerError::Config(format!("Invalid regex {:?}: {}", pattern, e)))
}

/// Compile a pattern that may match anywhere in the input.
pub fn compile_search_regex(pattern: &str) -> Result<Regex, ConsumerError> {
    Regex::new(pattern)
        .map_err(|e| ConsumerError::Config(format!("Invalid regex {:?}: {}", pattern, e)))
}
