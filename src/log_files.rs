//! Log file discovery and reading.
//!
//! Everything that touches the filesystem or interprets filenames lives here.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::read::MultiGzDecoder;
use glob::{glob_with, MatchOptions, Pattern};
use regex::Regex;

use crate::error::{ConsumerError, DiscoveryError};
use crate::models::SampleRate;

/// A log file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileInfo {
    pub filename: String,
    pub directory: String,
    pub time: DateTime<Utc>,
}

impl LogFileInfo {
    pub fn path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.filename)
    }
}

/// How to find log files and read their timestamps.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions<'a> {
    pub directory: &'a Path,
    pub file_glob: &'a str,
    pub extract_timestamp: &'a Regex,
    pub timestamp_format: &'a str,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
}

/// Find log files under `directory` and its subdirectories.
///
/// Files are returned in chronological order, filtered to the inclusive
/// `from_time..=to_time` window. A matching file without a parsable timestamp
/// is an error, as is the same filename in two directories.
pub fn find_log_files(options: &DiscoveryOptions<'_>) -> Result<Vec<LogFileInfo>, DiscoveryError> {
    if !options.directory.is_dir() {
        return Err(DiscoveryError::NotADirectory(options.directory.to_path_buf()));
    }

    if options.file_glob.contains('/') || options.file_glob.contains(std::path::MAIN_SEPARATOR) {
        return Err(DiscoveryError::GlobHasDirectory(options.file_glob.to_string()));
    }

    let root = Pattern::escape(&options.directory.to_string_lossy());
    let pattern = format!("{}/**/{}", root.trim_end_matches('/'), options.file_glob);
    let match_options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let entries = glob_with(&pattern, match_options).map_err(|e| DiscoveryError::InvalidGlob {
        glob: options.file_glob.to_string(),
        message: e.to_string(),
    })?;

    let mut seen: HashMap<String, String> = HashMap::new();
    let mut infos = Vec::new();

    for entry in entries {
        let path = entry.map_err(|e| DiscoveryError::Walk(e.to_string()))?;
        if !path.is_file() {
            continue;
        }

        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let directory = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let time = filename_time(
            &filename,
            &directory,
            options.extract_timestamp,
            options.timestamp_format,
        )?;

        if seen.insert(filename.clone(), directory.clone()).is_some() {
            return Err(DiscoveryError::DuplicateFilename {
                filename,
                directory,
            });
        }

        if options.from_time.is_some_and(|from| time < from) {
            continue;
        }
        if options.to_time.is_some_and(|to| time > to) {
            continue;
        }

        infos.push(LogFileInfo {
            filename,
            directory,
            time,
        });
    }

    infos.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.filename.cmp(&b.filename)));
    Ok(infos)
}

/// Extract and parse the timestamp embedded in a filename.
pub fn filename_time(
    filename: &str,
    directory: &str,
    extract_timestamp: &Regex,
    timestamp_format: &str,
) -> Result<DateTime<Utc>, DiscoveryError> {
    let value = extract_timestamp
        .find(filename)
        .ok_or_else(|| DiscoveryError::TimestampNotFound {
            filename: filename.to_string(),
            directory: directory.to_string(),
        })?
        .as_str();

    NaiveDateTime::parse_from_str(value, timestamp_format)
        .map(|dt| dt.and_utc())
        .map_err(|source| DiscoveryError::InvalidTimestamp {
            filename: filename.to_string(),
            value: value.to_string(),
            source,
        })
}

/// Extract the sample rate from a filename.
///
/// Uses the first capture group of `extract_sample_rate` when it has one,
/// otherwise the whole match.
pub fn sample_rate(filename: &str, extract_sample_rate: &Regex) -> Result<SampleRate, ConsumerError> {
    let captures = extract_sample_rate
        .captures(filename)
        .ok_or_else(|| ConsumerError::SampleRateNotFound(filename.to_string()))?;

    let value = captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str())
        .unwrap_or_default();

    value
        .parse::<u32>()
        .ok()
        .and_then(SampleRate::new)
        .ok_or_else(|| ConsumerError::InvalidSampleRate {
            filename: filename.to_string(),
            rate: value.to_string(),
        })
}

/// Lines of a log file, numbered from 1.
pub struct LogLines {
    reader: Box<dyn BufRead + Send>,
    path: PathBuf,
    line_no: usize,
    buf: Vec<u8>,
}

impl LogLines {
    /// Open a log file, decompressing it if the name ends in `.gz`.
    pub fn open(path: &Path) -> Result<Self, ConsumerError> {
        let file = File::open(path).map_err(|source| ConsumerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let reader: Box<dyn BufRead + Send> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            reader,
            path: path.to_path_buf(),
            line_no: 0,
            buf: Vec::new(),
        })
    }
}

impl Iterator for LogLines {
    type Item = Result<(usize, String), ConsumerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                let line = String::from_utf8_lossy(&self.buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                Some(Ok((self.line_no, line)))
            }
            Err(source) => Some(Err(ConsumerError::Io {
                path: self.path.clone(),
                source,
            })),
        }
    }
}
