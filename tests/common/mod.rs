//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use indicatif::ProgressBar;
use rusqlite::Connection;
use tempfile::TempDir;

use fruec::config::Settings;
use fruec::models::EventKind;
use fruec::repository::{run_migrations, SqlitePool};
use fruec::{consume_events, ConsumeOptions, ConsumerError, RunStats};

/// A temporary database plus log directories for both event kinds.
pub struct TestEnv {
    pub dir: TempDir,
    pub settings: Settings,
    pub pool: SqlitePool,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fruec.db");

        let mut settings = Settings::default();
        settings.database_url = format!("sqlite:{}", db_path.display());
        settings.detail_projects_regex = "enwiki$".to_string();
        settings.detail_languages = vec!["en".to_string()];
        settings.centralnotice.directory = dir.path().join("cn");
        settings.centralnotice.file_glob = "events-*.log*".to_string();
        settings.landingpage.directory = dir.path().join("lp");
        settings.landingpage.file_glob = "landingpage-*.log*".to_string();
        std::fs::create_dir_all(&settings.centralnotice.directory).unwrap();
        std::fs::create_dir_all(&settings.landingpage.directory).unwrap();

        run_migrations(&settings.database_url).await.unwrap();
        let pool = SqlitePool::new(&settings.database_url);

        Self {
            dir,
            settings,
            pool,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("fruec.db")
    }

    /// Write a log file for `kind` and return its path.
    pub fn write_log(&self, kind: EventKind, filename: &str, lines: &[String]) -> PathBuf {
        let path = self.settings.log_source(kind).directory.join(filename);
        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub async fn consume(&self, options: ConsumeOptions) -> Result<RunStats, ConsumerError> {
        consume_events(&self.pool, &self.settings, &options, &ProgressBar::hidden()).await
    }

    pub async fn consume_kind(&self, kind: EventKind) -> Result<RunStats, ConsumerError> {
        self.consume(ConsumeOptions::new(kind)).await
    }

    pub fn sqlite(&self) -> Connection {
        Connection::open(self.db_path()).unwrap()
    }

    pub fn count(&self, table: &str) -> i64 {
        self.sqlite()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    /// Aggregated cells as (minute, banner, campaign, project, language, country, count).
    pub fn cells(&self) -> Vec<Cell> {
        let conn = self.sqlite();
        let mut stmt = conn
            .prepare(
                "SELECT b.timestamp, b.banner, b.campaign, p.code, l.code, c.code, b.event_count
                 FROM banner_impressions b
                 JOIN projects p ON p.id = b.project_id
                 JOIN languages l ON l.id = b.language_id
                 JOIN countries c ON c.id = b.country_id
                 ORDER BY b.timestamp, b.banner, b.campaign, p.code, l.code, c.code",
            )
            .unwrap();
        stmt.query_map([], |row| {
            Ok(Cell {
                minute: row.get(0)?,
                banner: row.get(1)?,
                campaign: row.get(2)?,
                project: row.get(3)?,
                language: row.get(4)?,
                country: row.get(5)?,
                count: row.get(6)?,
            })
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
    }

    /// Status of a ledger row, if present.
    pub fn file_status(&self, filename: &str) -> Option<String> {
        self.sqlite()
            .query_row(
                "SELECT status FROM files WHERE filename = ?1",
                [filename],
                |row| row.get(0),
            )
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub minute: String,
    pub banner: String,
    pub campaign: String,
    pub project: String,
    pub language: String,
    pub country: String,
    pub count: f64,
}

/// A CentralNotice impression line.
pub fn cn_line(dt: &str, banner: &str, campaign: &str, db: &str, lang: &str, country: &str) -> String {
    format!(
        r#"{{"uuid":"u","dt":"{}","userAgent":{{"is_bot":false}},"event":{{"statusCode":"6","banner":"{}","campaign":"{}","db":"{}","uselang":"{}","country":"{}"}}}}"#,
        dt, banner, campaign, db, lang, country
    )
}

/// The standard impression used by most tests.
pub fn cn_default(dt: &str) -> String {
    cn_line(dt, "BannerA", "Camp1", "enwiki", "en", "US")
}

pub fn cn_bot(dt: &str) -> String {
    format!(
        r#"{{"uuid":"u","dt":"{}","userAgent":{{"is_bot":true}},"event":{{"statusCode":"6","banner":"BannerA","campaign":"Camp1","db":"enwiki","uselang":"en"}}}}"#,
        dt
    )
}

/// A donatewiki LandingPage impression line.
pub fn lp_line(dt: &str, utm_source: &str, contact_id: &str, link_id: &str) -> String {
    format!(
        r#"{{"uuid":"u","dt":"{}","wiki":"donatewiki","userAgent":{{"is_bot":false}},"event":{{"utm_source":"{}","utm_campaign":"C1","utm_medium":"sitenotice","contact_id":"{}","link_id":"{}","landingpage":"Ways_to_Give","language":"en","country":"US"}}}}"#,
        dt, utm_source, contact_id, link_id
    )
}
