use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        // files - the ingestion ledger
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    impression_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    directory TEXT NOT NULL,
    sample_rate INTEGER,
    status TEXT NOT NULL,
    consumed_events INTEGER,
    ignored_events INTEGER,
    invalid_events INTEGER
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS files (
    id SERIAL PRIMARY KEY,
    filename TEXT NOT NULL,
    impression_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    directory TEXT NOT NULL,
    sample_rate INTEGER,
    status TEXT NOT NULL,
    consumed_events INTEGER,
    ignored_events INTEGER,
    invalid_events INTEGER
)"#,
                ),
        )
        .operation(AddIndex::new(
            "files",
            Index::new("idx_files_filename").column("filename").unique(),
        ))
        .operation(AddIndex::new(
            "files",
            Index::new("idx_files_type_status")
                .column("impression_type")
                .column("status"),
        ))
        // dimension tables
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE TABLE IF NOT EXISTS projects (id INTEGER PRIMARY KEY AUTOINCREMENT, code TEXT NOT NULL)",
                )
                .for_backend(
                    "postgres",
                    "CREATE TABLE IF NOT EXISTS projects (id SERIAL PRIMARY KEY, code TEXT NOT NULL)",
                ),
        )
        .operation(AddIndex::new(
            "projects",
            Index::new("idx_projects_code").column("code").unique(),
        ))
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE TABLE IF NOT EXISTS languages (id INTEGER PRIMARY KEY AUTOINCREMENT, code TEXT NOT NULL)",
                )
                .for_backend(
                    "postgres",
                    "CREATE TABLE IF NOT EXISTS languages (id SERIAL PRIMARY KEY, code TEXT NOT NULL)",
                ),
        )
        .operation(AddIndex::new(
            "languages",
            Index::new("idx_languages_code").column("code").unique(),
        ))
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE TABLE IF NOT EXISTS countries (id INTEGER PRIMARY KEY AUTOINCREMENT, code TEXT NOT NULL)",
                )
                .for_backend(
                    "postgres",
                    "CREATE TABLE IF NOT EXISTS countries (id SERIAL PRIMARY KEY, code TEXT NOT NULL)",
                ),
        )
        .operation(AddIndex::new(
            "countries",
            Index::new("idx_countries_code").column("code").unique(),
        ))
        // landing page raw pipeline
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS landing_page_impressions_raw (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    utm_source TEXT NOT NULL,
    utm_campaign TEXT NOT NULL,
    utm_medium TEXT NOT NULL,
    utm_key TEXT NOT NULL,
    landingpage TEXT NOT NULL,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    language_id INTEGER NOT NULL REFERENCES languages(id),
    country_id INTEGER NOT NULL REFERENCES countries(id),
    file_id INTEGER NOT NULL REFERENCES files(id)
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS landing_page_impressions_raw (
    id SERIAL PRIMARY KEY,
    timestamp TEXT NOT NULL,
    utm_source TEXT NOT NULL,
    utm_campaign TEXT NOT NULL,
    utm_medium TEXT NOT NULL,
    utm_key TEXT NOT NULL,
    landingpage TEXT NOT NULL,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    language_id INTEGER NOT NULL REFERENCES languages(id),
    country_id INTEGER NOT NULL REFERENCES countries(id),
    file_id INTEGER NOT NULL REFERENCES files(id)
)"#,
                ),
        )
        .operation(AddIndex::new(
            "landing_page_impressions_raw",
            Index::new("idx_lp_raw_file_id").column("file_id"),
        ))
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS donatewiki_unique (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    utm_source TEXT NOT NULL,
    utm_campaign TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    link_id TEXT NOT NULL,
    file_id INTEGER NOT NULL REFERENCES files(id)
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS donatewiki_unique (
    id SERIAL PRIMARY KEY,
    timestamp TEXT NOT NULL,
    utm_source TEXT NOT NULL,
    utm_campaign TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    link_id TEXT NOT NULL,
    file_id INTEGER NOT NULL REFERENCES files(id)
)"#,
                ),
        )
        .operation(AddIndex::new(
            "donatewiki_unique",
            Index::new("idx_donatewiki_unique_source_contact")
                .column("utm_source")
                .column("contact_id")
                .unique(),
        ))
        .operation(AddIndex::new(
            "donatewiki_unique",
            Index::new("idx_donatewiki_unique_file_id").column("file_id"),
        ))
}

