use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_aggregation_links")
        .depends_on(&["0001_initial_schema"])
        // banner_impressions - one cell per (minute, banner, campaign, dimensions)
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS banner_impressions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    banner TEXT NOT NULL,
    campaign TEXT NOT NULL,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    language_id INTEGER NOT NULL REFERENCES languages(id),
    country_id INTEGER NOT NULL REFERENCES countries(id),
    event_count REAL NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS banner_impressions (
    id SERIAL PRIMARY KEY,
    timestamp TEXT NOT NULL,
    banner TEXT NOT NULL,
    campaign TEXT NOT NULL,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    language_id INTEGER NOT NULL REFERENCES languages(id),
    country_id INTEGER NOT NULL REFERENCES countries(id),
    event_count DOUBLE PRECISION NOT NULL
)"#,
                ),
        )
        .operation(AddIndex::new(
            "banner_impressions",
            Index::new("idx_banner_impressions_cell")
                .column("timestamp")
                .column("banner")
                .column("campaign")
                .column("project_id")
                .column("language_id")
                .column("country_id")
                .unique(),
        ))
        // banner_impression_files - per-file contribution to each cell
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS banner_impression_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files(id),
    banner_impression_id INTEGER NOT NULL,
    event_count REAL NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS banner_impression_files (
    id SERIAL PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    banner_impression_id INTEGER NOT NULL,
    event_count DOUBLE PRECISION NOT NULL
)"#,
                ),
        )
        .operation(AddIndex::new(
            "banner_impression_files",
            Index::new("idx_bif_file_id").column("file_id"),
        ))
        .operation(AddIndex::new(
            "banner_impression_files",
            Index::new("idx_bif_banner_impression_id").column("banner_impression_id"),
        ))
}
