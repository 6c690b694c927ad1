//! The migrated schema carries the tables and unique indexes the ingestion
//! protocol depends on.

mod common;

use std::collections::BTreeSet;

use common::TestEnv;

fn index_names(conn: &rusqlite::Connection, table: &str, unique_only: bool) -> BTreeSet<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA index_list({})", table))
        .unwrap();
    stmt.query_map([], |row| {
        let name: String = row.get(1)?;
        let unique: i64 = row.get(2)?;
        Ok((name, unique))
    })
    .unwrap()
    .filter_map(Result::ok)
    .filter(|(_, unique)| !unique_only || *unique == 1)
    .map(|(name, _)| name)
    .filter(|name| name.starts_with("idx_"))
    .collect()
}

#[tokio::test]
async fn test_all_tables_exist() {
    let env = TestEnv::new().await;
    let conn = env.sqlite();
    let tables: BTreeSet<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    for table in [
        "files",
        "projects",
        "languages",
        "countries",
        "banner_impressions",
        "banner_impression_files",
        "landing_page_impressions_raw",
        "donatewiki_unique",
        "__cetane_migrations",
    ] {
        assert!(tables.contains(table), "missing table {}", table);
    }
}

#[tokio::test]
async fn test_unique_indexes() {
    let env = TestEnv::new().await;
    let conn = env.sqlite();

    assert!(index_names(&conn, "files", true).contains("idx_files_filename"));
    assert!(index_names(&conn, "projects", true).contains("idx_projects_code"));
    assert!(index_names(&conn, "languages", true).contains("idx_languages_code"));
    assert!(index_names(&conn, "countries", true).contains("idx_countries_code"));
    assert!(index_names(&conn, "banner_impressions", true).contains("idx_banner_impressions_cell"));
    assert!(index_names(&conn, "donatewiki_unique", true)
        .contains("idx_donatewiki_unique_source_contact"));

    let links = index_names(&conn, "banner_impression_files", false);
    assert!(links.contains("idx_bif_file_id"));
    assert!(index_names(&conn, "banner_impression_files", true).is_empty());
}

#[tokio::test]
async fn test_duplicate_filename_is_rejected() {
    let env = TestEnv::new().await;
    let conn = env.sqlite();
    let insert = "INSERT INTO files (filename, impression_type, timestamp, directory, status)
                  VALUES ('a.log', 'banner', '2023-01-01T00:00:00Z', '/logs', 'processing')";
    conn.execute(insert, []).unwrap();
    assert!(conn.execute(insert, []).is_err());
}
