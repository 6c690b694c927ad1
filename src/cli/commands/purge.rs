//! Purge command.

use console::style;

use fruec::config::Settings;
use fruec::models::EventKind;
use fruec::{incomplete_files, purge_incomplete};

use super::db::prepare_database;

pub async fn cmd_purge(settings: &Settings, kind: EventKind, confirm: bool) -> anyhow::Result<()> {
    let pool = prepare_database(settings).await?;
    let files = incomplete_files(&pool, kind).await?;

    if files.is_empty() {
        println!(
            "{} No incomplete {} files found",
            style("✓").green(),
            kind
        );
        return Ok(());
    }

    println!(
        "{} {} incomplete {} file(s):",
        style("!").yellow(),
        files.len(),
        kind
    );
    for file in &files {
        println!("  {}/{}", file.directory, file.filename);
    }

    if !confirm {
        println!(
            "\nBack up the database, then run with {} to delete data from these files.",
            style("--confirm").bold()
        );
        return Ok(());
    }

    let stats = purge_incomplete(&pool, kind).await?;

    println!("{} Purged", style("✓").green());
    match kind {
        EventKind::CentralNotice => {
            println!("  banner_impressions rows updated: {}", stats.cells_updated);
            println!("  banner_impressions rows deleted: {}", stats.cells_deleted);
            println!(
                "  banner_impression_files rows deleted: {}",
                stats.links_deleted
            );
        }
        EventKind::LandingPage => {
            println!(
                "  landing_page_impressions_raw rows deleted: {}",
                stats.raw_rows_deleted
            );
            println!(
                "  donatewiki_unique rows deleted: {}",
                stats.unique_rows_deleted
            );
        }
    }
    println!("  files rows deleted: {}", stats.files_deleted);
    Ok(())
}
