//! Status command.

use console::style;

use fruec::config::Settings;
use fruec::ledger_status;
use fruec::models::EventKind;

use crate::cli::helpers::format_time;
use super::db::prepare_database;

pub async fn cmd_status(settings: &Settings, kind: EventKind, json: bool) -> anyhow::Result<()> {
    let pool = prepare_database(settings).await?;
    let status = ledger_status(&pool, kind).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", style(format!("Status: {}", kind)).bold());
    println!("{}", "-".repeat(40));
    println!(
        "  Latest consumed file: {}",
        format_time(status.latest_consumed)
    );

    if status.processing.is_empty() {
        println!("  Incomplete files:     {}", style("none").green());
    } else {
        println!(
            "  Incomplete files:     {}",
            style(status.processing.len()).yellow()
        );
        for file in &status.processing {
            println!("    {}/{}", file.directory, file.filename);
        }
        println!(
            "\n{} Run 'fruec purge {}' before consuming more files.",
            style("!").yellow(),
            kind
        );
    }
    Ok(())
}
