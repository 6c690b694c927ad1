//! Consume command.

use std::time::Duration;

use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use fruec::config::Settings;
use fruec::models::EventKind;
use fruec::{consume_events, ConsumeOptions};

use super::db::prepare_database;

pub async fn cmd_consume(
    settings: &Settings,
    kind: EventKind,
    from_latest: bool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let pool = prepare_database(settings).await?;
    let source = settings.log_source(kind);

    println!(
        "{} Consuming {} events from {}",
        style("→").cyan(),
        kind,
        source.directory.display()
    );

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));

    let options = ConsumeOptions {
        kind,
        from_latest,
        from_time: from,
        to_time: to,
    };
    let result = consume_events(&pool, settings, &options, &progress).await;
    progress.finish_and_clear();
    let stats = result?;

    println!("{} Done", style("✓").green());
    println!("  Files consumed: {}", stats.consumed_files);
    println!(
        "  Files selected by options, but skipped due to previous processing: {}",
        stats.skipped_files
    );
    println!("  Events consumed: {}", stats.consumed_events);
    println!("  Events ignored: {}", stats.ignored_events);
    println!("  Invalid events: {}", stats.invalid_events);
    Ok(())
}
