//! Database management commands.

use console::style;

use fruec::config::Settings;
use fruec::repository::{run_migrations, SqlitePool};

/// Create the database if needed and apply pending migrations.
pub(super) async fn prepare_database(settings: &Settings) -> anyhow::Result<SqlitePool> {
    settings.ensure_database_dir()?;
    run_migrations(&settings.database_url).await?;
    Ok(SqlitePool::new(&settings.database_url))
}

/// Run database migrations.
pub async fn cmd_migrate(settings: &Settings) -> anyhow::Result<()> {
    println!("{} Database migration", style("→").cyan());
    println!("  Database: {}", settings.database_url);

    settings.ensure_database_dir()?;
    let applied = run_migrations(&settings.database_url).await?;

    if applied.is_empty() {
        println!("{} Schema is up to date", style("✓").green());
    } else {
        for name in &applied {
            println!("  Applied {}", name);
        }
        println!(
            "{} Applied {} migration(s)",
            style("✓").green(),
            applied.len()
        );
    }
    Ok(())
}
