//! Initialize command.

use console::style;

use crate::config::Settings;

use super::start_manager;

/// Initialize the data directory, report directories and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    // Starting the manager migrates the database and registers the sink titles
    let manager = start_manager(settings).await?;

    if !settings.enabled {
        println!(
            "{} Reporting is disabled in the configuration",
            style("!").yellow()
        );
        println!("  Set enabled = true (or COUNTER_ENABLED=1) to run the daemon");
    }

    println!(
        "{} Initialized COUNTER reports in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    if let Some(output_dir) = manager.output_dir() {
        println!("  Reports are saved to {}", output_dir.display());
    }

    Ok(())
}
