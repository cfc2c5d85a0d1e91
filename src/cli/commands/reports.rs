//! Saved reports command.

use console::style;

use crate::config::Settings;

use super::start_manager;

/// List saved report files, or delete one by name.
pub async fn cmd_reports(settings: &Settings, delete: Option<&str>) -> anyhow::Result<()> {
    let manager = start_manager(settings).await?;

    if let Some(name) = delete {
        if manager.delete_report_output_file(name) {
            println!("{} Deleted {}", style("✓").green(), name);
        } else {
            println!("{} No report file named {}", style("!").yellow(), name);
        }
        return Ok(());
    }

    let files = manager.list_report_files()?;
    if files.is_empty() {
        println!("{} No saved reports", style("!").yellow());
        return Ok(());
    }

    println!("{}", style("Saved reports").bold());
    for name in files {
        println!("  {}", name);
    }
    Ok(())
}
