//! Titles command.

use console::style;

use crate::config::Settings;
use crate::repository::{DbPool, TitleRepository};

use super::start_manager;

/// List the registered titles. The aggregation sinks are not shown.
pub async fn cmd_titles(settings: &Settings) -> anyhow::Result<()> {
    // Ensures the schema and sink titles exist before reading
    start_manager(settings).await?;

    let titles = TitleRepository::new(DbPool::from_url(&settings.database_url())?)
        .list()
        .await?;

    println!("{}", style("Registered titles").bold());
    println!("{:<20} {:<8} {:<40} {}", "LOCKSS ID", "TYPE", "NAME", "PUBLISHER");
    println!("{}", "-".repeat(90));
    for title in &titles {
        println!(
            "{:<20} {:<8} {:<40} {}",
            title.lockss_id(),
            title.kind.as_str(),
            truncate(&title.name, 40),
            title.publisher_name.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("{} title(s)", titles.len());
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
