//! Aggregate command.

use console::style;

use crate::config::Settings;

use super::start_manager;

/// Run one aggregation pass over the recorded requests.
pub async fn cmd_aggregate(settings: &Settings) -> anyhow::Result<()> {
    let manager = start_manager(settings).await?;
    let aggregator = manager
        .aggregator()
        .ok_or_else(|| anyhow::anyhow!("COUNTER reports are not ready"))?;

    let summary = aggregator.aggregate().await?;

    if summary.failed_months > 0 {
        println!(
            "{} Failed to aggregate {} month(s), see the log for details",
            style("✗").red(),
            summary.failed_months
        );
    }
    println!(
        "{} Aggregated {} request(s) for {} title(s) across {} month(s)",
        style("✓").green(),
        summary.requests,
        summary.titles,
        summary.months
    );
    Ok(())
}
