//! Daemon command.

use std::sync::Arc;

use console::style;
use tokio::sync::watch;
use tracing::info;

use crate::aggregator::AggregationScheduler;
use crate::clock::{SharedClock, SystemClock};
use crate::config::Settings;

use super::start_manager_with;

/// Aggregate on the configured schedule until Ctrl-C.
pub async fn cmd_daemon(settings: &Settings) -> anyhow::Result<()> {
    if !settings.enabled {
        println!(
            "{} COUNTER reports are disabled; set enabled = true or COUNTER_ENABLED=1",
            style("!").yellow()
        );
        return Ok(());
    }

    let manager = start_manager_with(settings.clone()).await?;
    let aggregator = manager
        .aggregator()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("COUNTER reports are not ready"))?;

    let clock: SharedClock = Arc::new(SystemClock);
    let scheduler = AggregationScheduler::new(aggregator, clock, settings.aggregation_frequency);
    println!(
        "{} Aggregating {} (next run {})",
        style("→").cyan(),
        settings.aggregation_frequency,
        scheduler.next_run_time().format("%Y-%m-%d %H:%M:%S UTC")
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, stopping the aggregation scheduler");
    let _ = shutdown_tx.send(true);
    handle.await?;

    println!("{} Stopped", style("✓").green());
    Ok(())
}
