//! Report command.

use console::style;

use crate::config::Settings;
use crate::reports::{ReportFormat, ReportKind, ReportPeriod};

use super::start_manager;

/// Compile and save one report, printing where it went.
///
/// `period` is `(start month, start year, end month, end year)`; `None` selects
/// the trailing period ending with the previous month.
pub async fn cmd_report(
    settings: &Settings,
    title_type: &str,
    id: &str,
    format: &str,
    period: Option<(u32, i32, u32, i32)>,
) -> anyhow::Result<()> {
    let kind = ReportKind::from_ids(title_type, id)?;
    let format: ReportFormat = format.parse()?;
    let period = period
        .map(|(sm, sy, em, ey)| ReportPeriod::new(sm, sy, em, ey))
        .transpose()?;

    let manager = start_manager(settings).await?;
    let mut report = manager.report(kind, period);
    let path = manager.save_report(&mut report, format).await?;

    println!(
        "{} Saved {} for {}",
        style("✓").green(),
        kind.name(),
        report.period().display()
    );
    println!("  {}", path.display());
    Ok(())
}
