//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod aggregate;
mod daemon;
mod init;
mod record;
mod report;
mod reports;
mod titles;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::clock::{SharedClock, SystemClock};
use crate::config::{load_settings_with_options, LoadOptions, Settings};
use crate::manager::CounterReportsManager;
use crate::repository::DbPool;

use record::TitleKindArg;

#[derive(Parser)]
#[command(name = "counter")]
#[command(about = "COUNTER usage reports for preserved books and journals")]
#[command(version)]
pub struct Cli {
    /// Config file (default: auto-discovered counter-reports.{toml,yaml,json})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative config paths against the current directory
    #[arg(long, global = true)]
    cwd: bool,

    /// Data directory or database file
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check the raw arguments for the verbose flag before the parser runs.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the report directories and database
    Init,

    /// Record a single request against a title
    Record {
        /// Title type
        #[arg(long, value_enum)]
        kind: TitleKindArg,
        /// Title name
        #[arg(long)]
        name: String,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        doi: Option<String>,
        #[arg(long)]
        proprietary_id: Option<String>,
        /// Book ISBN
        #[arg(long)]
        isbn: Option<String>,
        /// Book ISSN
        #[arg(long)]
        issn: Option<String>,
        /// Journal print ISSN
        #[arg(long)]
        print_issn: Option<String>,
        /// Journal online ISSN
        #[arg(long)]
        online_issn: Option<String>,
        /// Book section rather than the whole book
        #[arg(long)]
        section: bool,
        /// Journal article served as HTML
        #[arg(long)]
        html: bool,
        /// Journal article served as PDF
        #[arg(long)]
        pdf: bool,
        /// The publisher was involved in serving the request
        #[arg(long)]
        publisher_involved: bool,
        /// Publication year of the requested article
        #[arg(long)]
        publication_year: Option<String>,
    },

    /// Aggregate recorded requests now
    Aggregate,

    /// Generate and save a report
    Report {
        /// Title type (book or journal)
        #[arg(long = "type")]
        title_type: String,
        /// Report identifier (1, 1L, 2, 2L, 5, 5L)
        #[arg(long)]
        id: String,
        /// Output format (csv or tsv)
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Custom period start month (all four period flags go together)
        #[arg(long, requires_all = ["start_year", "end_month", "end_year"])]
        start_month: Option<u32>,
        #[arg(long, requires_all = ["start_month", "end_month", "end_year"])]
        start_year: Option<i32>,
        #[arg(long, requires_all = ["start_month", "start_year", "end_year"])]
        end_month: Option<u32>,
        #[arg(long, requires_all = ["start_month", "start_year", "end_month"])]
        end_year: Option<i32>,
    },

    /// List saved report files
    Reports {
        /// Delete a saved report file by name
        #[arg(long)]
        delete: Option<String>,
    },

    /// List registered titles
    Titles,

    /// Run the aggregation scheduler until interrupted
    Daemon,
}

/// Start a manager for a one-off command.
///
/// Commands run on request, so reporting is enabled regardless of the
/// `enabled` setting.
async fn start_manager(settings: &Settings) -> anyhow::Result<CounterReportsManager> {
    let mut settings = settings.clone();
    settings.enabled = true;
    start_manager_with(settings).await
}

async fn start_manager_with(settings: Settings) -> anyhow::Result<CounterReportsManager> {
    let pool = DbPool::from_url(&settings.database_url())?;
    let clock: SharedClock = Arc::new(SystemClock);
    let manager = CounterReportsManager::start(settings, pool, clock).await?;
    Ok(manager)
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Record {
            kind,
            name,
            publisher,
            platform,
            doi,
            proprietary_id,
            isbn,
            issn,
            print_issn,
            online_issn,
            section,
            html,
            pdf,
            publisher_involved,
            publication_year,
        } => {
            let args = record::RecordArgs {
                kind,
                name,
                publisher,
                platform,
                doi,
                proprietary_id,
                isbn,
                issn,
                print_issn,
                online_issn,
                section,
                html,
                pdf,
                publisher_involved,
                publication_year,
            };
            record::cmd_record(&settings, args).await
        }
        Commands::Aggregate => aggregate::cmd_aggregate(&settings).await,
        Commands::Report {
            title_type,
            id,
            format,
            start_month,
            start_year,
            end_month,
            end_year,
        } => {
            let period = match (start_month, start_year, end_month, end_year) {
                (Some(sm), Some(sy), Some(em), Some(ey)) => Some((sm, sy, em, ey)),
                _ => None,
            };
            report::cmd_report(&settings, &title_type, &id, &format, period).await
        }
        Commands::Reports { delete } => reports::cmd_reports(&settings, delete.as_deref()).await,
        Commands::Titles => titles::cmd_titles(&settings).await,
        Commands::Daemon => daemon::cmd_daemon(&settings).await,
    }
}
