//! Record command.

use console::style;

use crate::config::Settings;
use crate::models::{BookRequest, JournalRequest, RequestData, TitleBuilder};

use super::start_manager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TitleKindArg {
    Book,
    Journal,
}

/// Parsed arguments of `counter record`.
pub struct RecordArgs {
    pub kind: TitleKindArg,
    pub name: String,
    pub publisher: Option<String>,
    pub platform: Option<String>,
    pub doi: Option<String>,
    pub proprietary_id: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub print_issn: Option<String>,
    pub online_issn: Option<String>,
    pub section: bool,
    pub html: bool,
    pub pdf: bool,
    pub publisher_involved: bool,
    pub publication_year: Option<String>,
}

impl RecordArgs {
    fn request_data(&self) -> RequestData {
        match self.kind {
            TitleKindArg::Book => BookRequest {
                is_section: self.section,
                is_publisher_involved: self.publisher_involved,
            }
            .into(),
            TitleKindArg::Journal => JournalRequest {
                is_html: self.html,
                is_pdf: self.pdf,
                is_publisher_involved: self.publisher_involved,
                publication_year: self.publication_year.clone(),
            }
            .into(),
        }
    }
}

/// Register the title and record one request against it.
pub async fn cmd_record(settings: &Settings, args: RecordArgs) -> anyhow::Result<()> {
    let data = args.request_data();
    let builder = match args.kind {
        TitleKindArg::Book => TitleBuilder::book(args.name)
            .identifiers(args.isbn, args.issn),
        TitleKindArg::Journal => TitleBuilder::journal(args.name)
            .identifiers(args.print_issn, args.online_issn),
    };
    let title = builder
        .optional(args.publisher, args.platform, args.doi, args.proprietary_id)
        .build()?;

    let manager = start_manager(settings).await?;
    let recorder = manager
        .recorder()
        .ok_or_else(|| anyhow::anyhow!("COUNTER reports are not ready"))?;
    recorder.record_title_request(&title, Some(data)).await?;

    println!(
        "{} Recorded {} request for '{}' ({})",
        style("✓").green(),
        title.kind.as_str(),
        title.name,
        title.lockss_id()
    );
    Ok(())
}
