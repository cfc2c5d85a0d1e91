//! COUNTER R4 reports.
//!
//! A report reads the monthly aggregates for a period and renders one row per
//! title with activity plus a totals row, as CSV or TSV.

mod book;
mod format;
mod journal1;
mod journal5;
mod period;
mod report;

pub use format::{format_isbn, format_issn};
pub use period::{ReportPeriod, MAX_REPORT_MONTHS};
pub use report::{CounterReport, ReportHeader, ReportRow, HEADER_LINE_COUNT};

use std::fmt;
use std::str::FromStr;

use crate::error::CounterError;

/// The four report families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    /// Book Report 1: full-book requests by month.
    BookTitleRequests,
    /// Book Report 2: section requests by month.
    BookSectionRequests,
    /// Journal Report 1: full-text article requests by month.
    JournalRequests,
    /// Journal Report 5: full-text article requests by year of publication.
    JournalPublicationYears,
}

/// A report type and whether publisher-involved requests are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportKind {
    pub report_type: ReportType,
    /// Count requests served with publisher involvement too (`L` variants).
    pub include_publisher_involved: bool,
}

impl ReportKind {
    pub const BOOK_1: ReportKind = ReportKind::plain(ReportType::BookTitleRequests);
    pub const BOOK_2: ReportKind = ReportKind::plain(ReportType::BookSectionRequests);
    pub const JOURNAL_1: ReportKind = ReportKind::plain(ReportType::JournalRequests);
    pub const JOURNAL_5: ReportKind = ReportKind::plain(ReportType::JournalPublicationYears);

    const fn plain(report_type: ReportType) -> Self {
        Self {
            report_type,
            include_publisher_involved: false,
        }
    }

    /// The same report counting all requests.
    pub const fn with_publisher_involved(self) -> Self {
        Self {
            report_type: self.report_type,
            include_publisher_involved: true,
        }
    }

    /// Resolve a report from its title type (`book`/`journal`) and id
    /// (`1`, `1L`, `2`, `2L`, `5`, `5L`).
    pub fn from_ids(title_type: &str, id: &str) -> Result<Self, CounterError> {
        let id = id.trim();
        let (number, all) = match id.strip_suffix(['L', 'l']) {
            Some(number) => (number, true),
            None => (id, false),
        };

        let kind = match (title_type.trim().to_ascii_lowercase().as_str(), number) {
            ("book", "1") => Self::BOOK_1,
            ("book", "2") => Self::BOOK_2,
            ("journal", "1") => Self::JOURNAL_1,
            ("journal", "5") => Self::JOURNAL_5,
            (title_type, _) => {
                return Err(CounterError::invalid(format!(
                    "Unknown report '{}' for title type '{}'",
                    id, title_type
                )))
            }
        };

        Ok(if all { kind.with_publisher_involved() } else { kind })
    }

    pub fn is_book(&self) -> bool {
        matches!(
            self.report_type,
            ReportType::BookTitleRequests | ReportType::BookSectionRequests
        )
    }

    /// Report id as used on the command line.
    pub fn id(&self) -> String {
        let number = match self.report_type {
            ReportType::BookTitleRequests | ReportType::JournalRequests => "1",
            ReportType::BookSectionRequests => "2",
            ReportType::JournalPublicationYears => "5",
        };
        if self.include_publisher_involved {
            format!("{}L", number)
        } else {
            number.to_string()
        }
    }

    pub fn name(&self) -> &'static str {
        match self.report_type {
            ReportType::BookTitleRequests => "Book Report 1 (R4)",
            ReportType::BookSectionRequests => "Book Report 2 (R4)",
            ReportType::JournalRequests => "Journal Report 1 (R4)",
            ReportType::JournalPublicationYears => "Journal Report 5 (R4)",
        }
    }

    pub fn description(&self) -> &'static str {
        match self.report_type {
            ReportType::BookTitleRequests => "Number of Successful Title Requests by Month and Title",
            ReportType::BookSectionRequests => {
                "Number of Successful Section Requests by Month and Title"
            }
            ReportType::JournalRequests => {
                "Number of Successful Full-Text Article Requests by Month and Journal"
            }
            ReportType::JournalPublicationYears => {
                "Number of Successful Full-Text Article Requests by Year-of-Publication (YOP) and Journal"
            }
        }
    }

    /// Report name used in file names.
    pub fn file_prefix(&self) -> String {
        let base = match self.report_type {
            ReportType::BookTitleRequests => "COUNTER_Book_1",
            ReportType::BookSectionRequests => "COUNTER_Book_2",
            ReportType::JournalRequests => "COUNTER_Journal_1",
            ReportType::JournalPublicationYears => "COUNTER_Journal_5",
        };
        if self.include_publisher_involved {
            format!("{}L", base)
        } else {
            base.to_string()
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_book() { "book" } else { "journal" };
        write!(f, "{} {}", kind, self.id())
    }
}

/// Output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Csv,
    Tsv,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Tsv => "txt",
        }
    }

    pub fn separator(&self) -> &'static str {
        match self {
            ReportFormat::Csv => ",",
            ReportFormat::Tsv => "\t",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "tsv" | "txt" => Ok(ReportFormat::Tsv),
            other => Err(CounterError::invalid(format!("Unknown report format '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ids() {
        assert_eq!(ReportKind::from_ids("book", "1").unwrap(), ReportKind::BOOK_1);
        assert_eq!(
            ReportKind::from_ids("Book", "2L").unwrap(),
            ReportKind::BOOK_2.with_publisher_involved()
        );
        assert_eq!(ReportKind::from_ids("journal", "5").unwrap(), ReportKind::JOURNAL_5);
        assert!(ReportKind::from_ids("book", "5").unwrap_err().is_invalid_argument());
        assert!(ReportKind::from_ids("magazine", "1").is_err());
    }

    #[test]
    fn test_prefixes_and_ids() {
        assert_eq!(ReportKind::BOOK_1.file_prefix(), "COUNTER_Book_1");
        assert_eq!(
            ReportKind::BOOK_2.with_publisher_involved().file_prefix(),
            "COUNTER_Book_2L"
        );
        assert_eq!(ReportKind::JOURNAL_5.with_publisher_involved().id(), "5L");
        assert_eq!(ReportKind::JOURNAL_1.to_string(), "journal 1");
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(ReportFormat::Csv.extension(), "csv");
        assert_eq!(ReportFormat::Tsv.extension(), "txt");
        assert_eq!("TSV".parse::<ReportFormat>().unwrap(), ReportFormat::Tsv);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
