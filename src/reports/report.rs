//! Report compilation and rendering.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::format::{format_isbn, format_issn, text_cell};
use super::{book, journal1, journal5, ReportFormat, ReportKind, ReportPeriod, ReportType};
use crate::clock::Clock;
use crate::error::CounterError;
use crate::models::{CounterTitle, TitleKind};
use crate::repository::{AggregateFilter, AggregateRepository};

/// Lines before the first data row: 7 preamble lines and the column header.
pub const HEADER_LINE_COUNT: usize = 8;

/// Identity strings printed in the report preamble.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportHeader {
    pub customer_name: String,
    pub institutional_identifier: String,
}

/// One rendered title row: the title and its numeric columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub title: CounterTitle,
    pub counts: Vec<i64>,
}

/// Request counts keyed by LOCKSS ID plus the column totals.
#[derive(Debug, Clone)]
pub(super) struct Tally {
    pub per_title: BTreeMap<i64, Vec<i64>>,
    pub totals: Vec<i64>,
}

impl Tally {
    pub fn new(columns: usize) -> Self {
        Self {
            per_title: BTreeMap::new(),
            totals: vec![0; columns],
        }
    }

    /// Add `count` to `column` of a title and of the totals.
    pub fn add(&mut self, lockss_id: i64, column: usize, count: i64) {
        let columns = self.totals.len();
        let counts = self
            .per_title
            .entry(lockss_id)
            .or_insert_with(|| vec![0; columns]);
        counts[column] += count;
        self.totals[column] += count;
    }
}

#[derive(Debug, Clone)]
struct ReportData {
    rows: Vec<ReportRow>,
    totals: ReportRow,
}

/// A COUNTER report for one period.
#[derive(Debug, Clone)]
pub struct CounterReport {
    kind: ReportKind,
    period: ReportPeriod,
    run_date: NaiveDate,
    current_year: i32,
    header: ReportHeader,
    data: Option<ReportData>,
}

impl CounterReport {
    /// A report over the default trailing period.
    pub fn trailing(kind: ReportKind, clock: &dyn Clock) -> Self {
        Self::new(kind, ReportPeriod::trailing(clock), clock)
    }

    pub fn new(kind: ReportKind, period: ReportPeriod, clock: &dyn Clock) -> Self {
        Self {
            kind,
            period,
            run_date: clock.today(),
            current_year: clock.current_year(),
            header: ReportHeader::default(),
            data: None,
        }
    }

    pub fn with_header(mut self, header: ReportHeader) -> Self {
        self.header = header;
        self
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn period(&self) -> &ReportPeriod {
        &self.period
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn is_compiled(&self) -> bool {
        self.data.is_some()
    }

    /// Title rows, empty until compiled.
    pub fn rows(&self) -> &[ReportRow] {
        self.data.as_ref().map(|d| d.rows.as_slice()).unwrap_or(&[])
    }

    pub fn totals(&self) -> Option<&ReportRow> {
        self.data.as_ref().map(|d| &d.totals)
    }

    /// `<prefix>-<yyyy>_<MM>-<yyyy>_<MM>-<run date>.<ext>`.
    pub fn file_name(&self, format: ReportFormat) -> String {
        format!(
            "{}-{:04}_{:02}-{:04}_{:02}-{}.{}",
            self.kind.file_prefix(),
            self.period.start_year(),
            self.period.start_month(),
            self.period.end_year(),
            self.period.end_month(),
            self.run_date.format("%Y-%m-%d"),
            format.extension()
        )
    }

    /// Labels of the numeric columns.
    pub fn value_columns(&self) -> Vec<String> {
        match self.kind.report_type {
            ReportType::BookTitleRequests | ReportType::BookSectionRequests => {
                book::value_columns(&self.period)
            }
            ReportType::JournalRequests => journal1::value_columns(&self.period),
            ReportType::JournalPublicationYears => {
                journal5::PublicationYearGroups::new(self.current_year).labels()
            }
        }
    }

    /// Every column label, identity columns first.
    pub fn columns(&self) -> Vec<String> {
        let identity: [&str; 7] = if self.kind.is_book() {
            ["Book", "Publisher", "Platform", "Book DOI", "Proprietary Identifier", "ISBN", "ISSN"]
        } else {
            [
                "Journal",
                "Publisher",
                "Platform",
                "Journal DOI",
                "Proprietary Identifier",
                "Print ISSN",
                "Online ISSN",
            ]
        };
        identity
            .iter()
            .map(|label| label.to_string())
            .chain(self.value_columns())
            .collect()
    }

    /// Read the aggregates for the period and build the rows.
    pub async fn compile(&mut self, aggregates: &AggregateRepository) -> Result<(), CounterError> {
        let (first_month, last_month) = self.period.bounds();
        let filter = AggregateFilter {
            first_month,
            last_month,
            include_publisher_involved: self.kind.include_publisher_involved,
        };

        let tally = match self.kind.report_type {
            ReportType::BookTitleRequests => {
                book::tally(aggregates, filter, &self.period, false).await?
            }
            ReportType::BookSectionRequests => {
                book::tally(aggregates, filter, &self.period, true).await?
            }
            ReportType::JournalRequests => journal1::tally(aggregates, filter, &self.period).await?,
            ReportType::JournalPublicationYears => {
                journal5::tally(aggregates, filter, self.current_year).await?
            }
        };

        let ids: Vec<i64> = tally.per_title.keys().copied().collect();
        let titles: BTreeMap<i64, CounterTitle> = aggregates
            .titles(&ids)
            .await?
            .into_iter()
            .map(|title| (title.lockss_id().value(), title))
            .collect();

        let mut rows = Vec::with_capacity(tally.per_title.len());
        for (lockss_id, counts) in tally.per_title {
            let title = titles.get(&lockss_id).cloned().ok_or_else(|| {
                CounterError::InconsistentData(format!("Missing title {}", lockss_id))
            })?;
            rows.push(ReportRow { title, counts });
        }
        rows.sort_by(|a, b| {
            a.title
                .name
                .cmp(&b.title.name)
                .then(a.title.lockss_id().cmp(&b.title.lockss_id()))
        });

        let sink = if self.kind.is_book() {
            CounterTitle::all_books()
        } else {
            CounterTitle::all_journals()
        };

        debug!("Compiled {} with {} title rows", self.kind, rows.len());
        self.data = Some(ReportData {
            rows,
            totals: ReportRow {
                title: sink,
                counts: tally.totals,
            },
        });
        Ok(())
    }

    /// The seven preamble lines.
    pub fn header_lines(&self, format: ReportFormat) -> Vec<String> {
        let sep = format.separator();
        vec![
            format!("{}{}{}", self.kind.name(), sep, self.kind.description()),
            format!("{}{}", self.header.customer_name, sep),
            format!("{}{}", self.header.institutional_identifier, sep),
            "Period covered by Report:".to_string(),
            self.period.display(),
            "Date run:".to_string(),
            self.run_date.format("%Y-%m-%d").to_string(),
        ]
    }

    /// Preamble, column header, title rows and the totals row.
    pub fn text_lines(&self, format: ReportFormat) -> Result<Vec<String>, CounterError> {
        let data = self.data.as_ref().ok_or_else(|| {
            CounterError::InconsistentData(format!("{} has not been compiled", self.kind))
        })?;

        let width = self.value_columns().len();
        let mut lines = self.header_lines(format);
        lines.push(self.columns().join(format.separator()));

        for row in data.rows.iter().chain(std::iter::once(&data.totals)) {
            if row.counts.len() != width {
                return Err(CounterError::InconsistentData(format!(
                    "Row '{}' has {} values, expected {}",
                    row.title.name,
                    row.counts.len(),
                    width
                )));
            }
            lines.push(render_row(row, format));
        }
        Ok(lines)
    }

    /// Write the CSV rendering to the log between `REPORT START` and `REPORT END`.
    ///
    /// Does nothing unless debug logging is enabled.
    pub async fn log_report(&mut self, aggregates: &AggregateRepository) -> Result<(), CounterError> {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return Ok(());
        }
        if !self.is_compiled() {
            self.compile(aggregates).await?;
        }

        debug!("REPORT START");
        for line in self.text_lines(ReportFormat::Csv)? {
            debug!("{}", line);
        }
        debug!("REPORT END");
        Ok(())
    }
}

fn render_row(row: &ReportRow, format: ReportFormat) -> String {
    let title = &row.title;
    let (first_id, second_id) = match &title.kind {
        TitleKind::Book { isbn, issn } => (
            isbn.as_deref().map(format_isbn),
            issn.as_deref().map(format_issn),
        ),
        TitleKind::Journal {
            print_issn,
            online_issn,
        } => (
            print_issn.as_deref().map(format_issn),
            online_issn.as_deref().map(format_issn),
        ),
    };

    let mut cells = vec![
        text_cell(Some(&title.name), format),
        text_cell(title.publisher_name.as_deref(), format),
        text_cell(title.platform_name.as_deref(), format),
        title.doi.clone().unwrap_or_default(),
        title.proprietary_id.clone().unwrap_or_default(),
        first_id.unwrap_or_default(),
        second_id.unwrap_or_default(),
    ];
    cells.extend(row.counts.iter().map(|count| count.to_string()));
    cells.join(format.separator())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::repository::test_support::setup_test_db;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2013, 1, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_file_name() {
        let period = ReportPeriod::new(1, 2012, 12, 2012).unwrap();
        let report = CounterReport::new(ReportKind::BOOK_1, period, &clock());
        assert_eq!(
            report.file_name(ReportFormat::Csv),
            "COUNTER_Book_1-2012_01-2012_12-2013-01-15.csv"
        );
        assert_eq!(
            report.file_name(ReportFormat::Tsv),
            "COUNTER_Book_1-2012_01-2012_12-2013-01-15.txt"
        );
    }

    #[test]
    fn test_uncompiled_report_cannot_render() {
        let report = CounterReport::trailing(ReportKind::JOURNAL_1, &clock());
        assert!(report.text_lines(ReportFormat::Csv).is_err());
    }

    #[tokio::test]
    async fn test_empty_book_report() {
        let (pool, _dir) = setup_test_db().await;
        let aggregates = AggregateRepository::new(pool);
        let mut report = CounterReport::trailing(ReportKind::BOOK_1, &clock());
        report.compile(&aggregates).await.unwrap();

        let csv = report.text_lines(ReportFormat::Csv).unwrap();
        assert_eq!(csv.len(), HEADER_LINE_COUNT + 1);
        assert_eq!(
            csv[0],
            "Book Report 1 (R4),Number of Successful Title Requests by Month and Title"
        );
        assert_eq!(csv[4], "2011-01-01 to 2012-12-31");
        assert_eq!(csv[6], "2013-01-15");
        assert!(csv[7].starts_with(
            "Book,Publisher,Platform,Book DOI,Proprietary Identifier,ISBN,ISSN,Reporting Period Total,Jan-2011"
        ));
        let zeros = vec!["0"; 25].join(",");
        assert_eq!(csv[8], format!("\"Total for all books\",,,,,,,{}", zeros));

        let tsv = report.text_lines(ReportFormat::Tsv).unwrap();
        let tab_zeros = vec!["0"; 25].join("\t");
        assert_eq!(tsv[8], format!("Total for all books\t\t\t\t\t\t\t{}", tab_zeros));
        assert_eq!(
            csv[7].split(',').count(),
            tsv[7].split('\t').count()
        );
    }

    #[tokio::test]
    async fn test_header_identity_lines() {
        let (pool, _dir) = setup_test_db().await;
        let aggregates = AggregateRepository::new(pool);
        let period = ReportPeriod::new(1, 2012, 1, 2012).unwrap();
        let mut report = CounterReport::new(ReportKind::JOURNAL_1, period, &clock()).with_header(
            ReportHeader {
                customer_name: "Example Library".to_string(),
                institutional_identifier: "EXL".to_string(),
            },
        );
        report.log_report(&aggregates).await.unwrap();
        report.compile(&aggregates).await.unwrap();

        let lines = report.text_lines(ReportFormat::Csv).unwrap();
        assert_eq!(lines[1], "Example Library,");
        assert_eq!(lines[2], "EXL,");
        assert_eq!(
            lines[7],
            "Journal,Publisher,Platform,Journal DOI,Proprietary Identifier,Print ISSN,Online ISSN,\
             Reporting Period Total,Reporting Period HTML,Reporting Period PDF,Jan-2012"
        );
        assert_eq!(lines[8], "\"Total for all journals\",,,,,,,0,0,0,0");
    }
}
