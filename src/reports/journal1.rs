//! Journal Report 1: full-text article requests by month.

use super::report::Tally;
use super::ReportPeriod;
use crate::repository::{AggregateFilter, AggregateRepository, DieselError};

const TOTAL: usize = 0;
const HTML: usize = 1;
const PDF: usize = 2;
const FIRST_MONTH: usize = 3;

pub(super) fn value_columns(period: &ReportPeriod) -> Vec<String> {
    [
        "Reporting Period Total",
        "Reporting Period HTML",
        "Reporting Period PDF",
    ]
    .iter()
    .map(|label| label.to_string())
    .chain(period.month_labels())
    .collect()
}

/// Period total, HTML and PDF columns followed by monthly totals.
pub(super) async fn tally(
    aggregates: &AggregateRepository,
    filter: AggregateFilter,
    period: &ReportPeriod,
) -> Result<Tally, DieselError> {
    let mut tally = Tally::new(period.month_count() + FIRST_MONTH);

    for row in aggregates.journal_type_rows(filter).await? {
        if row.total_requests <= 0 {
            continue;
        }
        let Some(offset) = period.month_offset(row.request_year, row.request_month) else {
            continue;
        };
        tally.add(row.lockss_id, TOTAL, i64::from(row.total_requests));
        tally.add(row.lockss_id, HTML, i64::from(row.html_requests));
        tally.add(row.lockss_id, PDF, i64::from(row.pdf_requests));
        tally.add(row.lockss_id, FIRST_MONTH + offset, i64::from(row.total_requests));
    }

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::aggregator::RequestAggregator;
    use crate::models::{JournalRequest, RequestData, TitleBuilder};
    use crate::repository::test_support::setup_test_db;
    use crate::repository::RequestRepository;

    #[tokio::test]
    async fn test_html_pdf_and_monthly_totals() {
        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());
        let journal = TitleBuilder::journal("Journal1").build().unwrap();
        let id = journal.lockss_id().value();

        let html: RequestData = JournalRequest {
            is_html: true,
            ..Default::default()
        }
        .into();
        let pdf: RequestData = JournalRequest {
            is_pdf: true,
            ..Default::default()
        }
        .into();
        let feb = NaiveDate::from_ymd_opt(2012, 2, 1).unwrap();
        requests.record(&journal, &html, feb).await.unwrap();
        requests.record(&journal, &pdf, feb).await.unwrap();
        requests.record(&journal, &pdf, feb).await.unwrap();
        RequestAggregator::new(pool.clone()).aggregate().await.unwrap();

        let period = ReportPeriod::new(1, 2012, 2, 2012).unwrap();
        let (first_month, last_month) = period.bounds();
        let filter = AggregateFilter {
            first_month,
            last_month,
            include_publisher_involved: false,
        };
        let tally = tally(&AggregateRepository::new(pool), filter, &period)
            .await
            .unwrap();

        assert_eq!(tally.per_title[&id], vec![3, 1, 2, 0, 3]);
        assert_eq!(tally.totals, vec![3, 1, 2, 0, 3]);
        assert_eq!(value_columns(&period).len(), 5);
    }
}
