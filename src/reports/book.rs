//! Book Reports 1 and 2: title or section requests by month.

use super::report::Tally;
use super::ReportPeriod;
use crate::repository::{AggregateFilter, AggregateRepository, DieselError};

pub(super) fn value_columns(period: &ReportPeriod) -> Vec<String> {
    std::iter::once("Reporting Period Total".to_string())
        .chain(period.month_labels())
        .collect()
}

/// Column 0 is the period total, then one column per month.
pub(super) async fn tally(
    aggregates: &AggregateRepository,
    filter: AggregateFilter,
    period: &ReportPeriod,
    sections: bool,
) -> Result<Tally, DieselError> {
    let mut tally = Tally::new(period.month_count() + 1);

    for row in aggregates.book_type_rows(filter).await? {
        let count = if sections {
            row.section_requests
        } else {
            row.full_requests
        };
        if count <= 0 {
            continue;
        }
        let Some(offset) = period.month_offset(row.request_year, row.request_month) else {
            continue;
        };
        tally.add(row.lockss_id, 0, i64::from(count));
        tally.add(row.lockss_id, offset + 1, i64::from(count));
    }

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::aggregator::RequestAggregator;
    use crate::models::{BookRequest, TitleBuilder};
    use crate::repository::test_support::setup_test_db;
    use crate::repository::RequestRepository;

    #[tokio::test]
    async fn test_full_and_section_counts() {
        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());
        let book = TitleBuilder::book("Book1").build().unwrap();
        let id = book.lockss_id().value();

        let jan = NaiveDate::from_ymd_opt(2012, 1, 5).unwrap();
        let mar = NaiveDate::from_ymd_opt(2012, 3, 9).unwrap();
        let full = BookRequest::default().into();
        let section = BookRequest {
            is_section: true,
            is_publisher_involved: false,
        }
        .into();
        let publisher_section = BookRequest {
            is_section: true,
            is_publisher_involved: true,
        }
        .into();
        requests.record(&book, &full, jan).await.unwrap();
        requests.record(&book, &full, mar).await.unwrap();
        requests.record(&book, &section, mar).await.unwrap();
        requests.record(&book, &publisher_section, mar).await.unwrap();
        RequestAggregator::new(pool.clone()).aggregate().await.unwrap();

        let aggregates = AggregateRepository::new(pool);
        let period = ReportPeriod::new(1, 2012, 3, 2012).unwrap();
        let (first_month, last_month) = period.bounds();
        let plain = AggregateFilter {
            first_month,
            last_month,
            include_publisher_involved: false,
        };

        let full_tally = tally(&aggregates, plain, &period, false).await.unwrap();
        assert_eq!(full_tally.per_title[&id], vec![2, 1, 0, 1]);
        assert_eq!(full_tally.totals, vec![2, 1, 0, 1]);

        let section_tally = tally(&aggregates, plain, &period, true).await.unwrap();
        assert_eq!(section_tally.per_title[&id], vec![1, 0, 0, 1]);

        let all = AggregateFilter {
            include_publisher_involved: true,
            ..plain
        };
        let all_sections = tally(&aggregates, all, &period, true).await.unwrap();
        assert_eq!(all_sections.per_title[&id], vec![2, 0, 0, 2]);
    }
}
