//! Request aggregation.
//!
//! Folds raw request rows into the monthly aggregate tables and deletes the
//! rows it consumed. Each batch of titles is folded in one transaction, so a
//! failure never leaves requests counted twice.

mod schedule;

pub use schedule::{AggregationScheduler, Frequency, AGGREGATOR_TASK_ID};

use std::sync::Arc;

use diesel_async::AsyncConnection;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::CounterError;
use crate::models::LockssId;
use crate::repository::aggregates::{
    merge_book_type_aggregate, merge_journal_pubyear_aggregate, merge_journal_type_aggregate,
};
use crate::repository::requests::{
    count_book_requests, count_journal_pubyears, count_journal_requests, delete_scoped_requests,
    BookTypeCounts, JournalTypeCounts,
};
use crate::repository::{DbPool, DieselError, MonthScope, RequestRepository, SqliteConn};
use crate::with_conn;

/// Maximum number of titles folded per transaction.
pub const TITLE_BATCH_SIZE: usize = 100;

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationSummary {
    /// Months with marked requests.
    pub months: usize,
    /// Raw request rows folded and deleted.
    pub requests: usize,
    /// Title aggregate rows touched, sinks excluded.
    pub titles: usize,
    /// Months left marked after an error.
    pub failed_months: usize,
}

/// Folded totals of one batch.
#[derive(Debug, Default)]
struct BatchTotals {
    requests: usize,
    titles: usize,
}

/// Rolls raw requests up into monthly aggregates.
#[derive(Clone)]
pub struct RequestAggregator {
    pool: DbPool,
    requests: RequestRepository,
    running: Arc<Mutex<()>>,
}

impl RequestAggregator {
    pub fn new(pool: DbPool) -> Self {
        Self {
            requests: RequestRepository::new(pool.clone()),
            pool,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one aggregation pass over every pending request.
    ///
    /// Concurrent calls wait for the running pass to finish.
    pub async fn aggregate(&self) -> Result<AggregationSummary, CounterError> {
        let _guard = self.running.lock().await;

        let marked = self.requests.mark_for_aggregation().await?;
        debug!("Marked {} requests for aggregation", marked);

        let months = self.requests.marked_months().await?;
        let mut summary = AggregationSummary {
            months: months.len(),
            ..Default::default()
        };

        for (year, month) in months {
            match self.aggregate_month(year, month).await {
                Ok(totals) => {
                    debug!(
                        "Aggregated {:04}-{:02}: {} requests for {} titles",
                        year, month, totals.requests, totals.titles
                    );
                    summary.requests += totals.requests;
                    summary.titles += totals.titles;
                }
                Err(e) => {
                    error!("Failed to aggregate requests for {:04}-{:02}: {}", year, month, e);
                    summary.failed_months += 1;
                }
            }
        }

        info!(
            "Aggregation pass finished: {} requests, {} title rows, {} months ({} failed)",
            summary.requests, summary.titles, summary.months, summary.failed_months
        );
        Ok(summary)
    }

    async fn aggregate_month(&self, year: i32, month: i32) -> Result<BatchTotals, DieselError> {
        let mut totals = BatchTotals::default();

        for publisher_involved in [false, true] {
            for is_book in [true, false] {
                let scope = MonthScope {
                    year,
                    month,
                    is_book,
                    publisher_involved,
                };
                let titles = self.requests.marked_titles(scope).await?;

                for batch in titles.chunks(TITLE_BATCH_SIZE) {
                    let batch = batch.to_vec();
                    let folded = with_conn!(self.pool, conn => {
                        conn.transaction(|conn| {
                            Box::pin(async move { fold_batch(conn, scope, &batch).await })
                        })
                        .await
                    })?;
                    totals.requests += folded.requests;
                    totals.titles += folded.titles;
                }
            }
        }

        Ok(totals)
    }
}

/// Fold one batch of titles and add the batch total to the sink row.
async fn fold_batch(
    conn: &mut SqliteConn,
    scope: MonthScope,
    titles: &[i64],
) -> Result<BatchTotals, DieselError> {
    let mut totals = BatchTotals::default();

    if scope.is_book {
        let mut sink = BookTypeCounts::default();
        for &lockss_id in titles {
            let counts = count_book_requests(conn, scope, lockss_id).await?;
            merge_book_type_aggregate(conn, scope, lockss_id, counts).await?;
            sink.full += counts.full;
            sink.section += counts.section;
            totals.requests += delete_scoped_requests(conn, scope, lockss_id).await?;
            totals.titles += 1;
        }
        merge_book_type_aggregate(conn, scope, LockssId::ALL_BOOKS.value(), sink).await?;
    } else {
        let mut sink = JournalTypeCounts::default();
        for &lockss_id in titles {
            let counts = count_journal_requests(conn, scope, lockss_id).await?;
            merge_journal_type_aggregate(conn, scope, lockss_id, counts).await?;
            for (publication_year, requests) in count_journal_pubyears(conn, scope, lockss_id).await? {
                merge_journal_pubyear_aggregate(conn, scope, lockss_id, &publication_year, requests)
                    .await?;
            }
            sink.total += counts.total;
            sink.html += counts.html;
            sink.pdf += counts.pdf;
            totals.requests += delete_scoped_requests(conn, scope, lockss_id).await?;
            totals.titles += 1;
        }
        merge_journal_type_aggregate(conn, scope, LockssId::ALL_JOURNALS.value(), sink).await?;
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{BookRequest, JournalRequest, RequestData, TitleBuilder};
    use crate::repository::test_support::setup_test_db;
    use crate::repository::AggregateRepository;

    fn book_request(is_section: bool, is_publisher_involved: bool) -> RequestData {
        BookRequest {
            is_section,
            is_publisher_involved,
        }
        .into()
    }

    #[tokio::test]
    async fn test_two_books_both_flags() {
        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());
        let aggregates = AggregateRepository::new(pool.clone());
        let date = NaiveDate::from_ymd_opt(2013, 1, 10).unwrap();

        let book1 = TitleBuilder::book("Book1").build().unwrap();
        let book2 = TitleBuilder::book("Book2").build().unwrap();
        for book in [&book1, &book2] {
            requests.record(book, &book_request(false, false), date).await.unwrap();
            requests.record(book, &book_request(true, false), date).await.unwrap();
            requests.record(book, &book_request(true, true), date).await.unwrap();
        }

        let summary = RequestAggregator::new(pool).aggregate().await.unwrap();
        assert_eq!(summary.requests, 6);
        assert_eq!(summary.titles, 4);
        assert_eq!(summary.failed_months, 0);
        assert_eq!(requests.count().await.unwrap(), 0);

        let rows = aggregates.all_book_type_rows().await.unwrap();
        assert_eq!(rows.len(), 6);

        let sink_plain = rows
            .iter()
            .find(|r| r.lockss_id == LockssId::ALL_BOOKS.value() && r.is_publisher_involved == 0)
            .unwrap();
        assert_eq!((sink_plain.full_requests, sink_plain.section_requests), (2, 2));

        let sink_publisher = rows
            .iter()
            .find(|r| r.lockss_id == LockssId::ALL_BOOKS.value() && r.is_publisher_involved == 1)
            .unwrap();
        assert_eq!((sink_publisher.full_requests, sink_publisher.section_requests), (0, 2));
    }

    #[tokio::test]
    async fn test_second_pass_increments_existing_rows() {
        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());
        let aggregates = AggregateRepository::new(pool.clone());
        let aggregator = RequestAggregator::new(pool);
        let date = NaiveDate::from_ymd_opt(2013, 3, 1).unwrap();

        let journal = TitleBuilder::journal("Journal1").build().unwrap();
        let html: RequestData = JournalRequest {
            is_html: true,
            publication_year: Some("2009".to_string()),
            ..Default::default()
        }
        .into();

        requests.record(&journal, &html, date).await.unwrap();
        aggregator.aggregate().await.unwrap();
        requests.record(&journal, &html, date).await.unwrap();
        aggregator.aggregate().await.unwrap();

        let rows = aggregates.all_journal_type_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        let title_row = rows
            .iter()
            .find(|r| r.lockss_id == journal.lockss_id().value())
            .unwrap();
        assert_eq!((title_row.total_requests, title_row.html_requests, title_row.pdf_requests), (2, 2, 0));

        let years = aggregates.all_journal_pubyear_rows().await.unwrap();
        assert_eq!(years.len(), 1);
        assert_eq!((years[0].publication_year.as_str(), years[0].requests), ("2009", 2));
    }

    #[tokio::test]
    async fn test_month_spanning_several_batches() {
        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());
        let aggregates = AggregateRepository::new(pool.clone());
        let date = NaiveDate::from_ymd_opt(2013, 5, 20).unwrap();
        let title_count = TITLE_BATCH_SIZE + 5;

        let mut ids = Vec::new();
        for i in 0..title_count {
            let book = TitleBuilder::book(format!("Book {}", i)).build().unwrap();
            requests.record(&book, &book_request(false, false), date).await.unwrap();
            ids.push(book.lockss_id().value());
        }

        let summary = RequestAggregator::new(pool).aggregate().await.unwrap();
        assert_eq!(summary.months, 1);
        assert_eq!(summary.requests, title_count);
        assert_eq!(summary.titles, title_count);
        assert_eq!(summary.failed_months, 0);
        assert_eq!(requests.count().await.unwrap(), 0);

        let rows = aggregates.all_book_type_rows().await.unwrap();
        assert_eq!(rows.len(), title_count + 1);
        for id in &ids {
            let row = rows.iter().find(|r| r.lockss_id == *id).unwrap();
            assert_eq!((row.full_requests, row.section_requests), (1, 0));
        }

        let sinks: Vec<_> = rows
            .iter()
            .filter(|r| r.lockss_id == LockssId::ALL_BOOKS.value())
            .collect();
        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].full_requests, title_count as i32);
        assert_eq!(sinks[0].section_requests, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_raw_requests() {
        use diesel_async::SimpleAsyncConnection;

        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());
        let date = NaiveDate::from_ymd_opt(2013, 2, 3).unwrap();

        let book = TitleBuilder::book("Book1").build().unwrap();
        requests.record(&book, &book_request(false, false), date).await.unwrap();
        requests.record(&book, &book_request(true, false), date).await.unwrap();

        {
            let DbPool::Sqlite(sqlite) = &pool;
            let mut conn = sqlite.get().await.unwrap();
            conn.batch_execute("DROP TABLE counter_book_type_aggregates")
                .await
                .unwrap();
        }

        let summary = RequestAggregator::new(pool).aggregate().await.unwrap();
        assert_eq!(summary.months, 1);
        assert_eq!(summary.failed_months, 1);
        assert_eq!(summary.requests, 0);
        assert_eq!(summary.titles, 0);
        assert_eq!(requests.count().await.unwrap(), 2);

        let rows = requests.list_for_title(book.lockss_id()).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_pass() {
        let (pool, _dir) = setup_test_db().await;
        let summary = RequestAggregator::new(pool).aggregate().await.unwrap();
        assert_eq!(summary, AggregationSummary::default());
    }
}
