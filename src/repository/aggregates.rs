//! Monthly aggregate tables.
//!
//! Merges add to an existing row for the key or insert a new one. They take a
//! connection so the aggregator can run them inside its own transaction.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{
    BookTypeAggregateRecord, JournalPubYearAggregateRecord, JournalTypeAggregateRecord,
    NewBookTypeAggregate, NewJournalPubYearAggregate, NewJournalTypeAggregate, TitleRecord,
};
use super::pool::{DbPool, DieselError, SqliteConn};
use super::requests::{BookTypeCounts, JournalTypeCounts, MonthScope};
use super::util::{clamp_index, month_index, to_flag};
use crate::models::{CounterTitle, LockssId};
use crate::schema::{
    counter_book_type_aggregates as book_types, counter_journal_pubyear_aggregates as pubyears,
    counter_journal_type_aggregates as journal_types, counter_titles,
};
use crate::with_conn;

/// Add book counts to the aggregate row for `(lockss_id, scope)`.
pub async fn merge_book_type_aggregate(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
    counts: BookTypeCounts,
) -> Result<(), DieselError> {
    let updated = diesel::update(
        book_types::table
            .filter(book_types::lockss_id.eq(lockss_id))
            .filter(book_types::request_year.eq(scope.year))
            .filter(book_types::request_month.eq(scope.month))
            .filter(book_types::is_publisher_involved.eq(to_flag(scope.publisher_involved))),
    )
    .set((
        book_types::full_requests.eq(book_types::full_requests + counts.full),
        book_types::section_requests.eq(book_types::section_requests + counts.section),
    ))
    .execute(conn)
    .await?;

    if updated == 0 {
        diesel::insert_into(book_types::table)
            .values(NewBookTypeAggregate {
                lockss_id,
                request_year: scope.year,
                request_month: scope.month,
                is_publisher_involved: to_flag(scope.publisher_involved),
                full_requests: counts.full,
                section_requests: counts.section,
            })
            .execute(conn)
            .await?;
    }
    Ok(())
}

/// Add journal counts to the aggregate row for `(lockss_id, scope)`.
pub async fn merge_journal_type_aggregate(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
    counts: JournalTypeCounts,
) -> Result<(), DieselError> {
    let updated = diesel::update(
        journal_types::table
            .filter(journal_types::lockss_id.eq(lockss_id))
            .filter(journal_types::request_year.eq(scope.year))
            .filter(journal_types::request_month.eq(scope.month))
            .filter(journal_types::is_publisher_involved.eq(to_flag(scope.publisher_involved))),
    )
    .set((
        journal_types::total_requests.eq(journal_types::total_requests + counts.total),
        journal_types::html_requests.eq(journal_types::html_requests + counts.html),
        journal_types::pdf_requests.eq(journal_types::pdf_requests + counts.pdf),
    ))
    .execute(conn)
    .await?;

    if updated == 0 {
        diesel::insert_into(journal_types::table)
            .values(NewJournalTypeAggregate {
                lockss_id,
                request_year: scope.year,
                request_month: scope.month,
                is_publisher_involved: to_flag(scope.publisher_involved),
                total_requests: counts.total,
                html_requests: counts.html,
                pdf_requests: counts.pdf,
            })
            .execute(conn)
            .await?;
    }
    Ok(())
}

/// Add a publication-year count to the row for `(lockss_id, scope, publication_year)`.
pub async fn merge_journal_pubyear_aggregate(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
    publication_year: &str,
    requests: i32,
) -> Result<(), DieselError> {
    let updated = diesel::update(
        pubyears::table
            .filter(pubyears::lockss_id.eq(lockss_id))
            .filter(pubyears::request_year.eq(scope.year))
            .filter(pubyears::request_month.eq(scope.month))
            .filter(pubyears::is_publisher_involved.eq(to_flag(scope.publisher_involved)))
            .filter(pubyears::publication_year.eq(publication_year)),
    )
    .set(pubyears::requests.eq(pubyears::requests + requests))
    .execute(conn)
    .await?;

    if updated == 0 {
        diesel::insert_into(pubyears::table)
            .values(NewJournalPubYearAggregate {
                lockss_id,
                request_year: scope.year,
                request_month: scope.month,
                is_publisher_involved: to_flag(scope.publisher_involved),
                publication_year,
                requests,
            })
            .execute(conn)
            .await?;
    }
    Ok(())
}

/// Month range and publisher filter for report queries.
///
/// Months are compared as `year * 12 + month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateFilter {
    pub first_month: i32,
    pub last_month: i32,
    /// Include requests that involved the publisher.
    pub include_publisher_involved: bool,
}

impl AggregateFilter {
    pub fn new(
        start_year: i32,
        start_month: u32,
        end_year: i32,
        end_month: u32,
        include_publisher_involved: bool,
    ) -> Self {
        Self {
            first_month: clamp_index(month_index(start_year, start_month as i32)),
            last_month: clamp_index(month_index(end_year, end_month as i32)),
            include_publisher_involved,
        }
    }

    /// Largest publisher flag value to include (0 excludes publisher-involved rows).
    fn max_publisher_flag(&self) -> i32 {
        to_flag(self.include_publisher_involved)
    }
}

/// Aggregate table repository.
#[derive(Clone)]
pub struct AggregateRepository {
    pool: DbPool,
}

impl AggregateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Book aggregate rows for real titles inside the filter.
    pub async fn book_type_rows(
        &self,
        filter: AggregateFilter,
    ) -> Result<Vec<BookTypeAggregateRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            book_types::table
                .filter((book_types::request_year * 12 + book_types::request_month)
                    .between(filter.first_month, filter.last_month))
                .filter(book_types::is_publisher_involved.le(filter.max_publisher_flag()))
                .filter(book_types::lockss_id.ne(LockssId::ALL_BOOKS.value()))
                .order((
                    book_types::lockss_id.asc(),
                    book_types::request_year.asc(),
                    book_types::request_month.asc(),
                ))
                .select(BookTypeAggregateRecord::as_select())
                .load(&mut conn)
                .await
        })
    }

    /// Journal aggregate rows for real titles inside the filter.
    pub async fn journal_type_rows(
        &self,
        filter: AggregateFilter,
    ) -> Result<Vec<JournalTypeAggregateRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            journal_types::table
                .filter((journal_types::request_year * 12 + journal_types::request_month)
                    .between(filter.first_month, filter.last_month))
                .filter(journal_types::is_publisher_involved.le(filter.max_publisher_flag()))
                .filter(journal_types::lockss_id.ne(LockssId::ALL_JOURNALS.value()))
                .order((
                    journal_types::lockss_id.asc(),
                    journal_types::request_year.asc(),
                    journal_types::request_month.asc(),
                ))
                .select(JournalTypeAggregateRecord::as_select())
                .load(&mut conn)
                .await
        })
    }

    /// Publication-year aggregate rows inside the filter.
    pub async fn journal_pubyear_rows(
        &self,
        filter: AggregateFilter,
    ) -> Result<Vec<JournalPubYearAggregateRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            pubyears::table
                .filter((pubyears::request_year * 12 + pubyears::request_month)
                    .between(filter.first_month, filter.last_month))
                .filter(pubyears::is_publisher_involved.le(filter.max_publisher_flag()))
                .filter(pubyears::lockss_id.ne(LockssId::ALL_JOURNALS.value()))
                .order((pubyears::lockss_id.asc(), pubyears::publication_year.desc()))
                .select(JournalPubYearAggregateRecord::as_select())
                .load(&mut conn)
                .await
        })
    }

    /// Load the titles referenced by aggregate rows.
    pub async fn titles(&self, ids: &[i64]) -> Result<Vec<CounterTitle>, DieselError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        with_conn!(self.pool, conn => {
            counter_titles::table
                .filter(counter_titles::lockss_id.eq_any(ids))
                .select(TitleRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(CounterTitle::from).collect())
        })
    }

    /// Every book aggregate row, sinks included.
    pub async fn all_book_type_rows(&self) -> Result<Vec<BookTypeAggregateRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            book_types::table
                .order(book_types::id.asc())
                .select(BookTypeAggregateRecord::as_select())
                .load(&mut conn)
                .await
        })
    }

    /// Every journal aggregate row, sinks included.
    pub async fn all_journal_type_rows(
        &self,
    ) -> Result<Vec<JournalTypeAggregateRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            journal_types::table
                .order(journal_types::id.asc())
                .select(JournalTypeAggregateRecord::as_select())
                .load(&mut conn)
                .await
        })
    }

    /// Every publication-year aggregate row.
    pub async fn all_journal_pubyear_rows(
        &self,
    ) -> Result<Vec<JournalPubYearAggregateRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            pubyears::table
                .order(pubyears::id.asc())
                .select(JournalPubYearAggregateRecord::as_select())
                .load(&mut conn)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleBuilder;
    use crate::repository::test_support::setup_test_db;
    use crate::repository::TitleRepository;

    fn scope(month: i32, publisher_involved: bool) -> MonthScope {
        MonthScope {
            year: 2013,
            month,
            is_book: true,
            publisher_involved,
        }
    }

    #[tokio::test]
    async fn test_merge_increments_in_place() {
        let (pool, _dir) = setup_test_db().await;
        let book = TitleBuilder::book("Book1").build().unwrap();
        TitleRepository::new(pool.clone()).upsert(&book).await.unwrap();
        let id = book.lockss_id().value();

        let DbPool::Sqlite(sqlite) = &pool;
        let mut conn = sqlite.get().await.unwrap();
        merge_book_type_aggregate(&mut conn, scope(1, false), id, BookTypeCounts { full: 2, section: 1 })
            .await
            .unwrap();
        merge_book_type_aggregate(&mut conn, scope(1, false), id, BookTypeCounts { full: 1, section: 0 })
            .await
            .unwrap();
        merge_book_type_aggregate(&mut conn, scope(1, true), id, BookTypeCounts { full: 0, section: 4 })
            .await
            .unwrap();

        let repo = AggregateRepository::new(pool.clone());
        let rows = repo.all_book_type_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].full_requests, rows[0].section_requests), (3, 1));
        assert_eq!((rows[1].full_requests, rows[1].section_requests), (0, 4));
    }

    #[tokio::test]
    async fn test_filter_bounds_and_publisher_flag() {
        let (pool, _dir) = setup_test_db().await;
        let book = TitleBuilder::book("Book1").build().unwrap();
        TitleRepository::new(pool.clone()).upsert(&book).await.unwrap();
        let id = book.lockss_id().value();

        let DbPool::Sqlite(sqlite) = &pool;
        let mut conn = sqlite.get().await.unwrap();
        for month in 1..=4 {
            merge_book_type_aggregate(&mut conn, scope(month, false), id, BookTypeCounts { full: 1, section: 0 })
                .await
                .unwrap();
        }
        merge_book_type_aggregate(&mut conn, scope(2, true), id, BookTypeCounts { full: 5, section: 0 })
            .await
            .unwrap();

        let repo = AggregateRepository::new(pool.clone());
        let plain = repo
            .book_type_rows(AggregateFilter::new(2013, 2, 2013, 3, false))
            .await
            .unwrap();
        assert_eq!(plain.len(), 2);
        assert!(plain.iter().all(|r| r.is_publisher_involved == 0));

        let all = repo
            .book_type_rows(AggregateFilter::new(2013, 2, 2013, 3, true))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let titles = repo.titles(&[id]).await.unwrap();
        assert_eq!(titles, vec![book]);
    }

    #[test]
    fn test_filter_with_extreme_years() {
        let filter = AggregateFilter::new(i32::MIN, 1, i32::MAX, 12, false);
        assert_eq!(filter.first_month, i32::MIN);
        assert_eq!(filter.last_month, i32::MAX);
    }
}
