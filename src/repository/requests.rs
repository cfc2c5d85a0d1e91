//! Raw request events awaiting aggregation.

use chrono::{Datelike, NaiveDate};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{NewRequest, RequestRecord};
use super::pool::{DbPool, DieselError, SqliteConn};
use super::titles::upsert_title;
use super::util::{to_diesel_error, to_flag};
use crate::models::{CounterTitle, LockssId, RequestData};
use crate::schema::counter_requests;
use crate::with_conn;

/// Request counts for one book in one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookTypeCounts {
    pub full: i32,
    pub section: i32,
}

/// Request counts for one journal in one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalTypeCounts {
    pub total: i32,
    pub html: i32,
    pub pdf: i32,
}

/// Insert one raw request row stamped with `date`.
pub async fn insert_request(
    conn: &mut SqliteConn,
    lockss_id: LockssId,
    data: &RequestData,
    date: NaiveDate,
) -> Result<(), DieselError> {
    let row = match data {
        RequestData::Book(book) => NewRequest {
            lockss_id: lockss_id.value(),
            is_book: 1,
            is_section: to_flag(book.is_section),
            is_html: 0,
            is_pdf: 0,
            is_publisher_involved: to_flag(book.is_publisher_involved),
            publication_year: None,
            request_year: date.year(),
            request_month: date.month() as i32,
            request_day: date.day() as i32,
        },
        RequestData::Journal(journal) => NewRequest {
            lockss_id: lockss_id.value(),
            is_book: 0,
            is_section: 0,
            is_html: to_flag(journal.is_html),
            is_pdf: to_flag(journal.is_pdf),
            is_publisher_involved: to_flag(journal.is_publisher_involved),
            publication_year: journal.publication_year.as_deref(),
            request_year: date.year(),
            request_month: date.month() as i32,
            request_day: date.day() as i32,
        },
    };

    diesel::insert_into(counter_requests::table)
        .values(&row)
        .execute(conn)
        .await?;
    Ok(())
}

/// Scope of one aggregation step: a title kind, a month and a publisher flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthScope {
    pub year: i32,
    pub month: i32,
    pub is_book: bool,
    pub publisher_involved: bool,
}

/// Marked requests of one title within a scope.
macro_rules! scoped_requests {
    ($scope:expr, $lockss_id:expr) => {
        counter_requests::table
            .filter(counter_requests::in_aggregation.eq(1))
            .filter(counter_requests::request_year.eq($scope.year))
            .filter(counter_requests::request_month.eq($scope.month))
            .filter(counter_requests::is_book.eq(to_flag($scope.is_book)))
            .filter(counter_requests::is_publisher_involved.eq(to_flag($scope.publisher_involved)))
            .filter(counter_requests::lockss_id.eq($lockss_id))
    };
}

/// Add a grouped row count to an `i32` aggregate counter.
fn add_count(total: &mut i32, count: i64) -> Result<(), DieselError> {
    *total = i32::try_from(count)
        .ok()
        .and_then(|count| total.checked_add(count))
        .ok_or_else(|| to_diesel_error(format!("request count {} overflows the aggregate column", count)))?;
    Ok(())
}

/// Count a book's marked requests split into full and section requests.
pub async fn count_book_requests(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
) -> Result<BookTypeCounts, DieselError> {
    let rows: Vec<(i32, i64)> = scoped_requests!(scope, lockss_id)
        .group_by(counter_requests::is_section)
        .select((counter_requests::is_section, count_star()))
        .load(conn)
        .await?;

    let mut counts = BookTypeCounts::default();
    for (is_section, count) in rows {
        if is_section != 0 {
            add_count(&mut counts.section, count)?;
        } else {
            add_count(&mut counts.full, count)?;
        }
    }
    Ok(counts)
}

/// Count a journal's marked requests by format.
pub async fn count_journal_requests(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
) -> Result<JournalTypeCounts, DieselError> {
    let rows: Vec<(i32, i32, i64)> = scoped_requests!(scope, lockss_id)
        .group_by((counter_requests::is_html, counter_requests::is_pdf))
        .select((counter_requests::is_html, counter_requests::is_pdf, count_star()))
        .load(conn)
        .await?;

    let mut counts = JournalTypeCounts::default();
    for (is_html, is_pdf, count) in rows {
        add_count(&mut counts.total, count)?;
        if is_html != 0 {
            add_count(&mut counts.html, count)?;
        }
        if is_pdf != 0 {
            add_count(&mut counts.pdf, count)?;
        }
    }
    Ok(counts)
}

/// Count a journal's marked requests by publication year ('' when unknown).
pub async fn count_journal_pubyears(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
) -> Result<Vec<(String, i32)>, DieselError> {
    let rows: Vec<(Option<String>, i64)> = scoped_requests!(scope, lockss_id)
        .group_by(counter_requests::publication_year)
        .select((counter_requests::publication_year, count_star()))
        .load(conn)
        .await?;

    let mut merged: Vec<(String, i32)> = Vec::with_capacity(rows.len());
    for (year, count) in rows {
        let year = year.map(|y| y.trim().to_string()).unwrap_or_default();
        match merged.iter_mut().find(|(existing, _)| *existing == year) {
            Some((_, total)) => add_count(total, count)?,
            None => {
                let mut total = 0;
                add_count(&mut total, count)?;
                merged.push((year, total));
            }
        }
    }
    Ok(merged)
}

/// Delete a title's marked requests within a scope.
pub async fn delete_scoped_requests(
    conn: &mut SqliteConn,
    scope: MonthScope,
    lockss_id: i64,
) -> Result<usize, DieselError> {
    diesel::delete(scoped_requests!(scope, lockss_id))
        .execute(conn)
        .await
}

/// Raw request repository.
#[derive(Clone)]
pub struct RequestRepository {
    pool: DbPool,
}

impl RequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register the title if needed and record one request, atomically.
    pub async fn record(
        &self,
        title: &CounterTitle,
        data: &RequestData,
        date: NaiveDate,
    ) -> Result<(), DieselError> {
        let title = title.clone();
        let data = data.clone();
        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                Box::pin(async move {
                    upsert_title(conn, &title).await?;
                    insert_request(conn, title.lockss_id(), &data, date).await
                })
            })
            .await
        })
    }

    /// Number of raw request rows, pending or marked.
    pub async fn count(&self) -> Result<i64, DieselError> {
        with_conn!(self.pool, conn => {
            counter_requests::table.count().get_result(&mut conn).await
        })
    }

    pub async fn list_for_title(&self, id: LockssId) -> Result<Vec<RequestRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            counter_requests::table
                .filter(counter_requests::lockss_id.eq(id.value()))
                .order(counter_requests::id.asc())
                .select(RequestRecord::as_select())
                .load(&mut conn)
                .await
        })
    }

    /// Flag every unmarked request as part of the next aggregation pass.
    pub async fn mark_for_aggregation(&self) -> Result<usize, DieselError> {
        with_conn!(self.pool, conn => {
            diesel::update(counter_requests::table.filter(counter_requests::in_aggregation.eq(0)))
                .set(counter_requests::in_aggregation.eq(1))
                .execute(&mut conn)
                .await
        })
    }

    /// Distinct (year, month) pairs of marked requests, oldest first.
    pub async fn marked_months(&self) -> Result<Vec<(i32, i32)>, DieselError> {
        with_conn!(self.pool, conn => {
            counter_requests::table
                .filter(counter_requests::in_aggregation.eq(1))
                .select((counter_requests::request_year, counter_requests::request_month))
                .distinct()
                .order((counter_requests::request_year.asc(), counter_requests::request_month.asc()))
                .load(&mut conn)
                .await
        })
    }

    /// Titles with marked requests within a scope.
    pub async fn marked_titles(&self, scope: MonthScope) -> Result<Vec<i64>, DieselError> {
        with_conn!(self.pool, conn => {
            counter_requests::table
                .filter(counter_requests::in_aggregation.eq(1))
                .filter(counter_requests::request_year.eq(scope.year))
                .filter(counter_requests::request_month.eq(scope.month))
                .filter(counter_requests::is_book.eq(to_flag(scope.is_book)))
                .filter(counter_requests::is_publisher_involved.eq(to_flag(scope.publisher_involved)))
                .select(counter_requests::lockss_id)
                .distinct()
                .order(counter_requests::lockss_id.asc())
                .load(&mut conn)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookRequest, JournalRequest, TitleBuilder};
    use crate::repository::test_support::setup_test_db;
    use crate::repository::TitleRepository;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, 1, 15).unwrap()
    }

    #[test]
    fn test_add_count_rejects_counts_beyond_i32() {
        let mut total = 5;
        add_count(&mut total, 7).unwrap();
        assert_eq!(total, 12);

        let err = add_count(&mut total, i64::from(i32::MAX) + 1).unwrap_err();
        assert!(err.to_string().contains("overflows the aggregate column"));
        assert_eq!(total, 12);

        let mut full = i32::MAX;
        assert!(add_count(&mut full, 1).is_err());
        assert_eq!(full, i32::MAX);
    }

    #[tokio::test]
    async fn test_record_registers_title_once() {
        let (pool, _dir) = setup_test_db().await;
        let titles = TitleRepository::new(pool.clone());
        let requests = RequestRepository::new(pool);

        let book = TitleBuilder::book("Book1").build().unwrap();
        let data = RequestData::Book(BookRequest {
            is_section: true,
            is_publisher_involved: false,
        });

        requests.record(&book, &data, date()).await.unwrap();
        requests.record(&book, &data, date()).await.unwrap();

        assert_eq!(titles.count().await.unwrap(), 3);
        let rows = requests.list_for_title(book.lockss_id()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].is_section, 1);
        assert_eq!(rows[0].is_book, 1);
        assert_eq!((rows[0].request_year, rows[0].request_month, rows[0].request_day), (2013, 1, 15));
        assert_eq!(rows[0].in_aggregation, 0);
    }

    #[tokio::test]
    async fn test_marking_and_counting() {
        let (pool, _dir) = setup_test_db().await;
        let requests = RequestRepository::new(pool.clone());

        let journal = TitleBuilder::journal("Journal1").build().unwrap();
        let html = RequestData::Journal(JournalRequest {
            is_html: true,
            publication_year: Some("2010".to_string()),
            ..Default::default()
        });
        let pdf = RequestData::Journal(JournalRequest {
            is_pdf: true,
            ..Default::default()
        });
        requests.record(&journal, &html, date()).await.unwrap();
        requests.record(&journal, &pdf, date()).await.unwrap();

        assert_eq!(requests.mark_for_aggregation().await.unwrap(), 2);
        assert_eq!(requests.mark_for_aggregation().await.unwrap(), 0);
        assert_eq!(requests.marked_months().await.unwrap(), vec![(2013, 1)]);

        let scope = MonthScope {
            year: 2013,
            month: 1,
            is_book: false,
            publisher_involved: false,
        };
        assert_eq!(
            requests.marked_titles(scope).await.unwrap(),
            vec![journal.lockss_id().value()]
        );

        let DbPool::Sqlite(sqlite) = &pool;
        let mut conn = sqlite.get().await.unwrap();
        let counts = count_journal_requests(&mut conn, scope, journal.lockss_id().value())
            .await
            .unwrap();
        assert_eq!(counts, JournalTypeCounts { total: 2, html: 1, pdf: 1 });

        let mut years = count_journal_pubyears(&mut conn, scope, journal.lockss_id().value())
            .await
            .unwrap();
        years.sort();
        assert_eq!(years, vec![(String::new(), 1), ("2010".to_string(), 1)]);

        let deleted = delete_scoped_requests(&mut conn, scope, journal.lockss_id().value())
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(requests.count().await.unwrap(), 0);
    }
}
