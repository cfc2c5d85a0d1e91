//! Title registry persistence.

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{NewTitle, TitleRecord};
use super::pool::{DbPool, DieselError, SqliteConn};
use crate::models::{CounterTitle, LockssId};
use crate::schema::{
    counter_book_type_aggregates, counter_journal_pubyear_aggregates,
    counter_journal_type_aggregates, counter_requests, counter_titles,
};
use crate::with_conn;

/// Insert a title unless a row with its LOCKSS ID already exists.
///
/// Returns `true` when a new row was written.
pub async fn upsert_title(conn: &mut SqliteConn, title: &CounterTitle) -> Result<bool, DieselError> {
    let inserted = diesel::insert_or_ignore_into(counter_titles::table)
        .values(NewTitle::from(title))
        .execute(conn)
        .await?;
    Ok(inserted > 0)
}

/// Title registry repository.
#[derive(Clone)]
pub struct TitleRepository {
    pool: DbPool,
}

impl TitleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a title; existing rows are left untouched.
    pub async fn upsert(&self, title: &CounterTitle) -> Result<bool, DieselError> {
        with_conn!(self.pool, conn => {
            let inserted = upsert_title(&mut conn, title).await?;
            if inserted {
                tracing::debug!("Registered title '{}' as {}", title.name, title.lockss_id());
            }
            Ok(inserted)
        })
    }

    /// Make sure both aggregation sink titles exist.
    pub async fn ensure_sinks(&self) -> Result<(), DieselError> {
        with_conn!(self.pool, conn => {
            upsert_title(&mut conn, &CounterTitle::all_books()).await?;
            upsert_title(&mut conn, &CounterTitle::all_journals()).await?;
            Ok(())
        })
    }

    pub async fn get(&self, id: LockssId) -> Result<Option<CounterTitle>, DieselError> {
        with_conn!(self.pool, conn => {
            counter_titles::table
                .find(id.value())
                .select(TitleRecord::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map(|record| record.map(CounterTitle::from))
        })
    }

    /// All registered titles ordered by name, sinks excluded.
    pub async fn list(&self) -> Result<Vec<CounterTitle>, DieselError> {
        with_conn!(self.pool, conn => {
            counter_titles::table
                .filter(counter_titles::lockss_id.ne_all(vec![
                    LockssId::ALL_BOOKS.value(),
                    LockssId::ALL_JOURNALS.value(),
                ]))
                .order((counter_titles::name.asc(), counter_titles::lockss_id.asc()))
                .select(TitleRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(CounterTitle::from).collect())
        })
    }

    /// Number of rows in the titles table, sinks included.
    pub async fn count(&self) -> Result<i64, DieselError> {
        with_conn!(self.pool, conn => {
            counter_titles::table.count().get_result(&mut conn).await
        })
    }

    /// Remove a title along with its requests and aggregates.
    pub async fn delete(&self, id: LockssId) -> Result<bool, DieselError> {
        let id = id.value();
        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                Box::pin(async move {
                    diesel::delete(counter_requests::table.filter(counter_requests::lockss_id.eq(id)))
                        .execute(conn)
                        .await?;
                    diesel::delete(
                        counter_book_type_aggregates::table
                            .filter(counter_book_type_aggregates::lockss_id.eq(id)),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(
                        counter_journal_type_aggregates::table
                            .filter(counter_journal_type_aggregates::lockss_id.eq(id)),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(
                        counter_journal_pubyear_aggregates::table
                            .filter(counter_journal_pubyear_aggregates::lockss_id.eq(id)),
                    )
                    .execute(conn)
                    .await?;
                    let deleted = diesel::delete(counter_titles::table.find(id))
                        .execute(conn)
                        .await?;
                    Ok::<_, DieselError>(deleted > 0)
                })
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleBuilder;
    use crate::repository::test_support::setup_test_db;

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (pool, _dir) = setup_test_db().await;
        let repo = TitleRepository::new(pool);

        let title = TitleBuilder::book("Book1")
            .publisher("Publisher1")
            .isbn("9876543210987")
            .build()
            .unwrap();

        let before = repo.count().await.unwrap();
        assert!(repo.upsert(&title).await.unwrap());
        assert!(!repo.upsert(&title).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), before + 1);

        let loaded = repo.get(title.lockss_id()).await.unwrap().unwrap();
        assert_eq!(loaded, title);
    }

    #[tokio::test]
    async fn test_sinks_exist_after_migration() {
        let (pool, _dir) = setup_test_db().await;
        let repo = TitleRepository::new(pool);

        repo.ensure_sinks().await.unwrap();

        let books = repo.get(LockssId::ALL_BOOKS).await.unwrap().unwrap();
        assert_eq!(books, CounterTitle::all_books());
        let journals = repo.get(LockssId::ALL_JOURNALS).await.unwrap().unwrap();
        assert_eq!(journals, CounterTitle::all_journals());
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_name_and_delete() {
        let (pool, _dir) = setup_test_db().await;
        let repo = TitleRepository::new(pool);

        let zeta = TitleBuilder::journal("Zeta").build().unwrap();
        let alpha = TitleBuilder::journal("Alpha").build().unwrap();
        repo.upsert(&zeta).await.unwrap();
        repo.upsert(&alpha).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);

        assert!(repo.delete(zeta.lockss_id()).await.unwrap());
        assert!(!repo.delete(zeta.lockss_id()).await.unwrap());
        assert!(repo.get(zeta.lockss_id()).await.unwrap().is_none());
    }
}
