//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM through diesel-async. Functions that
//! take a `&mut SqliteConn` are building blocks meant to run inside a caller's
//! transaction; the repository structs open their own connections.

pub mod aggregates;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod requests;
pub mod titles;
pub mod util;

pub use aggregates::{AggregateFilter, AggregateRepository};
pub use migrations::{pending_migrations, run_migrations};
pub use pool::{DbPool, DieselError, SqliteConn};
pub use requests::{MonthScope, RequestRepository};
pub use titles::TitleRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use super::{run_migrations, DbPool};
    use tempfile::{tempdir, TempDir};

    /// Fresh migrated database in a temporary directory.
    pub async fn setup_test_db() -> (DbPool, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("counter.db");
        run_migrations(&db_path.display().to_string()).await.unwrap();
        (DbPool::sqlite_from_path(&db_path), dir)
    }
}
