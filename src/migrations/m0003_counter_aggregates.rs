use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0003_counter_aggregates")
        .depends_on(&["0002_counter_requests"])
        // counter_book_type_aggregates
        .operation(
            RunSql::new(
                r#"CREATE TABLE counter_book_type_aggregates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lockss_id INTEGER NOT NULL,
    request_year INTEGER NOT NULL,
    request_month INTEGER NOT NULL,
    is_publisher_involved INTEGER NOT NULL DEFAULT 0,
    full_requests INTEGER NOT NULL DEFAULT 0,
    section_requests INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (lockss_id) REFERENCES counter_titles(lockss_id)
)"#,
            ),
        )
        // counter_journal_type_aggregates
        .operation(
            RunSql::new(
                r#"CREATE TABLE counter_journal_type_aggregates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lockss_id INTEGER NOT NULL,
    request_year INTEGER NOT NULL,
    request_month INTEGER NOT NULL,
    is_publisher_involved INTEGER NOT NULL DEFAULT 0,
    total_requests INTEGER NOT NULL DEFAULT 0,
    html_requests INTEGER NOT NULL DEFAULT 0,
    pdf_requests INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (lockss_id) REFERENCES counter_titles(lockss_id)
)"#,
            ),
        )
        // counter_journal_pubyear_aggregates - unknown years are stored as ''
        .operation(
            RunSql::new(
                r#"CREATE TABLE counter_journal_pubyear_aggregates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lockss_id INTEGER NOT NULL,
    request_year INTEGER NOT NULL,
    request_month INTEGER NOT NULL,
    is_publisher_involved INTEGER NOT NULL DEFAULT 0,
    publication_year TEXT NOT NULL DEFAULT '',
    requests INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (lockss_id) REFERENCES counter_titles(lockss_id)
)"#,
            ),
        )
        .operation(AddIndex::new(
            "counter_book_type_aggregates",
            Index::new("idx_book_type_aggregates_key")
                .column("lockss_id")
                .column("request_year")
                .column("request_month")
                .column("is_publisher_involved")
                .unique(),
        ))
        .operation(AddIndex::new(
            "counter_journal_type_aggregates",
            Index::new("idx_journal_type_aggregates_key")
                .column("lockss_id")
                .column("request_year")
                .column("request_month")
                .column("is_publisher_involved")
                .unique(),
        ))
        .operation(AddIndex::new(
            "counter_journal_pubyear_aggregates",
            Index::new("idx_journal_pubyear_aggregates_key")
                .column("lockss_id")
                .column("request_year")
                .column("request_month")
                .column("is_publisher_involved")
                .column("publication_year")
                .unique(),
        ))
        .operation(AddIndex::new(
            "counter_book_type_aggregates",
            Index::new("idx_book_type_aggregates_period")
                .column("request_year")
                .column("request_month"),
        ))
        .operation(AddIndex::new(
            "counter_journal_type_aggregates",
            Index::new("idx_journal_type_aggregates_period")
                .column("request_year")
                .column("request_month"),
        ))
        .operation(AddIndex::new(
            "counter_journal_pubyear_aggregates",
            Index::new("idx_journal_pubyear_aggregates_period")
                .column("request_year")
                .column("request_month"),
        ))
}
