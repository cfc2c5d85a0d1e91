use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_counter_requests")
        .depends_on(&["0001_counter_titles"])
        .operation(
            RunSql::new(
                r#"CREATE TABLE counter_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lockss_id INTEGER NOT NULL,
    is_book INTEGER NOT NULL DEFAULT 0,
    is_section INTEGER NOT NULL DEFAULT 0,
    is_html INTEGER NOT NULL DEFAULT 0,
    is_pdf INTEGER NOT NULL DEFAULT 0,
    is_publisher_involved INTEGER NOT NULL DEFAULT 0,
    publication_year TEXT,
    request_year INTEGER NOT NULL,
    request_month INTEGER NOT NULL,
    request_day INTEGER NOT NULL,
    in_aggregation INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (lockss_id) REFERENCES counter_titles(lockss_id)
)"#,
            ),
        )
        .operation(AddIndex::new(
            "counter_requests",
            Index::new("idx_counter_requests_pending")
                .column("in_aggregation")
                .column("request_year")
                .column("request_month"),
        ))
        .operation(AddIndex::new("counter_requests", Index::new("idx_counter_requests_title").column("lockss_id")))
}
