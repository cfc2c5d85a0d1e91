use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_counter_titles")
        // counter_titles
        .operation(
            RunSql::new(
                r#"CREATE TABLE counter_titles (
    lockss_id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    publisher_name TEXT,
    platform_name TEXT,
    doi TEXT,
    proprietary_id TEXT,
    is_book INTEGER NOT NULL DEFAULT 0,
    isbn TEXT,
    book_issn TEXT,
    print_issn TEXT,
    online_issn TEXT
)"#,
            ),
        )
        // Seed the aggregation sinks
        .operation(
            RunSql::new(
                r#"INSERT OR IGNORE INTO counter_titles (lockss_id, name, is_book) VALUES
    (1, 'Total for all books', 1),
    (2, 'Total for all journals', 0)"#,
            ),
        )
        .operation(AddIndex::new("counter_titles", Index::new("idx_counter_titles_name").column("name")))
        .operation(AddIndex::new("counter_titles", Index::new("idx_counter_titles_kind").column("is_book").column("name")))
}
