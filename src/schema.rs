// Diesel table definitions for the COUNTER reporting tables.
// Kept in sync by hand with the cetane migrations in src/migrations.

diesel::table! {
    counter_titles (lockss_id) {
        lockss_id -> BigInt,
        name -> Text,
        publisher_name -> Nullable<Text>,
        platform_name -> Nullable<Text>,
        doi -> Nullable<Text>,
        proprietary_id -> Nullable<Text>,
        is_book -> Integer,
        isbn -> Nullable<Text>,
        book_issn -> Nullable<Text>,
        print_issn -> Nullable<Text>,
        online_issn -> Nullable<Text>,
    }
}

diesel::table! {
    counter_requests (id) {
        id -> Integer,
        lockss_id -> BigInt,
        is_book -> Integer,
        is_section -> Integer,
        is_html -> Integer,
        is_pdf -> Integer,
        is_publisher_involved -> Integer,
        publication_year -> Nullable<Text>,
        request_year -> Integer,
        request_month -> Integer,
        request_day -> Integer,
        in_aggregation -> Integer,
    }
}

diesel::table! {
    counter_book_type_aggregates (id) {
        id -> Integer,
        lockss_id -> BigInt,
        request_year -> Integer,
        request_month -> Integer,
        is_publisher_involved -> Integer,
        full_requests -> Integer,
        section_requests -> Integer,
    }
}

diesel::table! {
    counter_journal_type_aggregates (id) {
        id -> Integer,
        lockss_id -> BigInt,
        request_year -> Integer,
        request_month -> Integer,
        is_publisher_involved -> Integer,
        total_requests -> Integer,
        html_requests -> Integer,
        pdf_requests -> Integer,
    }
}

diesel::table! {
    counter_journal_pubyear_aggregates (id) {
        id -> Integer,
        lockss_id -> BigInt,
        request_year -> Integer,
        request_month -> Integer,
        is_publisher_involved -> Integer,
        publication_year -> Text,
        requests -> Integer,
    }
}

diesel::joinable!(counter_requests -> counter_titles (lockss_id));
diesel::joinable!(counter_book_type_aggregates -> counter_titles (lockss_id));
diesel::joinable!(counter_journal_type_aggregates -> counter_titles (lockss_id));
diesel::joinable!(counter_journal_pubyear_aggregates -> counter_titles (lockss_id));

diesel::allow_tables_to_appear_in_same_query!(
    counter_titles,
    counter_requests,
    counter_book_type_aggregates,
    counter_journal_type_aggregates,
    counter_journal_pubyear_aggregates,
);
