//! Diesel record types for the COUNTER tables.

use diesel::prelude::*;

use crate::models::{CounterTitle, LockssId, TitleKind};
use crate::schema::{
    counter_book_type_aggregates, counter_journal_pubyear_aggregates,
    counter_journal_type_aggregates, counter_requests, counter_titles,
};

use super::util::{from_flag, to_flag};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = counter_titles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TitleRecord {
    pub lockss_id: i64,
    pub name: String,
    pub publisher_name: Option<String>,
    pub platform_name: Option<String>,
    pub doi: Option<String>,
    pub proprietary_id: Option<String>,
    pub is_book: i32,
    pub isbn: Option<String>,
    pub book_issn: Option<String>,
    pub print_issn: Option<String>,
    pub online_issn: Option<String>,
}

impl From<TitleRecord> for CounterTitle {
    fn from(record: TitleRecord) -> Self {
        let kind = if from_flag(record.is_book) {
            TitleKind::Book {
                isbn: record.isbn,
                issn: record.book_issn,
            }
        } else {
            TitleKind::Journal {
                print_issn: record.print_issn,
                online_issn: record.online_issn,
            }
        };

        CounterTitle::from_parts(
            LockssId(record.lockss_id),
            record.name,
            record.publisher_name,
            record.platform_name,
            record.doi,
            record.proprietary_id,
            kind,
        )
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counter_titles)]
pub struct NewTitle<'a> {
    pub lockss_id: i64,
    pub name: &'a str,
    pub publisher_name: Option<&'a str>,
    pub platform_name: Option<&'a str>,
    pub doi: Option<&'a str>,
    pub proprietary_id: Option<&'a str>,
    pub is_book: i32,
    pub isbn: Option<&'a str>,
    pub book_issn: Option<&'a str>,
    pub print_issn: Option<&'a str>,
    pub online_issn: Option<&'a str>,
}

impl<'a> From<&'a CounterTitle> for NewTitle<'a> {
    fn from(title: &'a CounterTitle) -> Self {
        let (isbn, book_issn, print_issn, online_issn) = match &title.kind {
            TitleKind::Book { isbn, issn } => (isbn.as_deref(), issn.as_deref(), None, None),
            TitleKind::Journal {
                print_issn,
                online_issn,
            } => (None, None, print_issn.as_deref(), online_issn.as_deref()),
        };

        NewTitle {
            lockss_id: title.lockss_id().value(),
            name: &title.name,
            publisher_name: title.publisher_name.as_deref(),
            platform_name: title.platform_name.as_deref(),
            doi: title.doi.as_deref(),
            proprietary_id: title.proprietary_id.as_deref(),
            is_book: to_flag(title.is_book()),
            isbn,
            book_issn,
            print_issn,
            online_issn,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = counter_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RequestRecord {
    pub id: i32,
    pub lockss_id: i64,
    pub is_book: i32,
    pub is_section: i32,
    pub is_html: i32,
    pub is_pdf: i32,
    pub is_publisher_involved: i32,
    pub publication_year: Option<String>,
    pub request_year: i32,
    pub request_month: i32,
    pub request_day: i32,
    pub in_aggregation: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counter_requests)]
pub struct NewRequest<'a> {
    pub lockss_id: i64,
    pub is_book: i32,
    pub is_section: i32,
    pub is_html: i32,
    pub is_pdf: i32,
    pub is_publisher_involved: i32,
    pub publication_year: Option<&'a str>,
    pub request_year: i32,
    pub request_month: i32,
    pub request_day: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = counter_book_type_aggregates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookTypeAggregateRecord {
    pub id: i32,
    pub lockss_id: i64,
    pub request_year: i32,
    pub request_month: i32,
    pub is_publisher_involved: i32,
    pub full_requests: i32,
    pub section_requests: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counter_book_type_aggregates)]
pub struct NewBookTypeAggregate {
    pub lockss_id: i64,
    pub request_year: i32,
    pub request_month: i32,
    pub is_publisher_involved: i32,
    pub full_requests: i32,
    pub section_requests: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = counter_journal_type_aggregates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JournalTypeAggregateRecord {
    pub id: i32,
    pub lockss_id: i64,
    pub request_year: i32,
    pub request_month: i32,
    pub is_publisher_involved: i32,
    pub total_requests: i32,
    pub html_requests: i32,
    pub pdf_requests: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counter_journal_type_aggregates)]
pub struct NewJournalTypeAggregate {
    pub lockss_id: i64,
    pub request_year: i32,
    pub request_month: i32,
    pub is_publisher_involved: i32,
    pub total_requests: i32,
    pub html_requests: i32,
    pub pdf_requests: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = counter_journal_pubyear_aggregates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JournalPubYearAggregateRecord {
    pub id: i32,
    pub lockss_id: i64,
    pub request_year: i32,
    pub request_month: i32,
    pub is_publisher_involved: i32,
    pub publication_year: String,
    pub requests: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counter_journal_pubyear_aggregates)]
pub struct NewJournalPubYearAggregate<'a> {
    pub lockss_id: i64,
    pub request_year: i32,
    pub request_month: i32,
    pub is_publisher_involved: i32,
    pub publication_year: &'a str,
    pub requests: i32,
}
