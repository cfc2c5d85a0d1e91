//! Data models for COUNTER reporting.

mod request;
mod title;

pub use request::{BookRequest, JournalRequest, RequestData};
pub use title::{
    CounterTitle, LockssId, TitleBuilder, TitleKind, ALL_BOOKS_NAME, ALL_JOURNALS_NAME,
};
