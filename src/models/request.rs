//! Typed request payloads recorded for each full-text access.

use serde::{Deserialize, Serialize};

/// Flags for a book request. Missing flags are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookRequest {
    /// A chapter or other section rather than the whole book.
    pub is_section: bool,
    /// The publisher was contacted while serving the request.
    pub is_publisher_involved: bool,
}

/// Flags for a journal request. Missing flags are `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalRequest {
    pub is_html: bool,
    pub is_pdf: bool,
    /// The publisher was contacted while serving the request.
    pub is_publisher_involved: bool,
    /// Publication year of the requested article, as found in its metadata.
    pub publication_year: Option<String>,
}

/// Request payload, one variant per title kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestData {
    Book(BookRequest),
    Journal(JournalRequest),
}

impl RequestData {
    /// All-false payload for a title kind.
    pub fn default_for(is_book: bool) -> Self {
        if is_book {
            RequestData::Book(BookRequest::default())
        } else {
            RequestData::Journal(JournalRequest::default())
        }
    }

    pub fn is_book(&self) -> bool {
        matches!(self, RequestData::Book(_))
    }

    pub fn is_publisher_involved(&self) -> bool {
        match self {
            RequestData::Book(book) => book.is_publisher_involved,
            RequestData::Journal(journal) => journal.is_publisher_involved,
        }
    }
}

impl From<BookRequest> for RequestData {
    fn from(request: BookRequest) -> Self {
        RequestData::Book(request)
    }
}

impl From<JournalRequest> for RequestData {
    fn from(request: JournalRequest) -> Self {
        RequestData::Journal(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flags_default_to_false() {
        let book: BookRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(book, BookRequest::default());

        let journal: JournalRequest = serde_json::from_str(r#"{"is_pdf": true}"#).unwrap();
        assert!(journal.is_pdf);
        assert!(!journal.is_html);
        assert!(!journal.is_publisher_involved);
        assert_eq!(journal.publication_year, None);
    }

    #[test]
    fn test_default_for_kind() {
        assert!(RequestData::default_for(true).is_book());
        assert!(!RequestData::default_for(false).is_book());
        assert!(!RequestData::default_for(false).is_publisher_involved());
    }
}
