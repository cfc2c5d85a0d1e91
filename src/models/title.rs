//! Titles tracked for usage reporting and their LOCKSS identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CounterError;

/// Display name of the books aggregation sink.
pub const ALL_BOOKS_NAME: &str = "Total for all books";

/// Display name of the journals aggregation sink.
pub const ALL_JOURNALS_NAME: &str = "Total for all journals";

/// Identifiers below this value are never produced by hashing.
const RESERVED_ID_LIMIT: i64 = 16;

/// Field separator used in the canonical identity string (ASCII unit separator).
const FIELD_SEPARATOR: char = '\u{1f}';

/// Deterministic 64-bit title identifier.
///
/// Computed from the title's defining fields: the SHA-256 digest of the
/// canonical string `kind␟name␟publisher␟platform␟doi␟proprietary_id␟id1␟id2`
/// is truncated to its first eight bytes (big-endian), masked to a
/// non-negative `i64` and shifted past the reserved range. Absent fields are
/// empty strings. For books `id1`/`id2` are ISBN and ISSN, for journals print
/// and online ISSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockssId(pub i64);

impl LockssId {
    /// Sink row accumulating all book requests.
    pub const ALL_BOOKS: LockssId = LockssId(1);
    /// Sink row accumulating all journal requests.
    pub const ALL_JOURNALS: LockssId = LockssId(2);

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_sink(self) -> bool {
        self == Self::ALL_BOOKS || self == Self::ALL_JOURNALS
    }

    fn from_canonical(canonical: &str) -> Self {
        let digest = Sha256::digest(canonical.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let raw = (u64::from_be_bytes(bytes) & i64::MAX as u64) as i64;
        if raw < RESERVED_ID_LIMIT {
            LockssId(raw + RESERVED_ID_LIMIT)
        } else {
            LockssId(raw)
        }
    }
}

impl fmt::Display for LockssId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Book or journal, with the identifiers specific to each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TitleKind {
    Book {
        isbn: Option<String>,
        issn: Option<String>,
    },
    Journal {
        print_issn: Option<String>,
        online_issn: Option<String>,
    },
}

impl TitleKind {
    pub fn is_book(&self) -> bool {
        matches!(self, TitleKind::Book { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TitleKind::Book { .. } => "book",
            TitleKind::Journal { .. } => "journal",
        }
    }
}

/// A book or journal tracked for usage reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterTitle {
    lockss_id: LockssId,
    pub name: String,
    pub publisher_name: Option<String>,
    pub platform_name: Option<String>,
    pub doi: Option<String>,
    pub proprietary_id: Option<String>,
    pub kind: TitleKind,
}

impl CounterTitle {
    /// The cached LOCKSS identifier.
    pub fn lockss_id(&self) -> LockssId {
        self.lockss_id
    }

    pub fn is_book(&self) -> bool {
        self.kind.is_book()
    }

    /// Recompute the identifier from the defining fields.
    pub fn identify(&self) -> LockssId {
        identify(
            &self.kind,
            &self.name,
            self.publisher_name.as_deref(),
            self.platform_name.as_deref(),
            self.doi.as_deref(),
            self.proprietary_id.as_deref(),
        )
    }

    /// The synthetic title that accumulates every book request.
    pub fn all_books() -> Self {
        Self {
            lockss_id: LockssId::ALL_BOOKS,
            name: ALL_BOOKS_NAME.to_string(),
            publisher_name: None,
            platform_name: None,
            doi: None,
            proprietary_id: None,
            kind: TitleKind::Book {
                isbn: None,
                issn: None,
            },
        }
    }

    /// The synthetic title that accumulates every journal request.
    pub fn all_journals() -> Self {
        Self {
            lockss_id: LockssId::ALL_JOURNALS,
            name: ALL_JOURNALS_NAME.to_string(),
            publisher_name: None,
            platform_name: None,
            doi: None,
            proprietary_id: None,
            kind: TitleKind::Journal {
                print_issn: None,
                online_issn: None,
            },
        }
    }

    /// Rebuild a title from persisted columns without re-hashing.
    pub(crate) fn from_parts(
        lockss_id: LockssId,
        name: String,
        publisher_name: Option<String>,
        platform_name: Option<String>,
        doi: Option<String>,
        proprietary_id: Option<String>,
        kind: TitleKind,
    ) -> Self {
        Self {
            lockss_id,
            name,
            publisher_name,
            platform_name,
            doi,
            proprietary_id,
            kind,
        }
    }
}

fn identify(
    kind: &TitleKind,
    name: &str,
    publisher: Option<&str>,
    platform: Option<&str>,
    doi: Option<&str>,
    proprietary_id: Option<&str>,
) -> LockssId {
    let (id1, id2) = match kind {
        TitleKind::Book { isbn, issn } => (isbn.as_deref(), issn.as_deref()),
        TitleKind::Journal {
            print_issn,
            online_issn,
        } => (print_issn.as_deref(), online_issn.as_deref()),
    };

    let fields = [
        Some(kind.as_str()),
        Some(name),
        publisher,
        platform,
        doi,
        proprietary_id,
        id1,
        id2,
    ];

    let mut canonical = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            canonical.push(FIELD_SEPARATOR);
        }
        canonical.push_str(field.unwrap_or(""));
    }

    LockssId::from_canonical(&canonical)
}

/// Builder for [`CounterTitle`]; `build` validates the name and computes the id.
#[derive(Debug, Clone, Default)]
pub struct TitleBuilder {
    is_book: bool,
    name: Option<String>,
    publisher_name: Option<String>,
    platform_name: Option<String>,
    doi: Option<String>,
    proprietary_id: Option<String>,
    first_id: Option<String>,
    second_id: Option<String>,
}

impl TitleBuilder {
    pub fn book(name: impl Into<String>) -> Self {
        Self {
            is_book: true,
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn journal(name: impl Into<String>) -> Self {
        Self {
            is_book: false,
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Start a builder whose name may be absent (metadata lookups).
    pub fn with_optional_name(is_book: bool, name: Option<String>) -> Self {
        Self {
            is_book,
            name,
            ..Default::default()
        }
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher_name = Some(publisher.into());
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn proprietary_id(mut self, id: impl Into<String>) -> Self {
        self.proprietary_id = Some(id.into());
        self
    }

    /// ISBN for books. Ignored for journals.
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        if self.is_book {
            self.first_id = Some(isbn.into());
        }
        self
    }

    /// ISSN for books. Ignored for journals.
    pub fn issn(mut self, issn: impl Into<String>) -> Self {
        if self.is_book {
            self.second_id = Some(issn.into());
        }
        self
    }

    /// Print ISSN for journals. Ignored for books.
    pub fn print_issn(mut self, issn: impl Into<String>) -> Self {
        if !self.is_book {
            self.first_id = Some(issn.into());
        }
        self
    }

    /// Online ISSN for journals. Ignored for books.
    pub fn online_issn(mut self, issn: impl Into<String>) -> Self {
        if !self.is_book {
            self.second_id = Some(issn.into());
        }
        self
    }

    /// Apply optional fields in one go, skipping `None`s.
    pub fn optional(
        mut self,
        publisher: Option<String>,
        platform: Option<String>,
        doi: Option<String>,
        proprietary_id: Option<String>,
    ) -> Self {
        self.publisher_name = publisher.or(self.publisher_name);
        self.platform_name = platform.or(self.platform_name);
        self.doi = doi.or(self.doi);
        self.proprietary_id = proprietary_id.or(self.proprietary_id);
        self
    }

    pub fn identifiers(mut self, first: Option<String>, second: Option<String>) -> Self {
        self.first_id = first.or(self.first_id);
        self.second_id = second.or(self.second_id);
        self
    }

    pub fn build(self) -> Result<CounterTitle, CounterError> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(CounterError::invalid("Title name cannot be null or blank.")),
        };

        let kind = if self.is_book {
            TitleKind::Book {
                isbn: self.first_id,
                issn: self.second_id,
            }
        } else {
            TitleKind::Journal {
                print_issn: self.first_id,
                online_issn: self.second_id,
            }
        };

        let lockss_id = identify(
            &kind,
            &name,
            self.publisher_name.as_deref(),
            self.platform_name.as_deref(),
            self.doi.as_deref(),
            self.proprietary_id.as_deref(),
        );

        Ok(CounterTitle {
            lockss_id,
            name,
            publisher_name: self.publisher_name,
            platform_name: self.platform_name,
            doi: self.doi,
            proprietary_id: self.proprietary_id,
            kind,
        })
    }
}
