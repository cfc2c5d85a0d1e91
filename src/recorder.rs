//! Request recording.
//!
//! Decides whether an access is a countable full-text request, resolves the
//! title it belongs to and persists one raw request row.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::clock::SharedClock;
use crate::error::CounterError;
use crate::models::{BookRequest, CounterTitle, JournalRequest, RequestData, TitleBuilder};
use crate::repository::RequestRepository;

/// Descriptive metadata of the title an archival unit holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleMetadata {
    pub is_book: bool,
    pub name: Option<String>,
    pub publisher: Option<String>,
    pub platform: Option<String>,
    pub doi: Option<String>,
    pub proprietary_id: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub print_issn: Option<String>,
    pub online_issn: Option<String>,
}

impl TitleMetadata {
    /// Build the registry title, failing when the name is blank.
    pub fn to_title(&self) -> Result<CounterTitle, CounterError> {
        let builder = TitleBuilder::with_optional_name(self.is_book, self.name.clone()).optional(
            self.publisher.clone(),
            self.platform.clone(),
            self.doi.clone(),
            self.proprietary_id.clone(),
        );

        let builder = if self.is_book {
            builder.identifiers(self.isbn.clone(), self.issn.clone())
        } else {
            builder.identifiers(self.print_issn.clone(), self.online_issn.clone())
        };

        builder.build()
    }
}

/// A full-text access point registered in an archival unit's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullTextItem {
    /// Book chapter or other part of a book.
    pub is_section: bool,
    pub publication_year: Option<String>,
}

/// The slice of an archival unit the recorder needs.
#[async_trait]
pub trait ArchivalUnit: Send + Sync {
    fn au_id(&self) -> &str;

    fn title_metadata(&self) -> TitleMetadata;

    /// The full-text item served at `url`, if the URL is one.
    async fn full_text_item(&self, url: &str) -> Option<FullTextItem>;

    /// MIME type of the content stored at `url`.
    async fn content_type(&self, url: &str) -> Option<String>;
}

/// Classification of a MIME type for journal requests.
fn classify_content_type(content_type: Option<&str>) -> (bool, bool) {
    let Some(content_type) = content_type else {
        return (false, false);
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => (true, false),
        "application/pdf" => (false, true),
        _ => (false, false),
    }
}

/// Records full-text requests as raw request rows.
#[derive(Clone)]
pub struct RequestRecorder {
    requests: RequestRepository,
    clock: SharedClock,
}

impl RequestRecorder {
    pub fn new(requests: RequestRepository, clock: SharedClock) -> Self {
        Self { requests, clock }
    }

    /// Record an access to `url` if it is a successful full-text request.
    ///
    /// Returns `Ok(false)` when the access is not countable; nothing is written
    /// in that case.
    pub async fn record_access(
        &self,
        url: &str,
        au: &dyn ArchivalUnit,
        publisher_involved: bool,
        http_status: u16,
    ) -> Result<bool, CounterError> {
        if !(200..300).contains(&http_status) {
            trace!("Ignoring {} with status {}", url, http_status);
            return Ok(false);
        }

        let Some(item) = au.full_text_item(url).await else {
            trace!("Ignoring {}: not a full-text URL of {}", url, au.au_id());
            return Ok(false);
        };

        let metadata = au.title_metadata();
        let title = metadata.to_title()?;

        let data = if metadata.is_book {
            RequestData::Book(BookRequest {
                is_section: item.is_section,
                is_publisher_involved: publisher_involved,
            })
        } else {
            let content_type = au.content_type(url).await;
            let (is_html, is_pdf) = classify_content_type(content_type.as_deref());
            JournalRequest {
                is_html,
                is_pdf,
                is_publisher_involved: publisher_involved,
                publication_year: item.publication_year,
            }
            .into()
        };

        self.record_title_request(&title, Some(data)).await?;
        debug!("Recorded request for {} ({})", url, title.name);
        Ok(true)
    }

    /// Register `title` and record one request against it.
    ///
    /// `None` records a request with every flag false.
    pub async fn record_title_request(
        &self,
        title: &CounterTitle,
        data: Option<RequestData>,
    ) -> Result<(), CounterError> {
        let data = data.unwrap_or_else(|| RequestData::default_for(title.is_book()));
        if data.is_book() != title.is_book() {
            return Err(CounterError::invalid(format!(
                "Request data for a {} cannot be recorded against {} '{}'",
                if data.is_book() { "book" } else { "journal" },
                title.kind.as_str(),
                title.name
            )));
        }

        self.requests
            .record(title, &data, self.clock.today())
            .await?;
        Ok(())
    }
}
