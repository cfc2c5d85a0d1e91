//! Cell formatting shared by all reports.

use super::ReportFormat;

/// Hyphenate an ISBN as `abc-defghi-rest`; short values pass through.
pub fn format_isbn(isbn: &str) -> String {
    if isbn.chars().count() > 9 {
        let chars: Vec<char> = isbn.chars().collect();
        format!(
            "{}-{}-{}",
            chars[..3].iter().collect::<String>(),
            chars[3..9].iter().collect::<String>(),
            chars[9..].iter().collect::<String>()
        )
    } else {
        isbn.to_string()
    }
}

/// Hyphenate an ISSN as `abcd-rest`; short values pass through.
pub fn format_issn(issn: &str) -> String {
    if issn.chars().count() > 4 {
        let split = issn.char_indices().nth(4).map(|(i, _)| i).unwrap_or(issn.len());
        format!("{}-{}", &issn[..split], &issn[split..])
    } else {
        issn.to_string()
    }
}

/// A text cell: double-quoted in CSV when non-empty, verbatim in TSV.
pub(crate) fn text_cell(value: Option<&str>, format: ReportFormat) -> String {
    match (value, format) {
        (Some(text), ReportFormat::Csv) if !text.is_empty() => {
            format!("\"{}\"", text.replace('"', "\"\""))
        }
        (Some(text), ReportFormat::Tsv) => text.replace(['\t', '\n'], " "),
        (Some(text), ReportFormat::Csv) => text.to_string(),
        (None, _) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn_and_issn() {
        assert_eq!(format_isbn("9876543210987"), "987-654321-0987");
        assert_eq!(format_isbn("123456789"), "123456789");
        assert_eq!(format_issn("12345678"), "1234-5678");
        assert_eq!(format_issn("1234"), "1234");
    }

    #[test]
    fn test_text_cell() {
        assert_eq!(text_cell(Some("Book1"), ReportFormat::Csv), "\"Book1\"");
        assert_eq!(text_cell(Some("Say \"hi\""), ReportFormat::Csv), "\"Say \"\"hi\"\"\"");
        assert_eq!(text_cell(Some(""), ReportFormat::Csv), "");
        assert_eq!(text_cell(None, ReportFormat::Csv), "");
        assert_eq!(text_cell(Some("Book1"), ReportFormat::Tsv), "Book1");
    }
}
