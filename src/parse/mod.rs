//! Text extraction for documents imported into the local corpus store
//!
//! This module handles:
//! - Content type detection from MIME type or extension
//! - HTML to text conversion
//! - Whitespace normalization

use std::path::Path;

/// Content types we can extract text from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension
    pub fn from_extension(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html") | Some("htm") | Some("xhtml") => ContentType::Html,
            Some("md") | Some("markdown") => ContentType::Markdown,
            Some("txt") | Some("text") | Some("csv") | Some("tsv") | Some("rst") => {
                ContentType::PlainText
            }
            _ => ContentType::Unknown,
        }
    }

    /// Detect content type from MIME type
    pub fn from_mime(mime: &str) -> Self {
        let mime_lower = mime.to_lowercase();
        if mime_lower.contains("text/html") || mime_lower.contains("application/xhtml") {
            ContentType::Html
        } else if mime_lower.contains("text/markdown") {
            ContentType::Markdown
        } else if mime_lower.starts_with("text/") {
            ContentType::PlainText
        } else {
            ContentType::Unknown
        }
    }

    /// Detect from both path and optional MIME type
    pub fn detect(path: Option<&Path>, mime: Option<&str>) -> Self {
        // MIME takes precedence for web content
        if let Some(m) = mime {
            let detected = Self::from_mime(m);
            if detected != ContentType::Unknown {
                return detected;
            }
        }

        if let Some(p) = path {
            let detected = Self::from_extension(p);
            if detected != ContentType::Unknown {
                return detected;
            }
            if let Some(guess) = mime_guess::from_path(p).first() {
                return Self::from_mime(guess.essence_str());
            }
        }

        ContentType::Unknown
    }

    pub fn is_supported(self) -> bool {
        self != ContentType::Unknown
    }
}

/// Extract normalized text from raw document bytes
///
/// Returns `None` for binary content.
pub fn extract_text(data: &[u8], content_type: ContentType) -> Option<String> {
    if is_binary_content(data) {
        return None;
    }

    let text = match content_type {
        ContentType::Html => html2text::from_read(data, 80)
            .unwrap_or_else(|_| String::from_utf8_lossy(data).into_owned()),
        ContentType::Markdown | ContentType::PlainText | ContentType::Unknown => {
            String::from_utf8_lossy(data).into_owned()
        }
    };

    Some(normalize_whitespace(&text))
}

/// Check if content appears to be binary
pub fn is_binary_content(data: &[u8]) -> bool {
    // Check for null bytes in the first 8KB
    let check_len = std::cmp::min(data.len(), 8192);
    data[..check_len].iter().any(|&b| b == 0)
}

/// Collapse runs of whitespace, keeping paragraph breaks as a blank line
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_whitespace = true;
    let mut newline_count = 0;

    for c in text.chars() {
        if c.is_whitespace() {
            if c == '\n' {
                newline_count += 1;
            }
            last_was_whitespace = true;
        } else {
            if last_was_whitespace && !result.is_empty() {
                match newline_count {
                    0 => result.push(' '),
                    1 => result.push('\n'),
                    _ => result.push_str("\n\n"),
                }
            }
            newline_count = 0;
            result.push(c);
            last_was_whitespace = false;
        }
    }

    result
}
