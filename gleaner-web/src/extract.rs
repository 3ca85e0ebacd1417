//! Heading/paragraph text extraction.
//!
//! Text of every selected element is joined with spaces, then split back
//! into lines; only lines with at least `min_word_count` words survive.

use gleaner_http::{HttpClient, HttpError, RequestOpts};
use scraper::{Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Element names to pull text from, matched in document order.
    pub tags: Vec<String>,
    pub min_word_count: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            tags: vec!["h1".to_string(), "p".to_string()],
            min_word_count: 10,
        }
    }
}

impl ExtractOptions {
    fn selector(&self) -> Option<Selector> {
        let mut names = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if is_element_name(tag) {
                names.push(tag);
            } else {
                tracing::warn!(tag = %tag, "extract.invalid_tag");
            }
        }
        if names.is_empty() {
            return None;
        }
        // One combined selector keeps matches in document order.
        let css = names.join(", ");
        let parsed = match Selector::parse(&css) {
            Ok(sel) => Some(sel),
            Err(err) => {
                tracing::warn!(selector = %css, error = %err, "extract.invalid_tags");
                None
            }
        };
        parsed
    }
}

/// Plain element names only: no classes, ids, attributes or combinators.
fn is_element_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract filtered heading/paragraph text from an HTML document.
///
/// ```
/// use gleaner_web::{extract_text, ExtractOptions};
///
/// let html = "<h1>Title</h1><p>one two three four five</p><div>ignored words here too</div>";
/// let opts = ExtractOptions { min_word_count: 1, ..Default::default() };
/// assert_eq!(extract_text(html, &opts), "Title one two three four five");
/// ```
pub fn extract_text(html: &str, opts: &ExtractOptions) -> String {
    let Some(selector) = opts.selector() else {
        return String::new();
    };
    let document = Html::parse_document(html);
    let joined = document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    filter_lines(&joined, opts.min_word_count)
}

/// Keep `\n`-separated lines with at least `min_words` words, joined by a space.
pub fn filter_lines(text: &str, min_words: usize) -> String {
    text.split('\n')
        .filter(|line| line.split_whitespace().count() >= min_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetch `url` and return its extracted text.
pub async fn scrape_page(
    client: &HttpClient,
    url: &str,
    opts: &ExtractOptions,
) -> Result<String, HttpError> {
    let html = client.get_text(url, RequestOpts::default()).await?;
    Ok(extract_text(&html, opts))
}
