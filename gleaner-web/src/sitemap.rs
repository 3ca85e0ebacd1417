//! Sitemap reading.
//!
//! Only elements in the sitemaps.org 0.9 namespace count: every `<url>` at
//! any depth contributes the text of its first direct `<loc>` child.

use gleaner_common::GleanerError;
use gleaner_http::{HttpClient, HttpError, RequestOpts};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;

pub const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to fetch sitemap: {0}")]
    Http(#[from] HttpError),
    #[error("malformed sitemap XML at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

impl From<SitemapError> for GleanerError {
    fn from(err: SitemapError) -> Self {
        GleanerError::Sitemap(err.to_string())
    }
}

/// Substring-based URL exclusion.
///
/// ```
/// use gleaner_web::SitemapFilter;
///
/// let filter = SitemapFilter::default();
/// assert!(filter.allows("https://example.com/docs/intro"));
/// assert!(!filter.allows("https://example.com/search?q=rust"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapFilter {
    pub exclude: Vec<String>,
}

impl Default for SitemapFilter {
    fn default() -> Self {
        Self {
            exclude: vec!["/search".to_string()],
        }
    }
}

impl SitemapFilter {
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// A filter that keeps every URL.
    pub fn allow_all() -> Self {
        Self {
            exclude: Vec::new(),
        }
    }

    pub fn allows(&self, url: &str) -> bool {
        !self
            .exclude
            .iter()
            .any(|needle| !needle.is_empty() && url.contains(needle.as_str()))
    }
}

enum Frame {
    /// A sitemap `<url>`; `slot` is its place in the output, so an outer
    /// entry precedes the entries nested inside it.
    Url { loc: Option<String>, slot: usize },
    /// The first `<loc>` of the enclosing `<url>`. Text after its first
    /// child element is not part of the URL.
    Loc { text: String, sealed: bool },
    Other,
}

fn in_sitemap_ns(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == SITEMAP_NS)
}

fn parent_wants_loc(stack: &[Frame]) -> bool {
    matches!(stack.last(), Some(Frame::Url { loc: None, .. }))
}

fn seal_loc(stack: &mut [Frame]) {
    if let Some(Frame::Loc { sealed, .. }) = stack.last_mut() {
        *sealed = true;
    }
}

fn loc_text(stack: &mut [Frame]) -> Option<&mut String> {
    match stack.last_mut() {
        Some(Frame::Loc {
            text,
            sealed: false,
        }) => Some(text),
        _ => None,
    }
}

fn xml_error<R>(reader: &NsReader<R>, message: impl Into<String>) -> SitemapError {
    SitemapError::Xml {
        position: reader.buffer_position(),
        message: message.into(),
    }
}

/// Document-level well-formedness: exactly one root element, closed, with
/// nothing but markup and whitespace around it.
#[derive(Default)]
struct RootTracker {
    opened: bool,
    closed: bool,
}

impl RootTracker {
    fn open(&mut self) -> Result<(), &'static str> {
        if self.opened {
            return Err("more than one root element");
        }
        self.opened = true;
        Ok(())
    }
}

/// Parse sitemap XML into the list of page URLs, in document order.
///
/// `<url>` entries without a usable `<loc>` are skipped, as are URLs the
/// filter rejects. Duplicates are kept. Empty, truncated or otherwise
/// ill-formed documents are rejected.
pub fn parse_sitemap(xml: &[u8], filter: &SitemapFilter) -> Result<Vec<String>, SitemapError> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = RootTracker::default();
    let mut slots: Vec<Option<String>> = Vec::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.is_empty() {
                    root.open().map_err(|msg| xml_error(&reader, msg))?;
                }
                let (ns, local) = reader.resolve_element(e.name());
                let sitemap_el = in_sitemap_ns(&ns);
                let frame = match local.as_ref() {
                    b"url" if sitemap_el => {
                        slots.push(None);
                        Frame::Url {
                            loc: None,
                            slot: slots.len() - 1,
                        }
                    }
                    b"loc" if sitemap_el && parent_wants_loc(&stack) => Frame::Loc {
                        text: String::new(),
                        sealed: false,
                    },
                    _ => Frame::Other,
                };
                seal_loc(&mut stack);
                stack.push(frame);
            }
            Ok(Event::Empty(e)) => {
                if stack.is_empty() {
                    root.open().map_err(|msg| xml_error(&reader, msg))?;
                    root.closed = true;
                }
                // `<loc/>` still counts as the first loc, just an empty one.
                let (ns, local) = reader.resolve_element(e.name());
                if in_sitemap_ns(&ns) && local.as_ref() == b"loc" {
                    if let Some(Frame::Url { loc: loc @ None, .. }) = stack.last_mut() {
                        *loc = Some(String::new());
                    }
                }
                seal_loc(&mut stack);
            }
            Ok(Event::Text(e)) => {
                if stack.is_empty() {
                    return Err(xml_error(&reader, "text outside the root element"));
                }
                if let Some(text) = loc_text(&mut stack) {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| xml_error(&reader, err.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if stack.is_empty() {
                    return Err(xml_error(&reader, "CDATA outside the root element"));
                }
                if let Some(text) = loc_text(&mut stack) {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                match stack.pop() {
                    Some(Frame::Loc { text, .. }) => {
                        if let Some(Frame::Url { loc: loc @ None, .. }) = stack.last_mut() {
                            *loc = Some(text);
                        }
                    }
                    Some(Frame::Url { loc, slot }) => {
                        let loc = loc.as_deref().map(str::trim).unwrap_or_default();
                        if loc.is_empty() {
                            skipped += 1;
                        } else if filter.allows(loc) {
                            slots[slot] = Some(loc.to_string());
                        } else {
                            tracing::debug!(url = %loc, "sitemap.url.excluded");
                            skipped += 1;
                        }
                    }
                    Some(Frame::Other) => {}
                    None => return Err(xml_error(&reader, "unexpected closing tag")),
                }
                if stack.is_empty() {
                    root.closed = true;
                }
            }
            Ok(Event::Eof) => {
                if !stack.is_empty() {
                    return Err(xml_error(
                        &reader,
                        format!("document ended with {} unclosed element(s)", stack.len()),
                    ));
                }
                if !root.closed {
                    return Err(xml_error(&reader, "no root element"));
                }
                break;
            }
            Ok(_) => {}
            Err(err) => return Err(xml_error(&reader, err.to_string())),
        }
        buf.clear();
    }

    let urls: Vec<String> = slots.into_iter().flatten().collect();
    tracing::debug!(kept = urls.len(), skipped, "sitemap.parsed");
    Ok(urls)
}

/// Fetch `sitemap_url` and return its filtered page URLs.
pub async fn fetch_sitemap_urls(
    client: &HttpClient,
    sitemap_url: &str,
    filter: &SitemapFilter,
) -> Result<Vec<String>, SitemapError> {
    let body = client.get_bytes(sitemap_url, RequestOpts::default()).await?;
    let urls = parse_sitemap(&body, filter)?;
    tracing::info!(sitemap = %sitemap_url, count = urls.len(), "sitemap.fetched");
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sitemap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{body}</urlset>"#
        )
    }

    #[test]
    fn extracts_locs_in_document_order() {
        let xml = sitemap(
            "<url><loc>https://a.test/one</loc><lastmod>2024-01-01</lastmod></url>
             <url><loc>https://a.test/two</loc></url>",
        );
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/one", "https://a.test/two"]);
    }

    #[test]
    fn drops_urls_matching_exclude_substring() {
        let xml = sitemap(
            "<url><loc>https://a.test/search?q=x</loc></url>
             <url><loc>https://a.test/docs</loc></url>",
        );
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/docs"]);

        let all = parse_sitemap(xml.as_bytes(), &SitemapFilter::allow_all()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn skips_url_without_loc_and_empty_loc() {
        let xml = sitemap(
            "<url><lastmod>2024-01-01</lastmod></url>
             <url><loc/></url>
             <url><loc>   </loc></url>
             <url><loc>https://a.test/kept</loc></url>",
        );
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/kept"]);
    }

    #[test]
    fn only_first_loc_counts() {
        let xml = sitemap("<url><loc>https://a.test/first</loc><loc>https://a.test/second</loc></url>");
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/first"]);
    }

    #[test]
    fn ignores_elements_outside_sitemap_namespace() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:img="http://www.google.com/schemas/sitemap-image/1.1">
            <url>
              <loc>https://a.test/page</loc>
              <img:image><img:loc>https://a.test/pic.png</img:loc></img:image>
            </url>
        </urlset>"#;
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/page"]);

        let no_ns = "<urlset><url><loc>https://a.test/x</loc></url></urlset>";
        assert!(parse_sitemap(no_ns.as_bytes(), &SitemapFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn handles_prefixed_namespace_entities_and_cdata() {
        let xml = r#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sm:url><sm:loc>https://a.test/?a=1&amp;b=2</sm:loc></sm:url>
            <sm:url><sm:loc><![CDATA[https://a.test/cdata]]></sm:loc></sm:url>
        </sm:urlset>"#;
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/?a=1&b=2", "https://a.test/cdata"]);
    }

    #[test]
    fn keeps_duplicates() {
        let xml = sitemap(
            "<url><loc>https://a.test/same</loc></url><url><loc>https://a.test/same</loc></url>",
        );
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = sitemap("<url><loc>https://a.test/x</url>");
        let err = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap_err();
        assert!(matches!(err, SitemapError::Xml { .. }));
    }

    fn assert_rejected(xml: &str) {
        let err = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap_err();
        assert!(matches!(err, SitemapError::Xml { .. }), "{xml:?} gave {err}");
    }

    #[test]
    fn empty_and_plain_text_bodies_are_errors() {
        assert_rejected("");
        assert_rejected("   \n");
        assert_rejected("Service Unavailable");
        assert_rejected(r#"<?xml version="1.0"?>"#);
    }

    #[test]
    fn truncated_document_is_an_error() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://a.test/x</loc></url>"#;
        assert_rejected(xml);
    }

    #[test]
    fn second_root_element_is_an_error() {
        let xml = format!(
            "{}{}",
            sitemap("<url><loc>https://a.test/x</loc></url>"),
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://a.test/y</loc></url></urlset>"#
        );
        assert_rejected(&xml);
        assert_rejected("<a/><b/>");
    }

    #[test]
    fn text_around_root_is_an_error() {
        assert_rejected(&format!("{} trailing", sitemap("")));
        assert_rejected(&format!("leading {}", sitemap("")));
    }

    #[test]
    fn empty_root_is_a_valid_document() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#;
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn nested_url_follows_its_parent() {
        let xml = sitemap(
            "<url><loc>https://a.test/outer</loc><url><loc>https://a.test/inner</loc></url></url>
             <url><loc>https://a.test/last</loc></url>",
        );
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(
            urls,
            vec!["https://a.test/outer", "https://a.test/inner", "https://a.test/last"]
        );
    }

    #[test]
    fn loc_text_stops_at_first_child_element() {
        let xml = sitemap(
            "<url><loc>https://a.test/a<b/>tail</loc></url>
             <url><loc>https://a.test/c<i>x</i>tail</loc></url>",
        );
        let urls = parse_sitemap(xml.as_bytes(), &SitemapFilter::default()).unwrap();
        assert_eq!(urls, vec!["https://a.test/a", "https://a.test/c"]);
    }

    #[test]
    fn empty_exclude_entries_do_not_reject_everything() {
        let filter = SitemapFilter::new(["", "/private"]);
        assert!(filter.allows("https://a.test/public"));
        assert!(!filter.allows("https://a.test/private/x"));
    }
}
