//! Sitemap-driven page acquisition.
//!
//! - Sitemap reading and URL filtering (`sitemap`)
//! - Heading/paragraph text extraction from HTML (`extract`)
//! - Flat-file output: page texts, CSV mapping, URL list (`persist`)
//! - The sequential fetch/extract/persist loop (`pipeline`)

pub mod extract;
pub mod persist;
pub mod pipeline;
pub mod sitemap;

pub use extract::{extract_text, scrape_page, ExtractOptions};
pub use persist::{OutputLayout, PersistError, UrlFileMap};
pub use pipeline::{DelayRange, Pipeline, PipelineOptions, ScrapeReport};
pub use sitemap::{fetch_sitemap_urls, parse_sitemap, SitemapError, SitemapFilter};
