//! The sequential sitemap → pages → files loop.
//!
//! A page that cannot be fetched or written is logged and skipped; the run
//! only aborts when the sitemap itself or the URL list cannot be produced.

use crate::extract::{scrape_page, ExtractOptions};
use crate::persist::{write_mapping, write_page, write_url_list, OutputLayout, UrlFileMap};
use crate::sitemap::{fetch_sitemap_urls, SitemapFilter};
use gleaner_common::{GleanerError, Result};
use gleaner_http::HttpClient;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Inclusive range of whole seconds to pause after each fetched page.
///
/// ```
/// use gleaner_web::DelayRange;
///
/// assert!(DelayRange::new(3, 7).is_ok());
/// assert!(DelayRange::new(7, 3).is_err());
/// assert!(DelayRange::none().is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_secs: u64,
    max_secs: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 3,
            max_secs: 7,
        }
    }
}

impl DelayRange {
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self> {
        if max_secs < min_secs {
            return Err(GleanerError::Config(format!(
                "delay max ({max_secs}s) is smaller than min ({min_secs}s)"
            )));
        }
        Ok(Self { min_secs, max_secs })
    }

    pub fn none() -> Self {
        Self {
            min_secs: 0,
            max_secs: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.max_secs == 0
    }

    pub fn sample(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub extract: ExtractOptions,
    pub delay: DelayRange,
    pub layout: OutputLayout,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub total: usize,
    pub written: usize,
    pub fetch_failures: usize,
    pub write_failures: usize,
    pub mapping_written: bool,
    pub mapping: UrlFileMap,
}

pub struct Pipeline {
    client: HttpClient,
    opts: PipelineOptions,
}

impl Pipeline {
    pub fn new(client: HttpClient, opts: PipelineOptions) -> Self {
        Self { client, opts }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    /// Read the sitemap, then scrape and persist every URL it lists.
    pub async fn run(&self, sitemap_url: &str, filter: &SitemapFilter) -> Result<ScrapeReport> {
        let urls = fetch_sitemap_urls(&self.client, sitemap_url, filter).await?;
        self.save_to_files(&urls).await
    }

    /// Scrape each URL in order and write its text, the mapping, and the URL list.
    pub async fn save_to_files(&self, urls: &[String]) -> Result<ScrapeReport> {
        let layout = &self.opts.layout;
        layout.ensure_dir()?;
        let list_path = write_url_list(layout, urls)?;
        tracing::info!(path = %list_path.display(), count = urls.len(), "pipeline.url_list.written");

        let mut report = ScrapeReport {
            total: urls.len(),
            ..Default::default()
        };

        for (idx, url) in urls.iter().enumerate() {
            let text = match scrape_page(&self.client, url, &self.opts.extract).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(idx, url = %url, error = %err, "pipeline.scrape.failed");
                    report.fetch_failures += 1;
                    continue;
                }
            };

            match write_page(layout, idx, &text) {
                Ok(path) => {
                    tracing::info!(idx, url = %url, path = %path.display(), "pipeline.page.written");
                    report.mapping.insert(url.as_str(), path);
                    report.written += 1;
                }
                Err(err) => {
                    tracing::warn!(idx, url = %url, error = %err, "pipeline.page.write_failed");
                    report.write_failures += 1;
                }
            }

            if !self.opts.delay.is_zero() {
                let pause = self.opts.delay.sample();
                tracing::debug!(pause_secs = pause.as_secs(), "pipeline.delay");
                sleep(pause).await;
            }
        }

        match write_mapping(layout, &report.mapping) {
            Ok(path) => {
                report.mapping_written = true;
                tracing::info!(
                    path = %path.display(),
                    rows = report.mapping.len(),
                    "pipeline.mapping.written"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "pipeline.mapping.write_failed");
            }
        }

        tracing::info!(
            total = report.total,
            written = report.written,
            fetch_failures = report.fetch_failures,
            write_failures = report.write_failures,
            "pipeline.finished"
        );
        Ok(report)
    }
}
