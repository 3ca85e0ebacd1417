use anyhow::{anyhow, Result};
use gleaner_common::observability::LogConfig;
use gleaner_config::GleanerConfig;
use gleaner_http::HttpClient;
use gleaner_web::{DelayRange, ExtractOptions, OutputLayout, Pipeline, PipelineOptions, SitemapFilter};
use std::time::Duration;

pub fn log_config(cfg: &GleanerConfig) -> LogConfig {
    LogConfig {
        app_name: "gleaner",
        log_dir: cfg.log.dir.clone(),
        emit_stderr: cfg.log.stderr,
        format: cfg.log.format,
        default_filter: cfg.log.filter.clone(),
    }
}

pub fn build_client(cfg: &GleanerConfig) -> Result<HttpClient> {
    let client = match cfg.http.user_agent.as_deref() {
        Some(ua) => HttpClient::with_user_agent(ua)?,
        None => HttpClient::new()?,
    };
    Ok(client.with_timeout(Duration::from_secs(cfg.http.timeout_secs)))
}

pub fn sitemap_filter(cfg: &GleanerConfig) -> SitemapFilter {
    SitemapFilter::new(cfg.exclude.iter().cloned())
}

pub fn extract_options(cfg: &GleanerConfig) -> ExtractOptions {
    ExtractOptions {
        tags: cfg.tags.clone(),
        min_word_count: cfg.min_word_count,
    }
}

pub fn build_pipeline(cfg: &GleanerConfig) -> Result<Pipeline> {
    let opts = PipelineOptions {
        extract: extract_options(cfg),
        delay: DelayRange::new(cfg.delay.min_secs, cfg.delay.max_secs)?,
        layout: OutputLayout::new(&cfg.output_dir),
    };
    Ok(Pipeline::new(build_client(cfg)?, opts))
}

pub fn require_sitemap(cfg: &GleanerConfig) -> Result<&str> {
    cfg.sitemap_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| anyhow!("no sitemap URL: pass --sitemap or set sitemap_url in the config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn pipeline_reflects_config() {
        let mut cfg = GleanerConfig::default();
        cfg.output_dir = PathBuf::from("scraped");
        cfg.min_word_count = 4;
        cfg.delay.min_secs = 1;
        cfg.delay.max_secs = 1;
        cfg.http.user_agent = Some("gleaner-test".to_string());

        let pipeline = build_pipeline(&cfg).unwrap();
        let opts = pipeline.options();
        assert_eq!(opts.layout, OutputLayout::new("scraped"));
        assert_eq!(opts.extract.min_word_count, 4);
        assert_eq!(opts.delay, DelayRange::new(1, 1).unwrap());
        assert_eq!(pipeline.client().user_agent, "gleaner-test");
        assert_eq!(pipeline.client().default_timeout, Duration::from_secs(15));
    }

    #[test]
    fn missing_sitemap_is_reported() {
        let mut cfg = GleanerConfig::default();
        assert!(require_sitemap(&cfg).is_err());
        cfg.sitemap_url = Some("  ".to_string());
        assert!(require_sitemap(&cfg).is_err());
        cfg.sitemap_url = Some("https://example.com/sitemap.xml".to_string());
        assert_eq!(require_sitemap(&cfg).unwrap(), "https://example.com/sitemap.xml");
    }

    #[test]
    fn filter_uses_configured_excludes() {
        let mut cfg = GleanerConfig::default();
        cfg.exclude = vec!["/tag/".to_string()];
        let filter = sitemap_filter(&cfg);
        assert!(filter.allows("https://example.com/search"));
        assert!(!filter.allows("https://example.com/tag/rust"));
    }
}
