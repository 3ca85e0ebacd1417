use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, DEFAULT_CONFIG_FILE};
use gleaner_common::observability::init_logging;
use gleaner_config::{GleanerConfig, GleanerConfigLoader};
use gleaner_web::{fetch_sitemap_urls, scrape_page};

mod cli;
mod wiring;

fn load_config(cli: &Cli) -> Result<GleanerConfig> {
    let loader = match &cli.config {
        Some(path) => GleanerConfigLoader::new().with_file(path),
        None => GleanerConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.load()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over file, flags win over both)
    let mut cfg = load_config(&cli)?;
    cli.apply_to(&mut cfg);
    cfg.validate().map_err(anyhow::Error::msg)?;

    let log_path = init_logging(wiring::log_config(&cfg))?;
    tracing::debug!(log_file = %log_path.display(), "logging.ready");

    match &cli.command {
        Command::Run(_) => {
            let sitemap = wiring::require_sitemap(&cfg)?;
            let pipeline = wiring::build_pipeline(&cfg)?;
            let report = pipeline.run(sitemap, &wiring::sitemap_filter(&cfg)).await?;
            println!(
                "{} of {} pages written to {} ({} fetch failures, {} write failures)",
                report.written,
                report.total,
                cfg.output_dir.display(),
                report.fetch_failures,
                report.write_failures
            );
        }
        Command::Urls { .. } => {
            let sitemap = wiring::require_sitemap(&cfg)?;
            let client = wiring::build_client(&cfg)?;
            let urls = fetch_sitemap_urls(&client, sitemap, &wiring::sitemap_filter(&cfg)).await?;
            for url in urls {
                println!("{url}");
            }
        }
        Command::Extract { url } => {
            let client = wiring::build_client(&cfg)?;
            let text = scrape_page(&client, url, &wiring::extract_options(&cfg)).await?;
            println!("{text}");
        }
    }

    Ok(())
}
