use clap::{Args, Parser, Subcommand};
use gleaner_common::observability::LogFormat;
use gleaner_config::GleanerConfig;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "gleaner.yaml";

/// Scrape the pages listed in a website's sitemap into plain text files.
#[derive(Debug, Parser)]
#[command(name = "gleaner", version)]
pub struct Cli {
    /// Configuration file. Without this flag `gleaner.yaml` is used when present.
    #[arg(long, global = true, env = "GLEANER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log encoding: text or json.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the sitemap, scrape every page, and write the output files.
    Run(RunArgs),
    /// Print the filtered sitemap URLs, one per line.
    Urls {
        #[arg(long)]
        sitemap: Option<String>,
    },
    /// Print the extracted text of a single page.
    Extract { url: String },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long)]
    pub sitemap: Option<String>,
    /// Output directory for page texts, the mapping, and the URL list.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Skip the pause between pages.
    #[arg(long)]
    pub no_delay: bool,
}

impl Cli {
    /// Fold command-line flags over the loaded configuration.
    pub fn apply_to(&self, cfg: &mut GleanerConfig) {
        if let Some(format) = self.log_format {
            cfg.log.format = format;
        }
        match &self.command {
            Command::Run(args) => {
                if let Some(url) = &args.sitemap {
                    cfg.sitemap_url = Some(url.clone());
                }
                if let Some(out) = &args.out {
                    cfg.output_dir = out.clone();
                }
                if args.no_delay {
                    cfg.delay.min_secs = 0;
                    cfg.delay.max_secs = 0;
                }
            }
            Command::Urls { sitemap } => {
                if let Some(url) = sitemap {
                    cfg.sitemap_url = Some(url.clone());
                }
            }
            Command::Extract { .. } => {}
        }
    }
}
