//! Command-line interface definitions for news_enricher.
//!
//! Every flag is optional: without any, the embedded default configuration
//! runs periodic cycles and logs the enriched items. Flags override the
//! matching `pipeline` settings from the YAML config.

use crate::config::PipelineConfig;
use crate::orchestrator::SinkMode;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for news_enricher.
///
/// # Examples
///
/// ```sh
/// # One cycle, stored to a JSON file
/// news_enricher --once --store ./data/news.json
///
/// # Every five minutes, posting to the backend
/// news_enricher --interval-secs 300 --api-url http://localhost:5001
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file replacing the built-in one
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between the end of one cycle and the start of the next
    #[arg(short, long, env = "NEWS_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Per-adapter fetch timeout in seconds
    #[arg(short, long)]
    pub timeout_secs: Option<u64>,

    /// Deliver items per adapter as they arrive, or once per cycle
    #[arg(long, value_enum)]
    pub sink_mode: Option<SinkMode>,

    /// Skip keyword extraction and categorization
    #[arg(long)]
    pub raw: bool,

    /// JSON file the items are merged into
    #[arg(short, long, env = "NEWS_STORE")]
    pub store: Option<PathBuf>,

    /// Base URL of the news backend; items are POSTed to `{url}/api/news`
    #[arg(long, env = "NEWS_API_URL")]
    pub api_url: Option<String>,
}

impl Cli {
    /// Apply the pipeline overrides given on the command line.
    pub fn apply(&self, pipeline: &mut PipelineConfig) {
        if let Some(secs) = self.interval_secs {
            pipeline.interval_secs = secs;
        }
        if let Some(secs) = self.timeout_secs {
            pipeline.fetch_timeout_secs = secs;
        }
        if let Some(mode) = self.sink_mode {
            pipeline.sink_mode = mode;
        }
        if self.raw {
            pipeline.enrich = false;
        }
    }
}
