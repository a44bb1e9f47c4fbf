//! # news_enricher
//!
//! Periodically scrapes Slovenian news sites, enriches the articles with
//! keywords, categories and locations, and delivers them to the log, a JSON
//! file and optionally the news backend.
//!
//! ## Usage
//!
//! ```sh
//! news_enricher --once --store ./data/news.json
//! news_enricher --api-url http://localhost:5001
//! ```
//!
//! Runs until Ctrl-C; the cycle in flight is allowed to finish.

use clap::Parser;
use news_enricher::cli::Cli;
use news_enricher::config::AppConfig;
use news_enricher::nlp::Enricher;
use news_enricher::orchestrator::{Orchestrator, OrchestratorOptions};
use news_enricher::outputs::api::ApiSink;
use news_enricher::outputs::json::JsonStore;
use news_enricher::outputs::{FanoutSink, LogSink, Sink};
use news_enricher::scrapers::{HtmlFetcher, build_adapters};
use news_enricher::utils::ensure_writable_dir;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_enricher starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Configuration ---
    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    args.apply(&mut config.pipeline);
    config.validate()?;

    // Early check: ensure the store directory is writable
    if let Some(dir) = args
        .store
        .as_deref()
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
    {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Store directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    // --- Wiring ---
    let fetcher = HtmlFetcher::new()?;
    let adapters = build_adapters(&config.sources, &fetcher);
    let enricher = Arc::new(Enricher::from_config(&config.enrichment));

    let mut sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(LogSink)];
    if let Some(path) = &args.store {
        let store = JsonStore::new(path);
        info!(path = %store.path().display(), "JSON store enabled");
        sinks.push(Arc::new(store));
    }
    if let Some(base) = &args.api_url {
        let api = ApiSink::new(base)?;
        info!(endpoint = api.endpoint(), "Backend sink enabled");
        sinks.push(Arc::new(api));
    }
    let sink = Arc::new(FanoutSink::new(sinks));
    info!(
        sources = adapters.len(),
        sinks = sink.len(),
        interval_secs = config.pipeline.interval_secs,
        fetch_timeout_secs = config.pipeline.fetch_timeout_secs,
        enrich = config.pipeline.enrich,
        "Pipeline configured"
    );

    let mut orchestrator = Orchestrator::new(
        adapters,
        enricher,
        sink,
        OrchestratorOptions::from(&config.pipeline),
    );

    if args.once {
        let report = orchestrator.run_once().await;
        info!(summary = %report.summary(), "Single cycle done");
        for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
            if let Err(e) = &outcome.result {
                warn!(adapter = %outcome.adapter, error = %e, "Adapter failed");
            }
        }
    } else {
        let handle = orchestrator.start(config.pipeline.interval());
        tokio::signal::ctrl_c().await?;
        info!(state = %handle.state(), "Shutdown requested; finishing current cycle");
        handle.stop();
        let cycles = handle.join().await?;
        info!(cycles, "Periodic run ended");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
