//! # news_enricher
//!
//! Fetches Slovenian news articles from several sources concurrently,
//! enriches each item with TF-IDF keywords, a topical category and a
//! location, and hands the results to pluggable sinks.
//!
//! ## Architecture
//!
//! 1. **Fetching**: every [`SourceAdapter`](scrapers::SourceAdapter) runs in
//!    its own task, under a timeout
//! 2. **Enrichment**: [`Enricher`](nlp::Enricher) treats each adapter's batch
//!    as a TF-IDF corpus, then scores category and location lexicons
//! 3. **Delivery**: the [`Orchestrator`](orchestrator::Orchestrator) hands
//!    batches to a [`Sink`](outputs::Sink) (log, JSON file, backend API)
//!
//! Cycles repeat on a fixed delay until stopped through a
//! [`CycleHandle`](orchestrator::CycleHandle).

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod nlp;
pub mod orchestrator;
pub mod outputs;
pub mod scrapers;
pub mod utils;
