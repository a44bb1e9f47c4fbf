//! Data models shared by every stage of the pipeline.
//!
//! - [`NewsItem`]: one article, raw after a fetch and enriched after the
//!   keyword/category/location pass
//! - [`CycleState`]: the orchestrator's state machine
//! - [`CycleReport`] / [`AdapterOutcome`]: what one cycle produced, per adapter
//!
//! `NewsItem` serializes with camelCase field names to match the JSON schema
//! the news backend expects (`publishedAt`, `imageUrl`).

use crate::error::FetchError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A single news article.
///
/// Adapters produce items with empty `tags` and no `category`/`location`;
/// the [`Enricher`](crate::nlp::Enricher) fills those in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// The article headline.
    pub heading: String,
    /// Plain-text article body; the enrichment input.
    pub content: String,
    /// Byline, when the site exposes one.
    #[serde(default)]
    pub author: Option<String>,
    /// Publication time in the site's local time.
    pub published_at: NaiveDateTime,
    /// Name of the adapter that fetched this item.
    pub source: String,
    /// Topical category; `None` means "unknown".
    #[serde(default)]
    pub category: Option<String>,
    /// Region the article is about, when one is detected.
    #[serde(default)]
    pub location: Option<String>,
    /// Canonical article URL, unique within a source.
    pub url: String,
    /// Lead image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Keywords, best first.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewsItem {
    /// Build a raw item as an adapter would, with no enrichment applied.
    pub fn raw(
        source: impl Into<String>,
        url: impl Into<String>,
        heading: impl Into<String>,
        content: impl Into<String>,
        published_at: NaiveDateTime,
    ) -> Self {
        Self {
            heading: heading.into(),
            content: content.into(),
            author: None,
            published_at,
            source: source.into(),
            category: None,
            location: None,
            url: url.into(),
            image_url: None,
            tags: Vec::new(),
        }
    }

    /// `(source, url)` pair identifying where this item came from.
    pub fn provenance(&self) -> (&str, &str) {
        (&self.source, &self.url)
    }

    /// Whether any enrichment output is present.
    pub fn is_enriched(&self) -> bool {
        !self.tags.is_empty() || self.category.is_some() || self.location.is_some()
    }
}

/// Orchestrator lifecycle.
///
/// `Idle → Running → (Completed | PartiallyFailed) → Idle`, or `Cancelled`
/// once a stop signal has been honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Running,
    Completed,
    PartiallyFailed,
    Cancelled,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Idle => "idle",
            CycleState::Running => "running",
            CycleState::Completed => "completed",
            CycleState::PartiallyFailed => "partially failed",
            CycleState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// What one adapter contributed to a cycle.
#[derive(Debug)]
pub struct AdapterOutcome {
    /// The adapter's `source_name()`.
    pub adapter: String,
    /// Number of items delivered, or why the adapter failed.
    pub result: Result<usize, FetchError>,
    /// Wall-clock time spent on fetch and enrichment.
    pub elapsed: Duration,
}

impl AdapterOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of one fetch-enrich cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// 1-based cycle counter for the orchestrator that ran it.
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `Completed` or `PartiallyFailed`.
    pub state: CycleState,
    /// One entry per adapter, in completion order.
    pub outcomes: Vec<AdapterOutcome>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Total items delivered across successful adapters.
    pub fn items(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "cycle {} {}: {}/{} adapters ok, {} failed, {} items",
            self.cycle,
            self.state,
            self.succeeded(),
            self.outcomes.len(),
            self.failed(),
            self.items()
        )
    }
}
