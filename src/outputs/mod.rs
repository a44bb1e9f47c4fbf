//! Sinks: where enriched batches go.
//!
//! The orchestrator hands every batch to one [`Sink`], by value. Several
//! destinations are combined with [`FanoutSink`].
//!
//! # Submodules
//!
//! - [`json`]: [`JsonStore`](json::JsonStore), a JSON file acting as the
//!   persistence collaborator
//! - [`api`]: [`ApiSink`](api::ApiSink), which posts items to the news backend
//!
//! Sinks must return in bounded time; the orchestrator awaits them inline.

pub mod api;
pub mod json;

use crate::error::SinkError;
use crate::models::NewsItem;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Consumer of enriched batches.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Take ownership of one batch.
    async fn accept(&self, batch: Vec<NewsItem>) -> Result<(), SinkError>;
}

/// Logs every item at `info` level.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn accept(&self, batch: Vec<NewsItem>) -> Result<(), SinkError> {
        for (idx, item) in batch.iter().enumerate() {
            info!(
                index = idx + 1,
                source = %item.source,
                heading = %item.heading,
                category = item.category.as_deref().unwrap_or("unknown"),
                location = item.location.as_deref().unwrap_or("-"),
                tags = %item.tags.join(", "),
                url = %item.url,
                published_at = %item.published_at,
                "News item"
            );
        }
        Ok(())
    }
}

/// Keeps every batch in memory, for UI hosts that poll and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<NewsItem>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches received so far, oldest first.
    pub fn batches(&self) -> Vec<Vec<NewsItem>> {
        self.batches
            .lock()
            .map(|b| b.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Remove and return everything received so far.
    pub fn drain(&self) -> Vec<NewsItem> {
        let mut guard = self
            .batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let items = guard.drain(..).flatten().collect();
        items
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn accept(&self, batch: Vec<NewsItem>) -> Result<(), SinkError> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(batch);
        Ok(())
    }
}

/// Delivers each batch to several sinks in order.
///
/// A failing sink does not keep the batch from the others; the first error is
/// returned after all of them have run.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Sink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn accept(&self, batch: Vec<NewsItem>) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.accept(batch.clone()).await {
                warn!(sink = sink.name(), error = %e, "Sink rejected batch");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
