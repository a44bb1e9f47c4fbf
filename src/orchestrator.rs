//! Fetch-enrich cycles over every configured source.
//!
//! One cycle spawns a tokio task per adapter. Each task fetches under a
//! timeout and, unless raw mode is selected, enriches its own batch (the
//! batch is the TF-IDF corpus). Results are collected as they complete.
//! A failing, slow or panicking adapter becomes a [`FetchError`] in the
//! [`CycleReport`] and never takes the others down.
//!
//! # Lifecycle
//!
//! ```text
//! Idle → Running → Completed | PartiallyFailed → Idle → ... → Cancelled
//! ```
//!
//! In periodic mode the next cycle starts a fixed delay after the previous
//! one *ends*. A stop request is honoured at the next scheduling point: a
//! cycle already in flight runs to completion, a pending delay is cut short.

use crate::config::PipelineConfig;
use crate::error::{FetchCause, FetchError};
use crate::models::{AdapterOutcome, CycleReport, CycleState, NewsItem};
use crate::nlp::Enricher;
use crate::outputs::Sink;
use crate::scrapers::SourceAdapter;
use chrono::Utc;
use clap::ValueEnum;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, sleep, timeout};
use tracing::{info, instrument, warn};

/// When the sink sees a cycle's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SinkMode {
    /// One batch per successful adapter, delivered as soon as it completes.
    #[default]
    PerAdapter,
    /// One merged batch at the end of the cycle.
    PerCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Upper bound on a single adapter's `fetch()`.
    pub fetch_timeout: Duration,
    /// `false` delivers items exactly as fetched.
    pub enrich: bool,
    pub sink_mode: SinkMode,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for OrchestratorOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout(),
            enrich: config.enrich,
            sink_mode: config.sink_mode,
        }
    }
}

/// Runs fetch-enrich cycles and hands the results to a [`Sink`].
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    enricher: Arc<Enricher>,
    sink: Arc<dyn Sink>,
    options: OrchestratorOptions,
    state: watch::Sender<CycleState>,
    cycles: u64,
}

impl Orchestrator {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        enricher: Arc<Enricher>,
        sink: Arc<dyn Sink>,
        options: OrchestratorOptions,
    ) -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        Self {
            adapters,
            enricher,
            sink,
            options,
            state,
            cycles: 0,
        }
    }

    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    /// Receiver that sees every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one cycle over all adapters and wait for every one of them.
    #[instrument(level = "info", skip_all, fields(cycle = self.cycles + 1))]
    pub async fn run_once(&mut self) -> CycleReport {
        self.cycles += 1;
        let started_at = Utc::now();
        self.state.send_replace(CycleState::Running);
        info!(
            adapters = self.adapters.len(),
            enrich = self.options.enrich,
            sink_mode = ?self.options.sink_mode,
            "Cycle started"
        );

        let t0 = Instant::now();
        let mut tasks: FuturesUnordered<_> = self
            .adapters
            .iter()
            .map(|adapter| {
                let name = adapter.source_name().to_string();
                let enricher = self.options.enrich.then(|| Arc::clone(&self.enricher));
                let handle = tokio::spawn(fetch_and_enrich(
                    Arc::clone(adapter),
                    enricher,
                    self.options.fetch_timeout,
                ));
                async move {
                    match handle.await {
                        Ok((result, elapsed)) => (name, Ok(result), elapsed),
                        Err(e) => (name, Err(e), t0.elapsed()),
                    }
                }
            })
            .collect();

        let mut outcomes = Vec::with_capacity(self.adapters.len());
        let mut merged = Vec::new();
        let mut any_batch = false;

        while let Some((name, joined, elapsed)) = tasks.next().await {
            match flatten_join(&name, joined) {
                Ok(batch) => {
                    info!(
                        adapter = %name,
                        count = batch.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Adapter finished"
                    );
                    outcomes.push(AdapterOutcome {
                        adapter: name,
                        result: Ok(batch.len()),
                        elapsed,
                    });
                    any_batch = true;
                    match self.options.sink_mode {
                        SinkMode::PerAdapter => self.deliver(batch).await,
                        SinkMode::PerCycle => merged.extend(batch),
                    }
                }
                Err(e) => {
                    warn!(
                        adapter = %name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %e,
                        "Adapter failed"
                    );
                    outcomes.push(AdapterOutcome {
                        adapter: name,
                        result: Err(e),
                        elapsed,
                    });
                }
            }
        }

        if self.options.sink_mode == SinkMode::PerCycle && any_batch {
            self.deliver(merged).await;
        }

        let state = if outcomes.iter().all(AdapterOutcome::is_success) {
            CycleState::Completed
        } else {
            CycleState::PartiallyFailed
        };
        self.state.send_replace(state);

        let report = CycleReport {
            cycle: self.cycles,
            started_at,
            finished_at: Utc::now(),
            state,
            outcomes,
        };
        info!(
            state = %state,
            succeeded = report.succeeded(),
            failed = report.failed(),
            items = report.items(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Cycle finished"
        );
        report
    }

    /// Sink errors are logged; they never fail the cycle.
    async fn deliver(&self, batch: Vec<NewsItem>) {
        let count = batch.len();
        if let Err(e) = self.sink.accept(batch).await {
            warn!(sink = self.sink.name(), count, error = %e, "Sink failed to take batch");
        }
    }

    /// Run cycles until `cancel` turns `true` (or its sender is dropped),
    /// waiting `interval` after each cycle ends. Returns the number of
    /// cycles run.
    #[instrument(level = "info", skip_all, fields(interval_secs = interval.as_secs()))]
    pub async fn run_periodic(
        &mut self,
        interval: Duration,
        mut cancel: watch::Receiver<bool>,
    ) -> u64 {
        let mut completed = 0u64;
        loop {
            if *cancel.borrow_and_update() {
                break;
            }
            let report = self.run_once().await;
            completed += 1;
            info!(summary = %report.summary(), "Cycle report");

            if *cancel.borrow_and_update() {
                break;
            }
            self.state.send_replace(CycleState::Idle);
            info!(?interval, "Waiting for next cycle");

            let stopped = tokio::select! {
                _ = sleep(interval) => false,
                _ = stop_requested(&mut cancel) => true,
            };
            if stopped {
                break;
            }
        }

        self.state.send_replace(CycleState::Cancelled);
        info!(cycles = completed, "Periodic run stopped");
        completed
    }

    /// Move the orchestrator onto a background task running periodic cycles.
    pub fn start(mut self, interval: Duration) -> CycleHandle {
        let (cancel, cancel_rx) = watch::channel(false);
        let state = self.subscribe();
        let task = tokio::spawn(async move { self.run_periodic(interval, cancel_rx).await });
        CycleHandle {
            cancel,
            state,
            task,
        }
    }
}

/// Control surface for a running periodic orchestrator.
#[derive(Debug)]
pub struct CycleHandle {
    cancel: watch::Sender<bool>,
    state: watch::Receiver<CycleState>,
    task: JoinHandle<u64>,
}

impl CycleHandle {
    /// Ask the loop to stop. An in-flight cycle still completes.
    pub fn stop(&self) {
        self.cancel.send_replace(true);
    }

    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.clone()
    }

    /// Wait for the loop to end; yields the number of cycles run.
    pub async fn join(self) -> Result<u64, JoinError> {
        self.task.await
    }
}

/// Resolves once a stop is requested or the controlling sender is gone.
async fn stop_requested(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Fetch then enrich, timed from inside the task so sink delivery on the
/// collecting side is never charged to the adapter.
async fn fetch_and_enrich(
    adapter: Arc<dyn SourceAdapter>,
    enricher: Option<Arc<Enricher>>,
    limit: Duration,
) -> (Result<Vec<NewsItem>, FetchError>, Duration) {
    let started = Instant::now();
    let result = fetch_then_enrich(adapter, enricher, limit).await;
    (result, started.elapsed())
}

async fn fetch_then_enrich(
    adapter: Arc<dyn SourceAdapter>,
    enricher: Option<Arc<Enricher>>,
    limit: Duration,
) -> Result<Vec<NewsItem>, FetchError> {
    let batch = match timeout(limit, adapter.fetch()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(FetchError::new(
                adapter.source_name(),
                FetchCause::Timeout(limit),
            ));
        }
    };
    Ok(match enricher {
        Some(enricher) => enricher.enrich(batch),
        None => batch,
    })
}

fn flatten_join(
    adapter: &str,
    joined: Result<Result<Vec<NewsItem>, FetchError>, JoinError>,
) -> Result<Vec<NewsItem>, FetchError> {
    joined.unwrap_or_else(|e| {
        let reason = if e.is_panic() {
            "adapter task panicked".to_string()
        } else {
            e.to_string()
        };
        Err(FetchError::new(adapter, FetchCause::Aborted(reason)))
    })
}
