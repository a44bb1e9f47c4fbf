//! YAML configuration: sources, pipeline timings and enrichment resources.
//!
//! The configuration is loaded once at startup and shared read-only for the
//! life of the process. Without `--config` the embedded
//! `config/default.yaml` is used. Any problem here is fatal; nothing after
//! startup can produce a [`ConfigError`].

use crate::error::ConfigError;
use crate::orchestrator::SinkMode;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

const DEFAULT_CONFIG: &str = include_str!("../config/default.yaml");

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// News sources to scrape each cycle.
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub enrichment: EnrichConfig,
}

/// One configured news source.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Name stamped on every item as `source`, and on errors.
    pub name: String,
    pub kind: SourceKind,
}

/// Which site-specific adapter handles a source.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// n1info.si
    N1info,
    /// 24ur.com
    Ur24,
}

/// Cycle timing and wiring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval_secs: u64,
    /// Upper bound on one adapter's fetch.
    pub fetch_timeout_secs: u64,
    /// `false` aggregates raw items without keywords or categories.
    pub enrich: bool,
    pub sink_mode: SinkMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            fetch_timeout_secs: 60,
            enrich: true,
            sink_mode: SinkMode::PerAdapter,
        }
    }
}

impl PipelineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Resources for keyword extraction, categorization and location tagging.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichConfig {
    /// Keywords kept per item.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Also feed the heading to the keyword extractor.
    #[serde(default)]
    pub include_heading: bool,
    /// Suffixes stripped, in order, before lexicon matching. Empty disables stemming.
    #[serde(default)]
    pub stem_suffixes: Vec<String>,
    pub stop_words: Vec<String>,
    /// Category lexicon; earlier entries win ties.
    pub categories: Vec<LexiconEntry>,
    /// Location lexicon; may be empty.
    #[serde(default)]
    pub locations: Vec<LexiconEntry>,
}

fn default_top_k() -> usize {
    10
}

/// One label and the terms that indicate it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LexiconEntry {
    pub label: String,
    pub terms: Vec<String>,
}

impl AppConfig {
    /// Load and validate the config at `path`, or the embedded default when `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml(&raw)?
            }
            None => Self::from_yaml(DEFAULT_CONFIG)?,
        };
        info!(
            sources = config.sources.len(),
            categories = config.enrichment.categories.len(),
            locations = config.enrichment.locations.len(),
            stop_words = config.enrichment.stop_words.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source with empty name".into()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name `{}`",
                    source.name
                )));
            }
        }
        if self.pipeline.interval_secs == 0 {
            return Err(ConfigError::Invalid("pipeline.interval_secs must be > 0".into()));
        }
        if self.pipeline.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.fetch_timeout_secs must be > 0".into(),
            ));
        }
        self.enrichment.validate()
    }
}

impl EnrichConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("enrichment.top_k must be > 0".into()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("category lexicon is empty".into()));
        }
        let mut suffixes = HashSet::new();
        if let Some(dup) = self.stem_suffixes.iter().find(|s| !suffixes.insert(s.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "enrichment.stem_suffixes: duplicate suffix `{dup}`"
            )));
        }
        validate_lexicon("categories", &self.categories)?;
        validate_lexicon("locations", &self.locations)
    }
}

fn validate_lexicon(section: &str, entries: &[LexiconEntry]) -> Result<(), ConfigError> {
    let mut labels = HashSet::new();
    for entry in entries {
        if entry.label.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{section}: empty label")));
        }
        if !labels.insert(entry.label.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{section}: duplicate label `{}`",
                entry.label
            )));
        }
        if entry.terms.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "{section}: label `{}` has no terms",
                entry.label
            )));
        }
    }
    Ok(())
}
