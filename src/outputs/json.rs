//! JSON file persistence.
//!
//! [`JsonStore`] keeps the full list of known items in one pretty-printed
//! JSON array:
//! ```text
//! data/
//! └── news.json
//! ```
//!
//! A file that does not exist yet loads as an empty list. Used as a sink, the
//! store merges each batch into what is already on disk: an item with the same
//! `(source, url)` replaces the stored record, anything else is appended.

use super::Sink;
use crate::error::SinkError;
use crate::models::NewsItem;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Items persisted as a JSON array in a single file.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `items`, creating parent directories as needed.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = items.len()))]
    pub async fn save(&self, items: &[NewsItem]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json).await?;
        info!("Wrote JSON store");
        Ok(())
    }

    /// Read every stored item; a missing file is an empty store.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Vec<NewsItem>, SinkError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No JSON store yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let items: Vec<NewsItem> = serde_json::from_str(&raw)?;
        debug!(count = items.len(), "Loaded JSON store");
        Ok(items)
    }
}

/// Replace stored items that share provenance with an incoming one, append the rest.
fn upsert(stored: &mut Vec<NewsItem>, batch: Vec<NewsItem>) -> (usize, usize) {
    let (mut replaced, mut added) = (0, 0);
    for item in batch {
        match stored
            .iter_mut()
            .find(|existing| existing.provenance() == item.provenance())
        {
            Some(existing) => {
                *existing = item;
                replaced += 1;
            }
            None => {
                stored.push(item);
                added += 1;
            }
        }
    }
    (replaced, added)
}

#[async_trait]
impl Sink for JsonStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn accept(&self, batch: Vec<NewsItem>) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock().await;
        let mut stored = self.load().await?;
        let (replaced, added) = upsert(&mut stored, batch);
        debug!(replaced, added, "Merged batch into JSON store");
        self.save(&stored).await
    }
}
