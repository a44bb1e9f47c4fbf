//! Enrichment: keywords, category and location for a batch of items.
//!
//! # Submodules
//!
//! - [`tokenize`]: word splitting, stop words and stemming
//! - [`tfidf`]: per-batch TF-IDF keyword extraction
//! - [`categorizer`]: lexicon scoring for categories and locations
//!
//! [`Enricher`] ties them together. It is pure and synchronous: it never
//! touches the network and never fails. Problems with individual items
//! degrade to empty keywords or a `None` label.

pub mod categorizer;
pub mod tfidf;
pub mod tokenize;

use crate::config::EnrichConfig;
use crate::models::NewsItem;
use categorizer::Categorizer;
use tfidf::KeywordExtractor;
use tokenize::{Stemmer, Tokenizer};
use tracing::{debug, instrument};

/// Applies keyword extraction, categorization and location tagging to a batch.
#[derive(Debug, Clone)]
pub struct Enricher {
    extractor: KeywordExtractor,
    categorizer: Categorizer,
    locator: Categorizer,
    top_k: usize,
}

impl Enricher {
    pub fn from_config(config: &EnrichConfig) -> Self {
        let stemmer = Stemmer::new(&config.stem_suffixes);
        Self {
            extractor: KeywordExtractor::new(
                Tokenizer::new(&config.stop_words),
                config.include_heading,
            ),
            categorizer: Categorizer::new(&config.categories, stemmer.clone()),
            locator: Categorizer::new(&config.locations, stemmer),
            top_k: config.top_k,
        }
    }

    /// Enrich one adapter's batch. The batch is the TF-IDF corpus.
    #[instrument(level = "debug", skip_all, fields(items = batch.len()))]
    pub fn enrich(&self, batch: Vec<NewsItem>) -> Vec<NewsItem> {
        let keywords = self.extractor.top_keywords(&batch, self.top_k);
        batch
            .into_iter()
            .zip(keywords)
            .map(|(item, keywords)| {
                let category = self.categorizer.classify(&item, &keywords);
                let location = self.locator.classify(&item, &keywords);
                debug!(
                    url = %item.url,
                    category = category.as_deref().unwrap_or("unknown"),
                    location = location.as_deref().unwrap_or("-"),
                    tags = keywords.len(),
                    "Enriched item"
                );
                merge(item, keywords, category, location)
            })
            .collect()
    }
}

/// Merge enrichment output into `item` without discarding earlier values.
///
/// New keywords replace the tag list only when there are any; a new label
/// replaces the old one, an absent label keeps it.
pub fn merge(
    mut item: NewsItem,
    keywords: Vec<String>,
    category: Option<String>,
    location: Option<String>,
) -> NewsItem {
    if !keywords.is_empty() {
        item.tags = keywords;
    }
    if category.is_some() {
        item.category = category;
    }
    if location.is_some() {
        item.location = location;
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::NaiveDate;

    fn item(url: &str, content: &str) -> NewsItem {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        NewsItem::raw("test", url, "", content, ts)
    }

    fn enricher() -> Enricher {
        let config = AppConfig::load(None).unwrap();
        Enricher::from_config(&config.enrichment)
    }

    #[test]
    fn test_example_batch() {
        let mut config = AppConfig::load(None).unwrap().enrichment;
        config.top_k = 2;
        let enricher = Enricher::from_config(&config);

        let out = enricher.enrich(vec![
            item("a", "election results show voter turnout rising"),
            item("b", "stock market rally continues amid earnings"),
        ]);

        assert!(out[0].tags.contains(&"election".to_string()));
        assert!(out[1].tags.contains(&"earnings".to_string()));
        assert_eq!(out[0].category.as_deref(), Some("politics"));
        assert_eq!(out[1].category.as_deref(), Some("business"));
    }

    #[test]
    fn test_empty_content_item() {
        let out = enricher().enrich(vec![item("a", "")]);
        assert!(out[0].tags.is_empty());
        assert_eq!(out[0].category, None);
        assert_eq!(out[0].location, None);
    }

    #[test]
    fn test_location_detected() {
        let out = enricher().enrich(vec![
            item("a", "Promet v Mariboru stoji, na Lentu gneča."),
            item("b", "Na Bledu so odprli novo razgledno točko."),
        ]);
        assert_eq!(out[0].location.as_deref(), Some("Maribor"));
        assert_eq!(out[1].location.as_deref(), Some("Gorenjska"));
    }

    #[test]
    fn test_english_lent_is_not_a_location() {
        let out = enricher().enrich(vec![
            item("a", "The bank lent money to the city for new housing."),
            item("b", "Festival Lent se začne v petek na Lentu."),
        ]);
        assert_eq!(out[0].location, None);
        assert_eq!(out[1].location.as_deref(), Some("Maribor"));
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let e = enricher();
        let batch = vec![
            item("a", "Parliament passed the budget after a long election campaign"),
            item("b", "The league match ended in a draw at the stadium"),
            item("c", "Storm and heavy rain expected, forecast says"),
        ];
        let once = e.enrich(batch);
        let twice = e.enrich(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_keeps_existing_values() {
        let mut existing = item("a", "text");
        existing.category = Some("sport".to_string());
        existing.tags = vec!["football".to_string()];

        let merged = merge(existing.clone(), Vec::new(), None, None);
        assert_eq!(merged, existing);

        let replaced = merge(
            existing,
            vec!["league".to_string()],
            Some("general".to_string()),
            Some("Celje".to_string()),
        );
        assert_eq!(replaced.tags, vec!["league"]);
        assert_eq!(replaced.category.as_deref(), Some("general"));
        assert_eq!(replaced.location.as_deref(), Some("Celje"));
    }
}
