//! TF-IDF keyword extraction over a single batch.
//!
//! The batch passed to [`KeywordExtractor::top_keywords`] is the whole
//! corpus: document frequencies never leak across adapters or cycles.
//!
//! ```text
//! tf(t, d)  = count(t, d) / tokens(d)
//! idf(t)    = ln(N / (1 + df(t)))
//! s(t, d)   = tf(t, d) * idf(t)
//! ```
//!
//! Ties are broken by ascending token so the output is fully deterministic.
//!
//! # Small batches
//!
//! With one document every term has `idf = ln(1/2) < 0`, and with two
//! documents a term unique to one of them has `idf = ln(1) = 0`. When no term
//! of a document scores above zero the document is ranked by raw term
//! frequency instead, so small batches still get meaningful keywords.

use crate::error::ExtractionError;
use crate::models::NewsItem;
use crate::nlp::tokenize::Tokenizer;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Scores tokens of each document against the rest of its batch.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    tokenizer: Tokenizer,
    include_heading: bool,
}

/// Term counts of one document.
struct TermCounts {
    counts: HashMap<String, usize>,
    total: usize,
}

impl TermCounts {
    fn from_tokens(tokens: Vec<String>) -> Self {
        let total = tokens.len();
        let mut counts = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0usize) += 1;
        }
        Self { counts, total }
    }
}

impl KeywordExtractor {
    pub fn new(tokenizer: Tokenizer, include_heading: bool) -> Self {
        Self {
            tokenizer,
            include_heading,
        }
    }

    /// Tokens the extractor sees for `item`.
    pub fn document_tokens(&self, item: &NewsItem) -> Vec<String> {
        if self.include_heading {
            let mut tokens = self.tokenizer.tokenize(&item.heading);
            tokens.extend(self.tokenizer.tokenize(&item.content));
            tokens
        } else {
            self.tokenizer.tokenize(&item.content)
        }
    }

    /// Top `k` keywords for every item of `batch`, index-aligned with it.
    ///
    /// Items without usable tokens get an empty list.
    pub fn top_keywords(&self, batch: &[NewsItem], k: usize) -> Vec<Vec<String>> {
        let docs: Vec<TermCounts> = batch
            .iter()
            .map(|item| TermCounts::from_tokens(self.document_tokens(item)))
            .collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            for term in doc.counts.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = batch.len() as f64;
        batch
            .iter()
            .zip(&docs)
            .map(|(item, doc)| {
                rank_document(item, doc, &document_frequency, n, k).unwrap_or_else(|e| {
                    debug!(error = %e, "Degrading to empty keyword list");
                    Vec::new()
                })
            })
            .collect()
    }
}

fn rank_document(
    item: &NewsItem,
    doc: &TermCounts,
    document_frequency: &HashMap<&str, usize>,
    n: f64,
    k: usize,
) -> Result<Vec<String>, ExtractionError> {
    if doc.total == 0 {
        return Err(ExtractionError::EmptyContent {
            url: item.url.clone(),
        });
    }

    let total = doc.total as f64;
    let mut scored: Vec<(&str, f64)> = doc
        .counts
        .iter()
        .map(|(term, &count)| {
            let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
            let tf = count as f64 / total;
            let idf = (n / (1.0 + df)).ln();
            (term.as_str(), tf * idf)
        })
        .collect();

    if !scored.iter().any(|&(_, score)| score > 0.0) {
        debug!(url = %item.url, "No discriminating terms; ranking by term frequency");
        scored = doc
            .counts
            .iter()
            .map(|(term, &count)| (term.as_str(), count as f64))
            .collect();
    }

    scored.sort_by(|a, b| by_score_then_token(*a, *b));
    Ok(scored
        .into_iter()
        .take(k)
        .map(|(term, _)| term.to_string())
        .collect())
}

fn by_score_then_token(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(url: &str, content: &str) -> NewsItem {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        NewsItem::raw("test", url, "Heading", content, ts)
    }

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::new(
            Tokenizer::new(&["the", "a", "of", "amid", "show", "in", "and"]),
            false,
        )
    }

    #[test]
    fn test_two_document_example() {
        let batch = vec![
            item("a", "election results show voter turnout rising"),
            item("b", "stock market rally continues amid earnings"),
        ];
        let keywords = extractor().top_keywords(&batch, 2);

        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0], vec!["election", "results"]);
        assert_eq!(keywords[1], vec!["continues", "earnings"]);
    }

    #[test]
    fn test_discriminating_terms_rank_first() {
        let batch = vec![
            item("a", "market market election vote"),
            item("b", "market stocks"),
            item("c", "market rally"),
            item("d", "weather forecast"),
        ];
        let keywords = extractor().top_keywords(&batch, 3);

        // `market` appears in three of four documents: idf = ln(4/4) = 0.
        assert_eq!(keywords[0], vec!["election", "vote", "market"]);
        assert_eq!(keywords[1], vec!["stocks", "market"]);
        assert_eq!(keywords[3], vec!["forecast", "weather"]);
    }

    #[test]
    fn test_single_document_falls_back_to_term_frequency() {
        let batch = vec![item("a", "budget vote budget debate budget vote")];
        let keywords = extractor().top_keywords(&batch, 5);
        assert_eq!(keywords, vec![vec!["budget", "vote", "debate"]]);
    }

    #[test]
    fn test_at_most_k_tokens_drawn_from_content() {
        let batch = vec![
            item("a", "The mayor of the city opened a new bridge and a park"),
            item("b", "Rain and wind are expected in the north"),
            item("c", "Parliament passed the budget of the year"),
        ];
        let ex = extractor();
        for k in 1..6 {
            let keywords = ex.top_keywords(&batch, k);
            for (doc, kws) in batch.iter().zip(&keywords) {
                assert!(kws.len() <= k);
                let tokens = ex.document_tokens(doc);
                assert!(kws.iter().all(|kw| tokens.contains(kw)));
            }
        }
    }

    #[test]
    fn test_empty_content_yields_no_keywords() {
        let batch = vec![
            item("a", ""),
            item("b", "the of a"),
            item("c", "storm warning issued"),
        ];
        let keywords = extractor().top_keywords(&batch, 3);
        assert!(keywords[0].is_empty());
        assert!(keywords[1].is_empty());
        assert!(!keywords[2].is_empty());
    }

    #[test]
    fn test_empty_batch() {
        assert!(extractor().top_keywords(&[], 5).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let batch = vec![
            item("a", "zeta alpha gamma beta"),
            item("b", "delta epsilon alpha"),
            item("c", "eta theta"),
        ];
        let ex = extractor();
        let first = ex.top_keywords(&batch, 3);
        for _ in 0..10 {
            assert_eq!(ex.top_keywords(&batch, 3), first);
        }
        assert_eq!(first[0], vec!["beta", "gamma", "zeta"]);
    }

    #[test]
    fn test_heading_included_when_configured() {
        let ex = KeywordExtractor::new(Tokenizer::new(&["the"]), true);
        let mut doc = item("a", "markets fell");
        doc.heading = "The Crash".to_string();
        assert_eq!(ex.document_tokens(&doc), vec!["crash", "markets", "fell"]);
    }
}
