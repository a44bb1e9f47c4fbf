//! Lexicon-based classification.
//!
//! A [`Categorizer`] scores every label of its lexicon against an item and
//! returns the best one. The same engine assigns topical categories and,
//! with a location lexicon, the region an article is about.
//!
//! Score of a label = occurrences of its terms in `heading + content`, plus
//! one for every extracted keyword that is itself one of its terms. Terms
//! with several words match as contiguous phrases. Words and terms go through
//! the same [`Stemmer`], so inflected forms still match.
//!
//! A zero best score yields `None`. Equal scores go to the label declared
//! first in configuration.

use crate::config::LexiconEntry;
use crate::models::NewsItem;
use crate::nlp::tokenize::{Stemmer, words};
use std::collections::HashSet;

/// Stemmed terms of one label.
#[derive(Debug, Clone)]
struct CompiledEntry {
    label: String,
    single: HashSet<String>,
    phrases: Vec<Vec<String>>,
}

impl CompiledEntry {
    fn score(&self, tokens: &[String], keywords: &[String]) -> usize {
        let singles = tokens.iter().filter(|t| self.single.contains(*t)).count();
        let phrases: usize = self
            .phrases
            .iter()
            .map(|phrase| {
                tokens
                    .windows(phrase.len())
                    .filter(|w| *w == phrase.as_slice())
                    .count()
            })
            .sum();
        let keyword_hits = keywords.iter().filter(|k| self.single.contains(*k)).count();
        singles + phrases + keyword_hits
    }
}

/// Assigns at most one label per item from an ordered lexicon.
#[derive(Debug, Clone)]
pub struct Categorizer {
    entries: Vec<CompiledEntry>,
    stemmer: Stemmer,
}

impl Categorizer {
    pub fn new(lexicon: &[LexiconEntry], stemmer: Stemmer) -> Self {
        let entries = lexicon
            .iter()
            .map(|entry| {
                let mut single = HashSet::new();
                let mut phrases: Vec<Vec<String>> = Vec::new();
                for term in &entry.terms {
                    let stemmed: Vec<String> =
                        words(term).iter().map(|w| stemmer.stem(w)).collect();
                    match stemmed.len() {
                        0 => {}
                        1 => {
                            single.extend(stemmed);
                        }
                        _ => {
                            if !phrases.contains(&stemmed) {
                                phrases.push(stemmed);
                            }
                        }
                    }
                }
                CompiledEntry {
                    label: entry.label.clone(),
                    single,
                    phrases,
                }
            })
            .collect();
        Self { entries, stemmer }
    }

    /// Labels in priority order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    /// Score of every label for `item`, in priority order.
    pub fn scores(&self, item: &NewsItem, keywords: &[String]) -> Vec<(&str, usize)> {
        let text = format!("{} {}", item.heading, item.content);
        let tokens: Vec<String> = words(&text).iter().map(|w| self.stemmer.stem(w)).collect();
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| self.stemmer.stem(&k.to_lowercase()))
            .collect();

        self.entries
            .iter()
            .map(|entry| (entry.label.as_str(), entry.score(&tokens, &keywords)))
            .collect()
    }

    /// Best label for `item`, or `None` when no term matches.
    pub fn classify(&self, item: &NewsItem, keywords: &[String]) -> Option<String> {
        let mut best: Option<(&str, usize)> = None;
        for (label, score) in self.scores(item, keywords) {
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((label, score));
            }
        }
        best.map(|(label, _)| label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(label: &str, terms: &[&str]) -> LexiconEntry {
        LexiconEntry {
            label: label.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn item(heading: &str, content: &str) -> NewsItem {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        NewsItem::raw("test", "https://example.com/a", heading, content, ts)
    }

    fn categorizer() -> Categorizer {
        Categorizer::new(
            &[
                entry("politics", &["election", "voter", "turnout", "parliament"]),
                entry("business", &["stock", "market", "earnings"]),
                entry("sport", &["match", "league"]),
            ],
            Stemmer::default(),
        )
    }

    #[test]
    fn test_example_items() {
        let c = categorizer();
        let politics = item("", "election results show voter turnout rising");
        let business = item("", "stock market rally continues amid earnings");
        assert_eq!(c.classify(&politics, &[]), Some("politics".to_string()));
        assert_eq!(c.classify(&business, &[]), Some("business".to_string()));
    }

    #[test]
    fn test_no_match_is_none() {
        let c = categorizer();
        assert_eq!(c.classify(&item("Quiet day", "nothing to report"), &[]), None);
        assert_eq!(c.classify(&item("", ""), &[]), None);
    }

    #[test]
    fn test_tie_goes_to_first_declared_label() {
        let c = categorizer();
        let tied = item("", "the election moved the market");
        assert_eq!(c.classify(&tied, &[]), Some("politics".to_string()));

        let reversed = Categorizer::new(
            &[
                entry("business", &["market"]),
                entry("politics", &["election"]),
            ],
            Stemmer::default(),
        );
        assert_eq!(reversed.classify(&tied, &[]), Some("business".to_string()));
    }

    #[test]
    fn test_keywords_break_otherwise_equal_scores() {
        let c = categorizer();
        let tied = item("", "the election moved the market");
        assert_eq!(
            c.classify(&tied, &["market".to_string()]),
            Some("business".to_string())
        );
    }

    #[test]
    fn test_heading_counts() {
        let c = categorizer();
        let doc = item("League final tonight", "the match starts at eight");
        let scores = c.scores(&doc, &[]);
        assert_eq!(scores, vec![("politics", 0), ("business", 0), ("sport", 2)]);
    }

    #[test]
    fn test_phrases_and_stemming() {
        let stemmer = Stemmer::new(&["a", "i", "e", "u", "ji", "je", "ov", "ski", "ni"]);
        let c = Categorizer::new(
            &[
                entry("gospodarstvo", &["borza", "delnica"]),
                entry("politika", &["državni zbor", "vlada"]),
            ],
            stemmer,
        );
        let doc = item(
            "Seja",
            "Poslanci v državnem zboru so vladi naložili nalogo. Državni zbor je glasoval.",
        );
        // `vladi` stems to `vlad`; the phrase matches once in its base form.
        let scores = c.scores(&doc, &[]);
        assert_eq!(scores[1], ("politika", 2));
        assert_eq!(c.classify(&doc, &[]), Some("politika".to_string()));
    }

    #[test]
    fn test_deterministic() {
        let c = categorizer();
        let doc = item("Stocks", "market earnings and a league match");
        let first = c.classify(&doc, &[]);
        for _ in 0..10 {
            assert_eq!(c.classify(&doc, &[]), first);
        }
        assert_eq!(
            c.labels().collect::<Vec<_>>(),
            vec!["politics", "business", "sport"]
        );
    }
}
