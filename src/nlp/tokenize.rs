//! Tokenization and stemming shared by the keyword extractor and the
//! lexicon classifiers.
//!
//! Text is lower-cased, every run of non-letter characters becomes a single
//! space, and the result is split on whitespace. Letters are Unicode letters,
//! so `č`, `š` and `ž` survive while digits and punctuation do not.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\s]+").unwrap());

/// Lower-cased words of `text`, stop words included.
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_LETTERS
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Splits text into words and drops configured stop words.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stop_words: HashSet<String>,
}

impl Tokenizer {
    pub fn new<S: AsRef<str>>(stop_words: &[S]) -> Self {
        Self {
            stop_words: stop_words
                .iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        words(text)
            .into_iter()
            .filter(|w| !self.is_stop_word(w))
            .collect()
    }
}

/// Suffix-stripping stemmer for inflected languages.
///
/// Each configured suffix is tried once, in order, and removed when present.
/// A word is never cut below two characters.
#[derive(Debug, Clone, Default)]
pub struct Stemmer {
    suffixes: Vec<String>,
}

const MIN_STEM_CHARS: usize = 2;

impl Stemmer {
    pub fn new<S: AsRef<str>>(suffixes: &[S]) -> Self {
        Self {
            suffixes: suffixes
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn stem(&self, word: &str) -> String {
        let mut stem = word.to_string();
        for suffix in &self.suffixes {
            let keep = match stem.strip_suffix(suffix.as_str()) {
                Some(rest) if rest.chars().count() >= MIN_STEM_CHARS => rest.len(),
                _ => continue,
            };
            stem.truncate(keep);
        }
        stem
    }
}
