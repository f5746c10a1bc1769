//! Category keyword lexicon. The built-in table is embedded at compile time
//! and compiled once into per-keyword matchers; category declaration order
//! is significant (classification ties resolve to the first maximum).

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::ticket::Category;

static BUILTIN: Lazy<Arc<Lexicon>> = Lazy::new(|| {
    let raw = include_str!("../triage_lexicon.json");
    Arc::new(Lexicon::from_json_str(raw).expect("valid built-in triage lexicon"))
});

#[derive(Debug, Deserialize)]
struct LexiconEntry {
    category: Category,
    keywords: Vec<String>,
}

/// One keyword with its three compiled matchers. Match weights:
/// whole word 3, word-prefix 2, substring 1 — each counting occurrences.
#[derive(Debug)]
pub struct KeywordMatcher {
    keyword: String,
    exact: Regex,
    prefix: Regex,
    contains: Regex,
}

impl KeywordMatcher {
    fn compile(keyword: &str) -> anyhow::Result<Self> {
        let kw = regex::escape(keyword);
        Ok(Self {
            keyword: keyword.to_string(),
            exact: Regex::new(&format!(r"\b{kw}\b"))?,
            prefix: Regex::new(&format!(r"\b{kw}\w*"))?,
            contains: Regex::new(&format!(r"\w*{kw}\w*"))?,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Weighted occurrence count of this keyword in `text` (expected
    /// lowercase). Zero means no match of any kind.
    pub fn weighted_hits(&self, text: &str) -> u32 {
        let exact = self.exact.find_iter(text).count() as u32;
        let prefix = self.prefix.find_iter(text).count() as u32;
        let contains = self.contains.find_iter(text).count() as u32;
        exact * 3 + prefix * 2 + contains
    }
}

/// Keywords of a single category, in declaration order.
#[derive(Debug)]
pub struct CategoryKeywords {
    category: Category,
    matchers: Vec<KeywordMatcher>,
}

impl CategoryKeywords {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn matchers(&self) -> &[KeywordMatcher] {
        &self.matchers
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Immutable category→keyword table, constructed once and shared by
/// reference into the classifier and retriever.
#[derive(Debug)]
pub struct Lexicon {
    categories: Vec<CategoryKeywords>,
}

impl Lexicon {
    /// The embedded production table (shared, parsed once).
    pub fn builtin() -> Arc<Lexicon> {
        BUILTIN.clone()
    }

    /// Build from a JSON array of `{category, keywords}` entries. Keywords
    /// are lowercased; matching always runs against lowercased ticket text.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let entries: Vec<LexiconEntry> = serde_json::from_str(raw)?;
        let mut categories = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut matchers = Vec::with_capacity(entry.keywords.len());
            for kw in &entry.keywords {
                matchers.push(KeywordMatcher::compile(&kw.to_lowercase())?);
            }
            categories.push(CategoryKeywords {
                category: entry.category,
                matchers,
            });
        }
        Ok(Self { categories })
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> &[CategoryKeywords] {
        &self.categories
    }

    /// Matchers for one category; empty slice when the category carries no
    /// keywords (e.g. `other`).
    pub fn keywords_for(&self, category: Category) -> &[KeywordMatcher] {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.matchers.as_slice())
            .unwrap_or(&[])
    }
}
