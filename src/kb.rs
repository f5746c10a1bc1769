//! Knowledge-base articles: entity, publication status, and the read-only
//! retrieval seam (`ArticleSource`) the triage pipeline consumes.

use std::fmt;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Article identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(Uuid);

impl ArticleId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

/// A knowledge-base article. Immutable during triage; only `published`
/// articles are eligible for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
        status: ArticleStatus,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            bail!("article title must not be empty");
        }
        let now = Utc::now();
        Ok(Self {
            id: ArticleId::generate(),
            title,
            body: body.into(),
            tags,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Convenience constructor for a published article.
    pub fn published(
        title: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Self> {
        Self::new(title, body, tags, ArticleStatus::Published)
    }
}

/// The retrieval seam: anything that can produce a snapshot of the published
/// corpus. The in-memory store implements it; tests may inject failing or
/// canned sources.
pub trait ArticleSource {
    fn published(&self) -> Result<Vec<Article>>;
}

/// In-memory article collection.
#[derive(Debug, Default)]
pub struct ArticleStore {
    inner: Mutex<Vec<Article>>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, article: Article) -> ArticleId {
        let id = article.id;
        let mut v = self.inner.lock().expect("article store mutex poisoned");
        v.push(article);
        id
    }

    pub fn all(&self) -> Vec<Article> {
        let v = self.inner.lock().expect("article store mutex poisoned");
        v.clone()
    }
}

impl ArticleSource for ArticleStore {
    fn published(&self) -> Result<Vec<Article>> {
        let v = self.inner.lock().expect("article store mutex poisoned");
        Ok(v.iter()
            .filter(|a| a.status == ArticleStatus::Published)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_serves_published_only() {
        let store = ArticleStore::new();
        store.insert(Article::published("Refund policy", "body", vec!["billing".into()]).unwrap());
        store.insert(
            Article::new("WIP", "draft body", vec![], ArticleStatus::Draft).unwrap(),
        );

        let published = store.published().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title, "Refund policy");
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn empty_title_rejected() {
        assert!(Article::published("  ", "body", vec![]).is_err());
    }
}
