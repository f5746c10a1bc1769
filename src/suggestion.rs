//! Machine suggestions produced by a triage run: predicted category, ranked
//! article references, the drafted reply, confidence, provenance, and the
//! (single, replaceable) feedback sub-record.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kb::ArticleId;
use crate::ticket::{Category, TicketId, UserId};

pub const MAX_DRAFT_CHARS: usize = 2000;
pub const MAX_FEEDBACK_COMMENT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(Uuid);

impl SuggestionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Provenance metadata. Informational only; never consulted by decisioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub prompt_version: String,
    pub latency_ms: i64,
}

impl ModelInfo {
    /// The built-in keyword matcher identifies itself with these values.
    pub fn keyword_matcher(latency_ms: i64) -> Self {
        Self {
            provider: "enhanced-stub".to_string(),
            model: "keyword-matcher-v2".to_string(),
            prompt_version: "2.0".to_string(),
            latency_ms,
        }
    }
}

/// Reviewer feedback attached to a suggestion. Resubmission replaces the
/// whole record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub helpful: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_by: UserId,
    pub submitted_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(helpful: Option<bool>, comment: Option<String>, submitted_by: UserId) -> Result<Self> {
        if let Some(c) = &comment {
            if c.chars().count() > MAX_FEEDBACK_COMMENT_CHARS {
                bail!("feedback comment exceeds {MAX_FEEDBACK_COMMENT_CHARS} characters");
            }
        }
        Ok(Self {
            helpful,
            comment,
            submitted_by,
            submitted_at: Utc::now(),
        })
    }
}

/// One suggestion per triage run. After creation, only `auto_closed` (set by
/// the orchestrator's decision step) and `feedback` ever change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub ticket_id: TicketId,
    pub predicted_category: Category,
    pub article_ids: Vec<ArticleId>,
    pub draft_reply: String,
    pub citations: Vec<ArticleId>,
    pub confidence: f32,
    pub auto_closed: bool,
    pub model_info: ModelInfo,
    pub match_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticket_id: TicketId,
        predicted_category: Category,
        article_ids: Vec<ArticleId>,
        draft_reply: String,
        citations: Vec<ArticleId>,
        confidence: f32,
        model_info: ModelInfo,
        match_reasons: Vec<String>,
    ) -> Result<Self> {
        if draft_reply.chars().count() > MAX_DRAFT_CHARS {
            bail!("draft reply exceeds {MAX_DRAFT_CHARS} characters");
        }
        if !(0.0..=1.0).contains(&confidence) {
            bail!("confidence {confidence} outside [0, 1]");
        }
        Ok(Self {
            id: SuggestionId::generate(),
            ticket_id,
            predicted_category,
            article_ids,
            draft_reply,
            citations,
            confidence,
            auto_closed: false,
            model_info,
            match_reasons,
            feedback: None,
            created_at: Utc::now(),
        })
    }
}

/// In-memory suggestion collection, keyed by owning ticket (at most one
/// suggestion per ticket).
#[derive(Debug, Default)]
pub struct SuggestionStore {
    inner: Mutex<HashMap<TicketId, Suggestion>>,
}

impl SuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, suggestion: Suggestion) {
        let mut map = self.inner.lock().expect("suggestion store mutex poisoned");
        map.insert(suggestion.ticket_id, suggestion);
    }

    pub fn for_ticket(&self, ticket: TicketId) -> Option<Suggestion> {
        let map = self.inner.lock().expect("suggestion store mutex poisoned");
        map.get(&ticket).cloned()
    }

    pub fn update<F>(&self, ticket: TicketId, mutate: F) -> Result<Suggestion>
    where
        F: FnOnce(&mut Suggestion),
    {
        let mut map = self.inner.lock().expect("suggestion store mutex poisoned");
        let Some(s) = map.get_mut(&ticket) else {
            bail!("no suggestion for ticket {ticket}");
        };
        mutate(s);
        Ok(s.clone())
    }
}
