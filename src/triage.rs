//! # Triage orchestrator
//! Sequences classification → retrieval → drafting → confidence fusion →
//! auto-close decision for one ticket, persisting the suggestion and
//! appending an audit entry after every step.
//!
//! Runs are decoupled from ticket creation: `spawn` submits a detached task
//! and hands no handle back. Any failure is caught at the run boundary,
//! recorded as a single `TRIAGE_ERROR` entry, and never retried; the ticket
//! keeps whatever status it reached.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde_json::json;
use tracing::{info, warn};

use crate::audit::{excerpt, Actor, AuditAction, AuditTrail};
use crate::classifier::{classify, CONFIDENCE_CEILING};
use crate::composer::compose;
use crate::config::ConfigHandle;
use crate::kb::ArticleSource;
use crate::lexicon::Lexicon;
use crate::retrieval::{normalized_mean_relevance, retrieve, RankedArticle};
use crate::suggestion::{ModelInfo, Suggestion, SuggestionStore};
use crate::ticket::{TicketId, TicketStatus, TicketStore, TraceId};

/// Weight of the normalized mean article relevance in confidence fusion.
pub const ARTICLE_RELEVANCE_WEIGHT: f32 = 0.1;

/// One-time metrics registration (so series show up on an exporter).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("triage_runs_total", "Triage runs started.");
        describe_counter!("triage_auto_closed_total", "Tickets auto-resolved by triage.");
        describe_counter!(
            "triage_handoff_total",
            "Tickets handed to a human after triage."
        );
        describe_counter!("triage_errors_total", "Triage runs aborted by an error.");
        describe_histogram!("triage_run_ms", "Wall time of one triage run in milliseconds.");
    });
}

/// Terminal outcome of a successful run's decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageOutcome {
    AutoClosed,
    HandedToHuman,
}

/// Everything one triage run touches. Cheap to clone; each run writes only
/// to its own ticket and its own new suggestion/audit rows, so concurrent
/// runs for different tickets need no coordination.
#[derive(Clone)]
pub struct TriageRunner {
    pub lexicon: Arc<Lexicon>,
    pub config: ConfigHandle,
    pub tickets: Arc<TicketStore>,
    pub kb: Arc<dyn ArticleSource + Send + Sync>,
    pub suggestions: Arc<SuggestionStore>,
    pub audit: Arc<AuditTrail>,
}

impl TriageRunner {
    /// Fire-and-forget: submit the run as a background task. The caller's
    /// only contract is "triage enqueued" — no handle, no result.
    pub fn spawn(&self, ticket_id: TicketId, trace_id: TraceId) {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run(ticket_id, trace_id);
        });
    }

    /// Run triage for one ticket. This is the error boundary: nothing
    /// propagates past it, success or failure lands in the audit trail.
    pub fn run(&self, ticket_id: TicketId, trace_id: TraceId) {
        ensure_metrics_described();
        counter!("triage_runs_total").increment(1);
        let started = Instant::now();

        match self.execute(ticket_id, trace_id.clone()) {
            Ok(outcome) => {
                histogram!("triage_run_ms").record(started.elapsed().as_millis() as f64);
                match outcome {
                    TriageOutcome::AutoClosed => {
                        counter!("triage_auto_closed_total").increment(1)
                    }
                    TriageOutcome::HandedToHuman => counter!("triage_handoff_total").increment(1),
                }
                info!(%ticket_id, %trace_id, ?outcome, "triage complete");
            }
            Err(e) => {
                counter!("triage_errors_total").increment(1);
                warn!(%ticket_id, %trace_id, "triage failed: {e:#}");
                // No rollback: the ticket stays in whatever status it
                // reached before the failure.
                self.audit.record(
                    ticket_id,
                    trace_id,
                    Actor::System,
                    AuditAction::TriageError,
                    json!({ "error": excerpt(&format!("{e:#}"), 500) }),
                );
            }
        }
    }

    fn execute(&self, ticket_id: TicketId, trace_id: TraceId) -> Result<TriageOutcome> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .with_context(|| format!("ticket {ticket_id} not found"))?;

        // 1) Announce the run
        self.audit.record(
            ticket_id,
            trace_id.clone(),
            Actor::System,
            AuditAction::AgentTriageStarted,
            json!({ "ticket_id": ticket_id }),
        );

        // 2) Classify
        let classification = classify(
            &self.lexicon,
            &ticket.title,
            &ticket.description,
            ticket.category,
        );
        info!(
            %ticket_id,
            predicted = %classification.predicted_category,
            confidence = classification.confidence,
            "classified"
        );
        self.audit.record(
            ticket_id,
            trace_id.clone(),
            Actor::System,
            AuditAction::AgentClassified,
            json!({
                "predicted_category": classification.predicted_category,
                "confidence": classification.confidence,
                "original_category": ticket.category,
            }),
        );

        // 3) Retrieve KB articles for the predicted category
        let ranked = retrieve(
            &self.lexicon,
            self.kb.as_ref(),
            &ticket.title,
            &ticket.description,
            classification.predicted_category,
        )?;
        self.audit.record(
            ticket_id,
            trace_id.clone(),
            Actor::System,
            AuditAction::KbRetrieved,
            json!({
                "articles_found": ranked.len(),
                "article_ids": ranked.iter().map(|r| r.article_id).collect::<Vec<_>>(),
            }),
        );

        // 4) Draft the reply
        let draft = compose(&ticket.title, &ranked, classification.predicted_category);
        self.audit.record(
            ticket_id,
            trace_id.clone(),
            Actor::System,
            AuditAction::DraftGenerated,
            json!({
                "draft_length": draft.text.chars().count(),
                "citations": draft.citation_ids.len(),
            }),
        );

        // 5) Fuse confidence, persist the suggestion, link it
        let final_confidence = fuse_confidence(classification.confidence, &ranked);
        let latency_ms = (Utc::now() - ticket.created_at).num_milliseconds().max(0);
        let draft_excerpt = excerpt(&draft.text, 200);

        let suggestion = Suggestion::new(
            ticket_id,
            classification.predicted_category,
            ranked.iter().map(|r| r.article_id).collect(),
            draft.text,
            draft.citation_ids,
            final_confidence,
            ModelInfo::keyword_matcher(latency_ms),
            classification.reasons,
        )?;
        let suggestion_id = suggestion.id;
        self.suggestions.insert(suggestion);
        self.tickets.update(ticket_id, |t| {
            t.suggestion_id = Some(suggestion_id);
            t.status = TicketStatus::Triaged;
        })?;

        // 6) Decision: auto-close or hand off
        let cfg = self.config.snapshot();
        if cfg.auto_close_enabled && final_confidence >= cfg.confidence_threshold {
            self.tickets.update(ticket_id, |t| {
                t.status = TicketStatus::Resolved;
                t.resolved_at = Some(Utc::now());
            })?;
            self.suggestions.update(ticket_id, |s| s.auto_closed = true)?;
            self.audit.record(
                ticket_id,
                trace_id,
                Actor::System,
                AuditAction::AutoClosed,
                json!({
                    "confidence": final_confidence,
                    "threshold": cfg.confidence_threshold,
                    "draft_reply": draft_excerpt,
                }),
            );
            Ok(TriageOutcome::AutoClosed)
        } else {
            self.tickets
                .update(ticket_id, |t| t.status = TicketStatus::WaitingHuman)?;
            let reason = if cfg.auto_close_enabled {
                "low_confidence"
            } else {
                "auto_close_disabled"
            };
            self.audit.record(
                ticket_id,
                trace_id,
                Actor::System,
                AuditAction::AssignedToHuman,
                json!({
                    "reason": reason,
                    "confidence": final_confidence,
                    "threshold": cfg.confidence_threshold,
                }),
            );
            Ok(TriageOutcome::HandedToHuman)
        }
    }
}

/// Blend retrieval quality into the classifier confidence. No articles
/// means no boost; the ceiling always holds.
pub fn fuse_confidence(classifier_confidence: f32, ranked: &[RankedArticle]) -> f32 {
    if ranked.is_empty() {
        return classifier_confidence;
    }
    (classifier_confidence + normalized_mean_relevance(ranked) * ARTICLE_RELEVANCE_WEIGHT)
        .min(CONFIDENCE_CEILING)
}
