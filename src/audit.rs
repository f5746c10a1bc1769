//! Append-only audit trail. Every lifecycle step — creation, each triage
//! stage, agent actions, feedback — lands here with the ticket's trace token
//! so a timeline can be reconstructed per ticket.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ticket::{TicketId, TraceId};

/// Who performed the audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    System,
    Agent,
    User,
    Admin,
}

/// Closed action vocabulary. Values serialize exactly as the wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TicketCreated,
    AgentTriageStarted,
    AgentClassified,
    KbRetrieved,
    DraftGenerated,
    AutoClosed,
    AssignedToHuman,
    TicketAssigned,
    ReplySent,
    StatusChanged,
    FeedbackSubmitted,
    TriageError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub ticket_id: TicketId,
    pub trace_id: TraceId,
    pub actor: Actor,
    pub action: AuditAction,
    pub meta: Value,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log. Entries are never mutated or deleted; per-ticket order
/// is insertion order, which matches each orchestrator's own sequencing.
#[derive(Debug, Default)]
pub struct AuditTrail {
    inner: Mutex<Vec<AuditEntry>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        ticket_id: TicketId,
        trace_id: TraceId,
        actor: Actor,
        action: AuditAction,
        meta: Value,
    ) {
        let entry = AuditEntry {
            ticket_id,
            trace_id,
            actor,
            action,
            meta,
            timestamp: Utc::now(),
        };
        let mut v = self.inner.lock().expect("audit trail mutex poisoned");
        v.push(entry);
    }

    /// Chronological snapshot of one ticket's entries.
    pub fn for_ticket(&self, ticket: TicketId) -> Vec<AuditEntry> {
        let v = self.inner.lock().expect("audit trail mutex poisoned");
        v.iter().filter(|e| e.ticket_id == ticket).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("audit trail mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Char-safe excerpt for audit metadata (titles, drafts, error text).
pub fn excerpt(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
