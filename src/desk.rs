//! Operations facade over the triage core: the surface the transport and
//! presentation layers call. Ticket creation persists the ticket, writes
//! `TICKET_CREATED`, and enqueues a detached triage run; agent actions and
//! feedback land here too, each with its audit entry.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::audit::{excerpt, Actor, AuditAction, AuditEntry, AuditTrail};
use crate::config::{ConfigHandle, TriageConfig};
use crate::kb::{ArticleSource, ArticleStore};
use crate::lexicon::Lexicon;
use crate::suggestion::{Feedback, Suggestion, SuggestionStore};
use crate::ticket::{Category, Ticket, TicketId, TicketStatus, TicketStore, UserId};
use crate::triage::TriageRunner;

/// The assembled helpdesk: shared stores plus the triage runner. Clone is
/// cheap; clones share state.
#[derive(Clone)]
pub struct HelpDesk {
    runner: TriageRunner,
    kb: Arc<ArticleStore>,
}

impl HelpDesk {
    /// Build a desk with the built-in lexicon and empty in-memory stores.
    pub fn new(config: TriageConfig) -> Self {
        Self::with_lexicon(config, Lexicon::builtin())
    }

    pub fn with_lexicon(config: TriageConfig, lexicon: Arc<Lexicon>) -> Self {
        let kb = Arc::new(ArticleStore::new());
        let runner = TriageRunner {
            lexicon,
            config: ConfigHandle::new(config),
            tickets: Arc::new(TicketStore::new()),
            kb: kb.clone() as Arc<dyn ArticleSource + Send + Sync>,
            suggestions: Arc::new(SuggestionStore::new()),
            audit: Arc::new(AuditTrail::new()),
        };
        Self { runner, kb }
    }

    // --- collaborator access ---

    pub fn kb(&self) -> &ArticleStore {
        &self.kb
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.runner.config
    }

    pub fn ticket(&self, id: TicketId) -> Option<Ticket> {
        self.runner.tickets.get(id)
    }

    pub fn tickets_for(&self, user: UserId) -> Vec<Ticket> {
        self.runner.tickets.by_creator(user)
    }

    pub fn suggestion_for(&self, ticket: TicketId) -> Option<Suggestion> {
        self.runner.suggestions.for_ticket(ticket)
    }

    /// Chronological audit timeline for one ticket.
    pub fn audit_trail(&self, ticket: TicketId) -> Vec<AuditEntry> {
        self.runner.audit.for_ticket(ticket)
    }

    // --- operations ---

    /// File a new ticket: validate, persist, write `TICKET_CREATED`, and
    /// enqueue the detached triage run. Returns as soon as the ticket is
    /// persisted; triage failures never surface here. Requires a running
    /// Tokio runtime.
    pub fn create_ticket(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        created_by: UserId,
    ) -> Result<Ticket> {
        let ticket = Ticket::new(title, description, category, created_by)?;
        self.runner.tickets.insert(ticket.clone());
        self.runner.audit.record(
            ticket.id,
            ticket.trace_id.clone(),
            Actor::User,
            AuditAction::TicketCreated,
            json!({
                "user_id": created_by,
                "category": category,
                "title": excerpt(&ticket.title, 100),
            }),
        );
        info!(ticket_id = %ticket.id, trace_id = %ticket.trace_id, %category, "ticket created, triage enqueued");
        self.runner.spawn(ticket.id, ticket.trace_id.clone());
        Ok(ticket)
    }

    /// Attach reviewer feedback to a ticket's suggestion. Resubmission
    /// replaces the previous feedback in place; each submission appends one
    /// `FEEDBACK_SUBMITTED` entry. Never re-triages.
    pub fn submit_feedback(
        &self,
        ticket_id: TicketId,
        helpful: Option<bool>,
        comment: Option<String>,
        submitted_by: UserId,
        actor: Actor,
    ) -> Result<Suggestion> {
        let Some(ticket) = self.runner.tickets.get(ticket_id) else {
            bail!("ticket {ticket_id} not found");
        };
        let feedback = Feedback::new(helpful, comment.clone(), submitted_by)?;
        let suggestion = self
            .runner
            .suggestions
            .update(ticket_id, |s| s.feedback = Some(feedback))?;

        self.runner.audit.record(
            ticket_id,
            ticket.trace_id,
            actor,
            AuditAction::FeedbackSubmitted,
            json!({
                "helpful": helpful,
                "comment": comment.as_deref().map(|c| excerpt(c, 200)),
                "user_id": submitted_by,
            }),
        );
        Ok(suggestion)
    }

    /// Agent answers the ticket: store the reply, take assignment, advance
    /// status (default `resolved`).
    pub fn send_reply(
        &self,
        ticket_id: TicketId,
        reply: impl Into<String>,
        status: Option<TicketStatus>,
        agent: UserId,
    ) -> Result<Ticket> {
        let reply = reply.into();
        let status = status.unwrap_or(TicketStatus::Resolved);
        let current = self
            .runner
            .tickets
            .get(ticket_id)
            .ok_or_else(|| anyhow::anyhow!("ticket {ticket_id} not found"))?;
        ensure_forward(current.status, status)?;

        let now = Utc::now();
        let ticket = self.runner.tickets.update(ticket_id, |t| {
            t.status = status;
            t.assignee = Some(agent);
            t.agent_reply = Some(reply.clone());
            t.replied_at = Some(now);
            if matches!(status, TicketStatus::Resolved | TicketStatus::Closed) {
                t.resolved_at = Some(now);
            }
        })?;

        self.runner.audit.record(
            ticket_id,
            ticket.trace_id.clone(),
            Actor::Agent,
            AuditAction::ReplySent,
            json!({
                "agent_id": agent,
                "status": status,
                "reply_length": reply.chars().count(),
            }),
        );
        Ok(ticket)
    }

    /// Hand the ticket to a specific agent.
    pub fn assign(
        &self,
        ticket_id: TicketId,
        assignee: UserId,
        assigned_by: UserId,
        actor: Actor,
    ) -> Result<Ticket> {
        let current = self
            .runner
            .tickets
            .get(ticket_id)
            .ok_or_else(|| anyhow::anyhow!("ticket {ticket_id} not found"))?;
        ensure_forward(current.status, TicketStatus::Assigned)?;

        let ticket = self.runner.tickets.update(ticket_id, |t| {
            t.assignee = Some(assignee);
            t.status = TicketStatus::Assigned;
        })?;

        self.runner.audit.record(
            ticket_id,
            ticket.trace_id.clone(),
            actor,
            AuditAction::TicketAssigned,
            json!({
                "assigned_by": assigned_by,
                "assigned_to": assignee,
            }),
        );
        Ok(ticket)
    }

    /// Manual status change (agent/admin). Forward-only.
    pub fn change_status(
        &self,
        ticket_id: TicketId,
        status: TicketStatus,
        actor: Actor,
    ) -> Result<Ticket> {
        let current = self
            .runner
            .tickets
            .get(ticket_id)
            .ok_or_else(|| anyhow::anyhow!("ticket {ticket_id} not found"))?;
        if status == current.status {
            return Ok(current);
        }
        ensure_forward(current.status, status)?;

        let now = Utc::now();
        let ticket = self.runner.tickets.update(ticket_id, |t| {
            t.status = status;
            if matches!(status, TicketStatus::Resolved | TicketStatus::Closed) {
                t.resolved_at = Some(now);
            }
        })?;

        self.runner.audit.record(
            ticket_id,
            ticket.trace_id.clone(),
            actor,
            AuditAction::StatusChanged,
            json!({
                "from": current.status,
                "to": status,
            }),
        );
        Ok(ticket)
    }

    /// The runner backing this desk, for callers that drive triage
    /// themselves (offline evaluation, deterministic tests).
    pub fn triage_runner(&self) -> &TriageRunner {
        &self.runner
    }
}

/// Status progression is monotonic: the rank never decreases.
fn ensure_forward(from: TicketStatus, to: TicketStatus) -> Result<()> {
    if to.rank() < from.rank() {
        bail!("cannot move ticket from {from} back to {to}");
    }
    Ok(())
}
