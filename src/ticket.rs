//! Ticket entity, category/status vocabulary, and the in-memory ticket store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Ticket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User identifier (creators, assignees, feedback submitters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque correlation token. One per ticket lifecycle; every audit entry
/// for the ticket carries the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ticket category. Declaration order matches the lexicon tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Billing,
    Tech,
    Shipping,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Billing => "billing",
            Category::Tech => "tech",
            Category::Shipping => "shipping",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket lifecycle status. Progression is forward-only: the rank never
/// decreases, whether the orchestrator or an agent drives the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Triaged,
    WaitingHuman,
    Assigned,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn rank(&self) -> u8 {
        match self {
            TicketStatus::Open => 0,
            TicketStatus::Triaged => 1,
            TicketStatus::WaitingHuman => 2,
            TicketStatus::Assigned => 3,
            TicketStatus::Resolved => 4,
            TicketStatus::Closed => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Triaged => "triaged",
            TicketStatus::WaitingHuman => "waiting_human",
            TicketStatus::Assigned => "assigned",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A support ticket. Created on submission; mutated only by the triage
/// orchestrator (category/status/suggestion link) and by agent actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: TicketStatus,
    pub created_by: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_id: Option<crate::suggestion::SuggestionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_reply: Option<String>,
    pub trace_id: TraceId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Validating constructor. Trims both text fields, enforces the length
    /// bounds, and mints a fresh id and trace token.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        created_by: UserId,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        let description = description.into().trim().to_string();

        if title.is_empty() {
            bail!("ticket title must not be empty");
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            bail!("ticket title exceeds {MAX_TITLE_CHARS} characters");
        }
        if description.is_empty() {
            bail!("ticket description must not be empty");
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            bail!("ticket description exceeds {MAX_DESCRIPTION_CHARS} characters");
        }

        Ok(Self {
            id: TicketId::generate(),
            title,
            description,
            category,
            status: TicketStatus::Open,
            created_by,
            assignee: None,
            suggestion_id: None,
            agent_reply: None,
            trace_id: TraceId::generate(),
            created_at: Utc::now(),
            resolved_at: None,
            replied_at: None,
        })
    }
}

/// In-memory ticket collection guarded by a mutex. Reads return snapshots;
/// writes go through a closure so the lock is never held by callers.
#[derive(Debug, Default)]
pub struct TicketStore {
    inner: Mutex<HashMap<TicketId, Ticket>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ticket: Ticket) {
        let mut map = self.inner.lock().expect("ticket store mutex poisoned");
        map.insert(ticket.id, ticket);
    }

    pub fn get(&self, id: TicketId) -> Option<Ticket> {
        let map = self.inner.lock().expect("ticket store mutex poisoned");
        map.get(&id).cloned()
    }

    /// Apply a mutation to one ticket, returning the updated snapshot.
    pub fn update<F>(&self, id: TicketId, mutate: F) -> Result<Ticket>
    where
        F: FnOnce(&mut Ticket),
    {
        let mut map = self.inner.lock().expect("ticket store mutex poisoned");
        let Some(ticket) = map.get_mut(&id) else {
            bail!("ticket {id} not found");
        };
        mutate(ticket);
        Ok(ticket.clone())
    }

    pub fn by_creator(&self, user: UserId) -> Vec<Ticket> {
        let map = self.inner.lock().expect("ticket store mutex poisoned");
        let mut out: Vec<Ticket> = map
            .values()
            .filter(|t| t.created_by == user)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_enforces_bounds() {
        let user = UserId::generate();
        assert!(Ticket::new("", "something broke", Category::Tech, user).is_err());
        assert!(Ticket::new("help", "   ", Category::Tech, user).is_err());
        assert!(Ticket::new("x".repeat(201), "desc", Category::Tech, user).is_err());
        assert!(Ticket::new("title", "y".repeat(2001), Category::Tech, user).is_err());

        let t = Ticket::new("  padded  ", "desc", Category::Billing, user).unwrap();
        assert_eq!(t.title, "padded");
        assert_eq!(t.status, TicketStatus::Open);
        assert!(t.resolved_at.is_none());
    }

    #[test]
    fn status_ranks_are_forward() {
        assert!(TicketStatus::Open.rank() < TicketStatus::Triaged.rank());
        assert!(TicketStatus::Triaged.rank() < TicketStatus::WaitingHuman.rank());
        assert!(TicketStatus::WaitingHuman.rank() < TicketStatus::Assigned.rank());
        assert!(TicketStatus::Assigned.rank() < TicketStatus::Resolved.rank());
        assert!(TicketStatus::Resolved.rank() < TicketStatus::Closed.rank());
    }

    #[test]
    fn store_update_mutates_in_place() {
        let store = TicketStore::new();
        let t = Ticket::new("a", "b", Category::Other, UserId::generate()).unwrap();
        let id = t.id;
        store.insert(t);

        let updated = store
            .update(id, |t| t.status = TicketStatus::Triaged)
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Triaged);
        assert_eq!(store.get(id).unwrap().status, TicketStatus::Triaged);

        assert!(store.update(TicketId::generate(), |_| {}).is_err());
    }
}
