// tests/desk_ops.rs
//
// Agent-side operations on triaged tickets: reply, assignment, manual
// status changes, and the forward-only progression rule.

use helpdesk_triage::{Actor, AuditAction, Category, HelpDesk, TicketId, TicketStatus, TriageConfig, UserId};

const TITLE: &str = "Package never arrived";
const DESC: &str = "Tracking shows my package stuck in transit for two weeks, delivery is delayed";

async fn wait_for_triage(desk: &HelpDesk, id: TicketId) {
    for _ in 0..200 {
        let done = desk.audit_trail(id).iter().any(|e| {
            matches!(
                e.action,
                AuditAction::AutoClosed | AuditAction::AssignedToHuman | AuditAction::TriageError
            )
        });
        if done {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("triage did not finish in time");
}

fn count(desk: &HelpDesk, id: TicketId, action: AuditAction) -> usize {
    desk.audit_trail(id)
        .iter()
        .filter(|e| e.action == action)
        .count()
}

#[tokio::test]
async fn reply_resolves_ticket_and_audits() {
    let desk = HelpDesk::new(TriageConfig::default());
    let customer = UserId::generate();
    let agent = UserId::generate();

    let ticket = desk
        .create_ticket(TITLE, DESC, Category::Shipping, customer)
        .unwrap();
    wait_for_triage(&desk, ticket.id).await;

    let updated = desk
        .send_reply(
            ticket.id,
            "Your replacement ships tomorrow with express delivery.",
            None,
            agent,
        )
        .unwrap();

    assert_eq!(updated.status, TicketStatus::Resolved);
    assert_eq!(updated.assignee, Some(agent));
    assert!(updated.agent_reply.is_some());
    assert!(updated.replied_at.is_some());
    assert!(updated.resolved_at.is_some());

    assert_eq!(count(&desk, ticket.id, AuditAction::ReplySent), 1);
    let entry = desk
        .audit_trail(ticket.id)
        .into_iter()
        .find(|e| e.action == AuditAction::ReplySent)
        .unwrap();
    assert_eq!(entry.actor, Actor::Agent);
    assert_eq!(entry.meta["status"], "resolved");
    assert!(entry.meta["reply_length"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn assignment_moves_forward_and_audits() {
    let desk = HelpDesk::new(TriageConfig::default());
    let customer = UserId::generate();
    let agent = UserId::generate();
    let admin = UserId::generate();

    let ticket = desk
        .create_ticket(TITLE, DESC, Category::Shipping, customer)
        .unwrap();
    wait_for_triage(&desk, ticket.id).await;
    assert_eq!(desk.ticket(ticket.id).unwrap().status, TicketStatus::WaitingHuman);

    let updated = desk.assign(ticket.id, agent, admin, Actor::Admin).unwrap();
    assert_eq!(updated.status, TicketStatus::Assigned);
    assert_eq!(updated.assignee, Some(agent));
    assert_eq!(count(&desk, ticket.id, AuditAction::TicketAssigned), 1);

    // Closing afterwards is forward; reopening is not.
    desk.change_status(ticket.id, TicketStatus::Closed, Actor::Admin)
        .unwrap();
    assert!(desk
        .change_status(ticket.id, TicketStatus::Open, Actor::Admin)
        .is_err());
    assert!(desk.assign(ticket.id, agent, admin, Actor::Admin).is_err());
}

#[tokio::test]
async fn manual_status_change_records_transition() {
    let desk = HelpDesk::new(TriageConfig::default());
    let customer = UserId::generate();

    let ticket = desk
        .create_ticket(TITLE, DESC, Category::Shipping, customer)
        .unwrap();
    wait_for_triage(&desk, ticket.id).await;

    let updated = desk
        .change_status(ticket.id, TicketStatus::Resolved, Actor::Agent)
        .unwrap();
    assert_eq!(updated.status, TicketStatus::Resolved);
    assert!(updated.resolved_at.is_some());

    let entry = desk
        .audit_trail(ticket.id)
        .into_iter()
        .find(|e| e.action == AuditAction::StatusChanged)
        .unwrap();
    assert_eq!(entry.meta["from"], "waiting_human");
    assert_eq!(entry.meta["to"], "resolved");

    // Re-applying the same status is a no-op without an audit entry.
    let before = desk.audit_trail(ticket.id).len();
    desk.change_status(ticket.id, TicketStatus::Resolved, Actor::Agent)
        .unwrap();
    assert_eq!(desk.audit_trail(ticket.id).len(), before);
}

#[tokio::test]
async fn creator_query_lists_own_tickets() {
    let desk = HelpDesk::new(TriageConfig::default());
    let alice = UserId::generate();
    let bob = UserId::generate();

    let t1 = desk
        .create_ticket(TITLE, DESC, Category::Shipping, alice)
        .unwrap();
    let t2 = desk
        .create_ticket("Another one", "My invoice looks wrong", Category::Billing, alice)
        .unwrap();
    desk.create_ticket("Not hers", "login broken", Category::Tech, bob)
        .unwrap();

    let hers: Vec<_> = desk.tickets_for(alice).iter().map(|t| t.id).collect();
    assert_eq!(hers.len(), 2);
    assert!(hers.contains(&t1.id));
    assert!(hers.contains(&t2.id));
}
