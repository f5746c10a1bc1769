//! Runnable walkthrough of the triage pipeline: seeds a small KB, files a
//! few tickets, lets the detached triage runs finish, and prints each
//! ticket's suggestion and audit timeline.
//!
//! Try `AUTO_CLOSE_ENABLED=true cargo run --bin triage_demo` to watch the
//! high-confidence ticket auto-resolve.

use helpdesk_triage::{Actor, Article, Category, HelpDesk, TriageConfig, UserId};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let desk = HelpDesk::new(TriageConfig::load());

    // --- Seed the knowledge base ---
    desk.kb().insert(Article::published(
        "How refunds work",
        "Refunds for duplicate charges are issued to the original payment method \
         within 5-7 business days. Open your billing statement, locate the charge, \
         and submit a refund request from the invoice detail page.",
        vec!["billing".into(), "refund".into()],
    )?);
    desk.kb().insert(Article::published(
        "Resetting your password",
        "Use the Forgot password link on the login page. A reset email arrives \
         within a few minutes; check spam if it does not.",
        vec!["tech".into(), "login".into()],
    )?);
    desk.kb().insert(Article::published(
        "Tracking a delayed package",
        "Tracking numbers update within 24 hours of dispatch. If a shipment shows \
         no movement for 3 days, contact the courier with your tracking id.",
        vec!["shipping".into()],
    )?);

    // --- File tickets; triage runs detached ---
    let customer = UserId::generate();
    let billing = desk.create_ticket(
        "Refund for double charge",
        "I was charged twice for my subscription, please refund",
        Category::Billing,
        customer,
    )?;
    let vague = desk.create_ticket(
        "Question",
        "I have a general question about my experience",
        Category::Other,
        customer,
    )?;

    // No handle comes back from triage; give the background runs a moment.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    for ticket in [&billing, &vague] {
        let current = desk.ticket(ticket.id).expect("ticket persisted");
        println!("\n=== {} [{}] -> {}", current.title, current.id, current.status);

        if let Some(s) = desk.suggestion_for(ticket.id) {
            println!(
                "suggestion: category={} confidence={:.2} auto_closed={}",
                s.predicted_category, s.confidence, s.auto_closed
            );
            for reason in &s.match_reasons {
                println!("  reason: {reason}");
            }
            println!("--- draft ---\n{}\n-------------", s.draft_reply);
        } else {
            println!("no suggestion (triage pending or failed)");
        }

        // Leave reviewer feedback on the first suggestion.
        if ticket.id == billing.id && desk.suggestion_for(ticket.id).is_some() {
            desk.submit_feedback(
                ticket.id,
                Some(true),
                Some("Draft answered the question.".into()),
                customer,
                Actor::User,
            )?;
        }

        println!("audit timeline:");
        for entry in desk.audit_trail(ticket.id) {
            println!(
                "  {} {:>6?} {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.actor,
                serde_json::to_string(&entry.action)?
            );
        }
    }

    Ok(())
}
