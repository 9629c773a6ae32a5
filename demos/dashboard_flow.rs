//! End-to-end walkthrough of the invoicing engine.

use std::time::Duration;

use invoice_kit::store::InMemoryStore;
use invoice_kit::{
    filter, ActivityLog, AuthUser, DraftItem, EventBus, InvoiceActions, InvoiceDraft,
    InvoiceRepository, ListQuery, MockEventSource, Money, RealtimeSession, Result, SessionAuth,
    SortBy,
};
use tokio::sync::mpsc;

fn draft(name: &str, email: &str, items: Vec<DraftItem>) -> InvoiceDraft {
    InvoiceDraft {
        customer_name: name.to_string(),
        customer_email: email.to_string(),
        customer_phone: None,
        issue_date: "2023-05-01".parse().expect("valid date"),
        due_date: "2023-05-19".parse().expect("valid date"),
        items,
        note: None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Invoice Kit - Dashboard Flow ===\n");

    // 1. Open the repository and the actions layer
    println!("1. Opening repository against the in-memory store...");
    let repository = InvoiceRepository::open(InMemoryStore::new()).await?;
    let (toast_tx, mut toasts) = mpsc::unbounded_channel();
    let actions = InvoiceActions::new(repository, toast_tx, ActivityLog::new(), "KO");
    println!("   ✓ Engine ready\n");

    // 2. Create two invoices
    println!("2. Creating invoices:");
    let jane = actions
        .create_invoice(draft(
            "Jane Doe",
            "jane@example.com",
            vec![
                DraftItem::new("Design", 2, Money::from_cents(5000)),
                DraftItem::new("Review", 1, Money::from_cents(2500)),
            ],
        ))
        .await?;
    println!("   ✓ {} for {} ({})", jane.id, jane.customer_name, jane.amount);

    let tech = actions
        .create_invoice(draft(
            "Tech Corp Ltd",
            "billing@tech.io",
            vec![DraftItem::new("Hosting", 12, Money::from_cents(9900))],
        ))
        .await?;
    println!("   ✓ {} for {} ({})\n", tech.id, tech.customer_name, tech.amount);

    // 3. Drive the lifecycle and watch the stats move
    println!("3. Sending Jane's invoice, then marking it paid:");
    actions.send_invoice(&jane.id).await?;
    actions.mark_as_paid(&jane.id).await?;
    let stats = actions.repository().stats().await;
    println!(
        "   ✓ Stats: paid {} ({}), draft {} ({})\n",
        stats.total_paid.count, stats.total_paid.value, stats.total_draft.count,
        stats.total_draft.value,
    );

    // 4. Query the list the way the dashboard would
    println!("4. Listing by amount (largest first):");
    let visible = filter::apply(
        &actions.repository().list().await,
        &ListQuery::new().with_sort(SortBy::Amount),
    );
    for invoice in &visible {
        println!(
            "   {} | {:<15} | {:>12} | {}",
            invoice.id, invoice.customer_name, invoice.amount.to_string(), invoice.status
        );
    }
    println!();

    // 5. Start the realtime session and sign in
    println!("5. Starting the realtime session (welcome in ~3s)...");
    let auth = SessionAuth::new();
    let source = MockEventSource::with_timing(
        EventBus::new(),
        Duration::from_secs(3),
        Duration::from_secs(300),
    );
    let (realtime_tx, mut realtime_toasts) = mpsc::unbounded_channel();
    let _session = RealtimeSession::start(&auth, source, realtime_tx);
    auth.sign_in(AuthUser::new("user-1", "Karim Okafor", "karim@example.com"));

    tokio::time::sleep(Duration::from_secs(4)).await;
    while let Ok(toast) = realtime_toasts.try_recv() {
        println!("   [realtime] [{}] {}", toast.code, toast.message);
    }
    println!();

    // 6. Drain the toast channel
    println!("6. Toasts produced along the way:");
    while let Ok(toast) = toasts.try_recv() {
        println!("   [{}] {}", toast.code, toast.message);
    }
    println!();

    // 7. Recent activity
    println!("7. Recent activity:");
    for entry in actions.activities().recent(5) {
        println!("   {} — {} — {}", entry.actor, entry.kind, entry.description);
    }

    println!("\n=== Done ===\n");
    auth.sign_out();
    Ok(())
}
