//! Help Desk Demo
//!
//! Walks one warranty claim through the whole lifecycle against the
//! in-memory store:
//! - Category seeding and staff registration
//! - Ticket creation with automatic assignment
//! - Warranty and document validation
//! - Acceptance, derivation to a technician and resolution
//! - Closing, metrics and the audit trail
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,helpdesk=debug cargo run --bin helpdesk-demo
//! ```

use chrono::Days;
use helpdesk::attachment::Upload;
use helpdesk::telemetry::register_business_metrics;
use helpdesk::ticket::TicketDraft;
use helpdesk::user::{NewUser, User};
use helpdesk::{ClaimType, Config, DeskEnvironment, HelpDesk, Priority, Role, TicketStatus};
use helpdesk_core::environment::{Clock, SystemClock};
use helpdesk_core::event::TracingSink;
use helpdesk_core::notify::LogNotifier;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,helpdesk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_business_metrics();

    println!("\n============================================");
    println!("   Warranty Help Desk - Live Demo");
    println!("============================================\n");

    let config = Config::from_env();
    let clock = Arc::new(SystemClock);
    let env = DeskEnvironment::in_memory(clock.clone(), Arc::new(LogNotifier))
        .with_events(Arc::new(TracingSink));
    let store = env.store.clone();
    let desk = HelpDesk::new(env, config);

    // ========== Setup ==========

    let seeded = desk.seed_default_categories().await?;
    println!("1. Seeded {seeded} categories");

    // The first superadmin goes straight into the store.
    let root = User::new("root", "root@example.com", "Root", Role::SuperAdmin, clock.now());
    store.insert_user(&root).await?;

    let customer = desk
        .register_user(None, new_user("ana", "Ana Pérez", Role::Customer))
        .await?;
    let agent = desk
        .register_user(Some(root.id), new_user("luis", "Luis Gómez", Role::Agent))
        .await?;
    let technician = desk
        .register_user(Some(root.id), new_user("tito", "Tito Ruiz", Role::Technician))
        .await?;
    println!("2. Registered customer, agent and technician\n");

    // ========== Ticket ==========

    let hardware = store
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.name == "Hardware")
        .map(|c| c.id)
        .ok_or("Hardware category missing")?;
    let purchase = clock
        .today()
        .checked_sub_days(Days::new(120))
        .ok_or("purchase date out of range")?;

    let ticket = desk
        .create_ticket(
            customer.id,
            TicketDraft {
                invoice_number: Some("F-2025-0042".into()),
                serial_number: Some("SN-88213".into()),
                purchase_date: Some(purchase),
                subject: "El portátil no enciende".into(),
                description: "Tras una actualización el equipo no arranca".into(),
                category: Some(hardware),
                priority: Priority::High,
                claim_type: ClaimType::Warranty,
            },
        )
        .await?;
    println!(
        "3. Ticket #{} created, status {}, agent assigned: {}",
        ticket.id.short(),
        ticket.status.label(),
        ticket.agent.is_some()
    );

    desk.add_attachment(
        ticket.id,
        customer.id,
        Upload::new("factura.pdf", b"%PDF-1.4 demo invoice".to_vec()),
        None,
    )
    .await?;

    let report = desk.validate_ticket(ticket.id).await?;
    println!(
        "4. Validation: warranty {}, documents complete {}, can be accepted {}",
        report.warranty_valid, report.documents_complete, report.can_be_accepted
    );
    for warning in &report.warnings {
        println!("   - {warning}");
    }

    // ========== Lifecycle ==========

    let outcome = desk
        .change_status(ticket.id, agent.id, TicketStatus::Accepted, None)
        .await?;
    println!("5. {}", outcome.message);

    let derived = desk.derive_to_technician(ticket.id).await?;
    println!("6. Derived to technician: {derived}");

    let outcome = desk
        .resolve_with_explanation(ticket.id, technician.id, "Se reemplazó la placa base")
        .await?;
    println!("7. {}", outcome.message);

    let outcome = desk
        .change_status(ticket.id, agent.id, TicketStatus::Closed, None)
        .await?;
    println!("8. {}\n", outcome.message);

    // ========== Reports ==========

    let metrics = desk.general_metrics(None, None).await?;
    println!(
        "Metrics: {} tickets, resolution rate {:.0}%, avg resolution {:?} h",
        metrics.total,
        metrics.resolution_rate * 100.0,
        metrics.avg_resolution_hours
    );

    let workload = desk.workload_report().await?;
    for load in &workload.agents {
        println!(
            "Agent {}: {} active of {} ({:.0}%)",
            load.username, load.active_tickets, load.limit, load.load_percentage
        );
    }

    println!("\nAudit trail:");
    for entry in desk.audit_trail(root.id, ticket.id).await?.iter().rev() {
        println!("  [{}] {}", entry.created_at.format("%H:%M:%S"), entry.description);
    }

    println!("\n============================================\n");
    Ok(())
}

fn new_user(username: &str, full_name: &str, role: Role) -> NewUser {
    NewUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        full_name: full_name.into(),
        role,
        max_tickets: None,
    }
}
