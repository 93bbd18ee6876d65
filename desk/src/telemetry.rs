//! Business metrics for the help desk.
//!
//! Recorded through the `metrics` facade; install any recorder/exporter in
//! the binary to collect them. Without a recorder every call is a no-op.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `helpdesk_tickets_created_total{priority}` - Tickets filed
//! - `helpdesk_assignments_total{kind, mode}` - Agent/technician assignments,
//!   automatic or manual
//! - `helpdesk_assignment_misses_total{kind}` - Automatic assignments that
//!   found nobody with capacity
//! - `helpdesk_status_changes_total{to}` - Applied status transitions
//! - `helpdesk_notifications_total{outcome}` - Notifications sent, failed or
//!   skipped

use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "helpdesk_tickets_created_total",
        "Total number of tickets created by priority"
    );
    describe_counter!(
        "helpdesk_assignments_total",
        "Total number of assignments by kind (agent, technician) and mode (automatic, manual)"
    );
    describe_counter!(
        "helpdesk_assignment_misses_total",
        "Automatic assignments that found no eligible staff member"
    );
    describe_counter!(
        "helpdesk_status_changes_total",
        "Total number of applied status transitions by target status"
    );
    describe_counter!(
        "helpdesk_notifications_total",
        "Total number of notifications by outcome (sent, failed, skipped)"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a ticket creation.
pub fn record_ticket_created(priority: &'static str) {
    metrics::counter!("helpdesk_tickets_created_total", "priority" => priority).increment(1);
}

/// Record an assignment.
///
/// # Arguments
///
/// * `kind` - `"agent"` or `"technician"`
/// * `automatic` - chosen by the balancer
pub fn record_assignment(kind: &'static str, automatic: bool) {
    let mode = if automatic { "automatic" } else { "manual" };
    metrics::counter!("helpdesk_assignments_total", "kind" => kind, "mode" => mode).increment(1);
}

/// Record an automatic assignment that found nobody.
pub fn record_assignment_miss(kind: &'static str) {
    metrics::counter!("helpdesk_assignment_misses_total", "kind" => kind).increment(1);
}

/// Record an applied status transition.
pub fn record_status_change(to: &'static str) {
    metrics::counter!("helpdesk_status_changes_total", "to" => to).increment(1);
}

/// Record a notification outcome: `"sent"`, `"failed"` or `"skipped"`.
pub fn record_notification(outcome: &'static str) {
    metrics::counter!("helpdesk_notifications_total", "outcome" => outcome).increment(1);
}
