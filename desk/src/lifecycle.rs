//! Ticket state machine.
//!
//! Legal transitions depend on who is asking. Agents triage and close,
//! technicians move tickets through repair, holders of
//! [`Capability::ForceStatusChanges`] (superadmins) bypass the table and
//! customers never change status directly.
//!
//! | Role | From | Allowed to |
//! |---|---|---|
//! | agent | open | in_review, rejected |
//! | agent | in_review | accepted, rejected, awaiting_customer |
//! | agent | accepted | in_repair, resolved, awaiting_customer |
//! | agent | awaiting_customer | in_review, accepted |
//! | agent | resolved | closed |
//! | technician | in_repair | resolved, awaiting_customer |
//! | technician | awaiting_customer | in_repair |
//!
//! Legacy employees use the agent rows.

use crate::policy::{Capability, has_capability};
use crate::types::{Role, TicketStatus};
use serde::{Deserialize, Serialize};

use TicketStatus as S;

/// Targets reachable from `from` for `role` according to the table.
///
/// Roles that may force status changes reach every other status; customers
/// reach nothing.
#[must_use]
pub fn allowed_targets(role: Role, from: TicketStatus) -> Vec<TicketStatus> {
    if has_capability(role, Capability::ForceStatusChanges) {
        return S::ALL.into_iter().filter(|s| *s != from).collect();
    }
    table(role, from).to_vec()
}

const fn table(role: Role, from: TicketStatus) -> &'static [TicketStatus] {
    match role {
        Role::Agent | Role::LegacyEmployee => agent_targets(from),
        Role::Technician => technician_targets(from),
        Role::Customer | Role::SuperAdmin => &[],
    }
}

const fn agent_targets(from: TicketStatus) -> &'static [TicketStatus] {
    match from {
        S::Open => &[S::InReview, S::Rejected],
        S::InReview => &[S::Accepted, S::Rejected, S::AwaitingCustomer],
        S::Accepted => &[S::InRepair, S::Resolved, S::AwaitingCustomer],
        S::AwaitingCustomer => &[S::InReview, S::Accepted],
        S::Resolved => &[S::Closed],
        S::InRepair | S::Rejected | S::Closed => &[],
    }
}

const fn technician_targets(from: TicketStatus) -> &'static [TicketStatus] {
    match from {
        S::InRepair => &[S::Resolved, S::AwaitingCustomer],
        S::AwaitingCustomer => &[S::InRepair],
        _ => &[],
    }
}

/// Whether `role` may move a ticket from `from` to `to`.
#[must_use]
pub fn can_transition(role: Role, from: TicketStatus, to: TicketStatus) -> bool {
    has_capability(role, Capability::ForceStatusChanges) || table(role, from).contains(&to)
}

/// Result of a status change request.
///
/// A refused transition is a normal outcome, not an error: callers check
/// `success` and show `message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// Whether the ticket changed status
    pub success: bool,
    /// Human readable explanation
    pub message: String,
}

impl TransitionOutcome {
    /// Transition applied
    #[must_use]
    pub fn applied(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Transition refused, nothing changed
    #[must_use]
    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
