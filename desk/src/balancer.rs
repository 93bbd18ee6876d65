//! Workload balancing.
//!
//! Pure functions over a snapshot of users and tickets. The service reads the
//! snapshot, asks for a choice, then writes; the read and the write are not
//! atomic across tickets, so two concurrent assignments can both pick the
//! same agent.

use crate::types::{Role, TicketStatus, UserId};
use crate::ticket::Ticket;
use crate::user::User;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Non-terminal tickets where `user` is the agent or the technician.
#[must_use]
pub fn active_count(user: UserId, tickets: &[Ticket]) -> usize {
    tickets
        .iter()
        .filter(|t| !t.status.is_terminal() && t.is_handled_by(user))
        .count()
}

/// Tickets currently in repair with `user` as technician.
#[must_use]
pub fn repair_count(user: UserId, tickets: &[Ticket]) -> usize {
    tickets
        .iter()
        .filter(|t| t.status == TicketStatus::InRepair && t.technician == Some(user))
        .count()
}

/// Whether `user` is below their ticket limit. Superadmins have no limit.
#[must_use]
pub fn can_receive_more(user: &User, tickets: &[Ticket]) -> bool {
    user.role == Role::SuperAdmin || active_count(user.id, tickets) < limit(user)
}

fn limit(user: &User) -> usize {
    usize::try_from(user.max_tickets).unwrap_or(usize::MAX)
}

/// Least-loaded active agent with spare capacity.
///
/// Ties go to the first agent in `users` order. Legacy employees are not part
/// of the automatic pool.
#[must_use]
pub fn pick_agent<'a>(users: &'a [User], tickets: &[Ticket]) -> Option<&'a User> {
    users
        .iter()
        .filter(|u| u.role == Role::Agent && u.is_active() && can_receive_more(u, tickets))
        .min_by_key(|u| active_count(u.id, tickets))
}

/// Least-loaded active technician with spare capacity, load being the number
/// of tickets in repair.
#[must_use]
pub fn pick_technician<'a>(users: &'a [User], tickets: &[Ticket]) -> Option<&'a User> {
    users
        .iter()
        .filter(|u| u.role == Role::Technician && u.is_active() && can_receive_more(u, tickets))
        .min_by_key(|u| repair_count(u.id, tickets))
}

/// Percentage of `limit` in use (0 when the limit is 0).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn load_percentage(active: usize, limit: u32) -> f64 {
    if limit == 0 {
        0.0
    } else {
        active as f64 * 100.0 / f64::from(limit)
    }
}

/// Current load of one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentLoad {
    /// Agent
    pub user_id: UserId,
    /// Login name
    pub username: String,
    /// Display name
    pub full_name: String,
    /// Tickets in open, in review, accepted or awaiting customer
    pub active_tickets: usize,
    /// Open or in-review tickets older than the review window
    pub stale_tickets: usize,
    /// Ticket limit
    pub limit: u32,
    /// `active / limit` as a percentage
    pub load_percentage: f64,
    /// `active >= limit`
    pub overloaded: bool,
}

/// Current load of one technician.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicianLoad {
    /// Technician
    pub user_id: UserId,
    /// Login name
    pub username: String,
    /// Display name
    pub full_name: String,
    /// Tickets in repair
    pub in_repair: usize,
    /// Ticket limit
    pub limit: u32,
    /// `in_repair / limit` as a percentage
    pub load_percentage: f64,
}

/// Load of every active agent and technician.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadReport {
    /// Agents in store order
    pub agents: Vec<AgentLoad>,
    /// Technicians in store order
    pub technicians: Vec<TechnicianLoad>,
}

/// Build the workload report.
///
/// A ticket is stale when it is still open or in review and was created more
/// than `review_window` before `now`.
#[must_use]
pub fn workload_report(
    users: &[User],
    tickets: &[Ticket],
    now: DateTime<Utc>,
    review_window: Duration,
) -> WorkloadReport {
    let stale_before = now - review_window;

    let agents = users
        .iter()
        .filter(|u| u.role == Role::Agent && u.is_active())
        .map(|u| {
            let mine = tickets.iter().filter(|t| t.agent == Some(u.id));
            let active_tickets = mine
                .clone()
                .filter(|t| t.status.is_active_for_agent())
                .count();
            let stale_tickets = mine
                .filter(|t| {
                    matches!(t.status, TicketStatus::Open | TicketStatus::InReview)
                        && t.created_at < stale_before
                })
                .count();
            AgentLoad {
                user_id: u.id,
                username: u.username.clone(),
                full_name: u.full_name.clone(),
                active_tickets,
                stale_tickets,
                limit: u.max_tickets,
                load_percentage: load_percentage(active_tickets, u.max_tickets),
                overloaded: active_tickets >= limit(u),
            }
        })
        .collect();

    let technicians = users
        .iter()
        .filter(|u| u.role == Role::Technician && u.is_active())
        .map(|u| {
            let in_repair = repair_count(u.id, tickets);
            TechnicianLoad {
                user_id: u.id,
                username: u.username.clone(),
                full_name: u.full_name.clone(),
                in_repair,
                limit: u.max_tickets,
                load_percentage: load_percentage(in_repair, u.max_tickets),
            }
        })
        .collect();

    WorkloadReport {
        agents,
        technicians,
    }
}
