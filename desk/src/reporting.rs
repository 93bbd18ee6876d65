//! Metrics and reports.
//!
//! Aggregations over ticket snapshots. Averages skip tickets whose counter is
//! unset and are `None` when no ticket has one; rates are 0 over an empty set.

use crate::balancer::load_percentage;
use crate::ticket::{Category, SlaPolicy, Ticket};
use crate::types::{CategoryId, Priority, TicketStatus, UserId};
use crate::user::User;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used for tickets without a category.
pub const UNCATEGORIZED: &str = "Sin categoría";

/// Closed interval of creation timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Inclusive end
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Fill missing bounds: `end` defaults to `now`, `start` to `window_days`
    /// before `now`.
    #[must_use]
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Self {
        Self {
            start: start.unwrap_or_else(|| now - Duration::days(window_days)),
            end: end.unwrap_or(now),
        }
    }

    /// Whether `at` falls inside the range
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Ticket counts per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Open
    pub open: usize,
    /// In review
    pub in_review: usize,
    /// Accepted
    pub accepted: usize,
    /// Rejected
    pub rejected: usize,
    /// In repair
    pub in_repair: usize,
    /// Awaiting customer
    pub awaiting_customer: usize,
    /// Resolved
    pub resolved: usize,
    /// Closed
    pub closed: usize,
}

impl StatusCounts {
    fn slot(&mut self, status: TicketStatus) -> &mut usize {
        match status {
            TicketStatus::Open => &mut self.open,
            TicketStatus::InReview => &mut self.in_review,
            TicketStatus::Accepted => &mut self.accepted,
            TicketStatus::Rejected => &mut self.rejected,
            TicketStatus::InRepair => &mut self.in_repair,
            TicketStatus::AwaitingCustomer => &mut self.awaiting_customer,
            TicketStatus::Resolved => &mut self.resolved,
            TicketStatus::Closed => &mut self.closed,
        }
    }

    /// Count for one status
    #[must_use]
    pub const fn get(&self, status: TicketStatus) -> usize {
        match status {
            TicketStatus::Open => self.open,
            TicketStatus::InReview => self.in_review,
            TicketStatus::Accepted => self.accepted,
            TicketStatus::Rejected => self.rejected,
            TicketStatus::InRepair => self.in_repair,
            TicketStatus::AwaitingCustomer => self.awaiting_customer,
            TicketStatus::Resolved => self.resolved,
            TicketStatus::Closed => self.closed,
        }
    }

    /// Resolved plus closed
    #[must_use]
    pub const fn finished(&self) -> usize {
        self.resolved + self.closed
    }

    /// Not closed, not rejected
    #[must_use]
    pub const fn active(&self) -> usize {
        self.open + self.in_review + self.accepted + self.in_repair + self.awaiting_customer + self.resolved
    }
}

/// Aggregate over a set of tickets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Tickets considered
    pub total: usize,
    /// Counts per status
    pub by_status: StatusCounts,
    /// Counts per priority identifier
    pub by_priority: BTreeMap<String, usize>,
    /// Counts per category name
    pub by_category: BTreeMap<String, usize>,
    /// Mean response hours over tickets that have one
    pub avg_response_hours: Option<f64>,
    /// Mean resolution hours over tickets that have one
    pub avg_resolution_hours: Option<f64>,
    /// Tickets past their SLA window
    pub overdue: usize,
    /// Open tickets without an agent
    pub unassigned_open: usize,
    /// (resolved + closed) / total, 0 when empty
    pub resolution_rate: f64,
}

/// Metrics for one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Agent
    pub agent_id: UserId,
    /// Login name
    pub username: String,
    /// Display name
    pub full_name: String,
    /// Aggregate over the agent's tickets in range
    pub metrics: MetricsRecord,
}

/// Long-run performance of one staff member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    /// Staff member
    pub user_id: UserId,
    /// Tickets in open, in review, accepted or awaiting customer
    pub active: usize,
    /// Resolved or closed
    pub resolved: usize,
    /// Every ticket ever assigned
    pub total: usize,
    /// `resolved / total` as a percentage
    pub resolution_rate: f64,
    /// Mean resolution time in days
    pub avg_resolution_days: Option<f64>,
    /// `active / limit` as a percentage
    pub load_percentage: f64,
    /// `active >= limit`
    pub overloaded: bool,
}

/// Claim history of one customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerStats {
    /// Customer
    pub customer_id: UserId,
    /// Tickets filed
    pub total: usize,
    /// Accepted, in repair, resolved or closed
    pub approved: usize,
    /// Rejected
    pub rejected: usize,
    /// Resolved or closed
    pub resolved: usize,
    /// Not closed, not rejected
    pub active: usize,
    /// Mean resolution time in days
    pub avg_resolution_days: Option<f64>,
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Aggregate `tickets` (already scoped by the caller).
#[must_use]
pub fn summarize<'a>(
    tickets: impl IntoIterator<Item = &'a Ticket>,
    categories: &[Category],
    now: DateTime<Utc>,
    sla: &SlaPolicy,
) -> MetricsRecord {
    let names: BTreeMap<CategoryId, &str> =
        categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut record = MetricsRecord::default();
    for priority in Priority::ALL {
        record.by_priority.insert(priority.as_str().to_string(), 0);
    }

    let mut response = Vec::new();
    let mut resolution = Vec::new();

    for ticket in tickets {
        record.total += 1;
        *record.by_status.slot(ticket.status) += 1;
        *record
            .by_priority
            .entry(ticket.priority.as_str().to_string())
            .or_default() += 1;

        let category = ticket
            .category()
            .and_then(|id| names.get(&id).copied())
            .unwrap_or(UNCATEGORIZED);
        *record.by_category.entry(category.to_string()).or_default() += 1;

        if ticket.is_overdue(now, sla) {
            record.overdue += 1;
        }
        if ticket.status == TicketStatus::Open && ticket.agent.is_none() {
            record.unassigned_open += 1;
        }
        if let Some(hours) = ticket.response_hours {
            response.push(hours);
        }
        if let Some(hours) = ticket.resolution_hours {
            resolution.push(hours);
        }
    }

    record.avg_response_hours = mean(response.into_iter());
    record.avg_resolution_hours = mean(resolution.into_iter());
    record.resolution_rate = ratio(record.by_status.finished(), record.total);
    record
}

/// System-wide metrics for tickets created inside `range`.
#[must_use]
pub fn general_metrics(
    tickets: &[Ticket],
    categories: &[Category],
    range: DateRange,
    now: DateTime<Utc>,
    sla: &SlaPolicy,
) -> MetricsRecord {
    summarize(
        tickets.iter().filter(|t| range.contains(t.created_at)),
        categories,
        now,
        sla,
    )
}

/// Metrics per agent, in `agents` order, for tickets created inside `range`.
#[must_use]
pub fn per_agent_metrics(
    agents: &[User],
    tickets: &[Ticket],
    categories: &[Category],
    range: DateRange,
    now: DateTime<Utc>,
    sla: &SlaPolicy,
) -> Vec<AgentMetrics> {
    agents
        .iter()
        .map(|agent| AgentMetrics {
            agent_id: agent.id,
            username: agent.username.clone(),
            full_name: agent.full_name.clone(),
            metrics: summarize(
                tickets
                    .iter()
                    .filter(|t| t.agent == Some(agent.id) && range.contains(t.created_at)),
                categories,
                now,
                sla,
            ),
        })
        .collect()
}

/// Performance of `user` over every ticket they handle as agent or
/// technician.
#[must_use]
pub fn agent_performance(user: &User, tickets: &[Ticket]) -> AgentPerformance {
    let mine: Vec<&Ticket> = tickets.iter().filter(|t| t.is_handled_by(user.id)).collect();
    let active = mine.iter().filter(|t| t.status.is_active_for_agent()).count();
    let resolved = mine.iter().filter(|t| t.status.is_finished()).count();
    let total = mine.len();

    AgentPerformance {
        user_id: user.id,
        active,
        resolved,
        total,
        resolution_rate: ratio(resolved, total) * 100.0,
        avg_resolution_days: mean(mine.iter().filter_map(|t| t.resolution_hours).map(|h| h / 24.0)),
        load_percentage: load_percentage(active, user.max_tickets),
        overloaded: active >= usize::try_from(user.max_tickets).unwrap_or(usize::MAX),
    }
}

/// Claim history of `customer`.
#[must_use]
pub fn customer_stats(customer: UserId, tickets: &[Ticket]) -> CustomerStats {
    let mine: Vec<&Ticket> = tickets.iter().filter(|t| t.customer == customer).collect();

    CustomerStats {
        customer_id: customer,
        total: mine.len(),
        approved: mine.iter().filter(|t| t.status.is_approved()).count(),
        rejected: mine
            .iter()
            .filter(|t| t.status == TicketStatus::Rejected)
            .count(),
        resolved: mine.iter().filter(|t| t.status.is_finished()).count(),
        active: mine.iter().filter(|t| !t.status.is_terminal()).count(),
        avg_resolution_days: mean(mine.iter().filter_map(|t| t.resolution_hours).map(|h| h / 24.0)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::ticket::TicketDraft;
    use crate::types::Role;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()
    }

    fn ticket(status: TicketStatus, created: DateTime<Utc>) -> Ticket {
        let mut t = Ticket::new(TicketDraft::default(), UserId::new(), created);
        t.status = status;
        t
    }

    #[test]
    fn test_empty_set() {
        let record = summarize(std::iter::empty(), &[], now(), &SlaPolicy::default());
        assert_eq!(record.total, 0);
        assert!(record.avg_response_hours.is_none());
        assert!(record.resolution_rate.abs() < f64::EPSILON);
        assert_eq!(record.by_priority.len(), 4);
    }

    #[test]
    fn test_averages_skip_unset_counters() {
        let mut a = ticket(TicketStatus::Resolved, now());
        a.response_hours = Some(2.0);
        a.resolution_hours = Some(10.0);
        let mut b = ticket(TicketStatus::Closed, now());
        b.response_hours = Some(4.0);
        let c = ticket(TicketStatus::Open, now());

        let record = summarize([&a, &b, &c], &[], now(), &SlaPolicy::default());

        assert_eq!(record.avg_response_hours, Some(3.0));
        assert_eq!(record.avg_resolution_hours, Some(10.0));
        assert!((record.resolution_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(record.unassigned_open, 1);
        assert_eq!(record.by_category.get(UNCATEGORIZED), Some(&3));
    }

    #[test]
    fn test_range_filters_creation_time() {
        let inside = ticket(TicketStatus::Open, now() - Duration::days(3));
        let outside = ticket(TicketStatus::Open, now() - Duration::days(40));
        let range = DateRange::resolve(None, None, now(), 30);

        let record = general_metrics(
            &[inside, outside],
            &[],
            range,
            now(),
            &SlaPolicy::default(),
        );

        assert_eq!(record.total, 1);
        assert_eq!(record.overdue, 1);
    }

    #[test]
    fn test_per_agent_metrics() {
        let agent = User::new("luis", "luis@example.com", "Luis", Role::Agent, now());
        let mut mine = ticket(TicketStatus::Closed, now());
        mine.agent = Some(agent.id);
        let other = ticket(TicketStatus::Open, now());

        let range = DateRange::resolve(None, None, now(), 30);
        let metrics = per_agent_metrics(
            std::slice::from_ref(&agent),
            &[mine, other],
            &[],
            range,
            now(),
            &SlaPolicy::default(),
        );

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].metrics.total, 1);
        assert_eq!(metrics[0].metrics.by_status.closed, 1);
    }

    #[test]
    fn test_customer_stats() {
        let customer = UserId::new();
        let statuses = [
            TicketStatus::Open,
            TicketStatus::Accepted,
            TicketStatus::Rejected,
            TicketStatus::Closed,
        ];
        let tickets: Vec<_> = statuses
            .iter()
            .map(|s| {
                let mut t = ticket(*s, now());
                t.customer = customer;
                t
            })
            .collect();

        let stats = customer_stats(customer, &tickets);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.active, 2);
    }
}
