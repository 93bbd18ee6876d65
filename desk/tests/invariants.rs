//! Property tests for the rules that must hold for every ticket.
//!
//! Run with: `cargo test -p helpdesk --test invariants`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use helpdesk::balancer::{active_count, pick_agent};
use helpdesk::ticket::{Category, SlaPolicy, Ticket, TicketDraft};
use helpdesk::user::User;
use helpdesk::warranty;
use helpdesk::{Priority, Role, TicketStatus, UserId};
use proptest::prelude::*;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn status() -> impl Strategy<Value = TicketStatus> {
    proptest::sample::select(TicketStatus::ALL.to_vec())
}

fn priority() -> impl Strategy<Value = Priority> {
    proptest::sample::select(Priority::ALL.to_vec())
}

fn ticket(priority: Priority) -> Ticket {
    Ticket::new(
        TicketDraft {
            subject: "prop".into(),
            description: "prop".into(),
            priority,
            ..TicketDraft::default()
        },
        UserId::new(),
        epoch(),
    )
}

proptest! {
    #[test]
    fn closed_at_set_exactly_when_closed(
        path in proptest::collection::vec(status(), 1..12),
    ) {
        let mut t = ticket(Priority::Medium);
        for (step, next) in path.into_iter().enumerate() {
            t.status = next;
            let step = i64::try_from(step).unwrap();
            t.prepare_for_save(None, epoch() + Duration::hours(step));
            prop_assert_eq!(t.closed_at.is_some(), t.status == TicketStatus::Closed);
            if t.status == TicketStatus::Closed {
                prop_assert!(t.resolved_at.is_some());
            }
        }
    }

    #[test]
    fn frozen_hours_never_change(
        response_secs in 0i64..500_000,
        resolution_secs in 0i64..500_000,
        later in 1i64..100,
    ) {
        let mut t = ticket(Priority::High);
        t.first_response_at = Some(epoch() + Duration::seconds(response_secs));
        t.resolved_at = Some(epoch() + Duration::seconds(resolution_secs));
        t.prepare_for_save(None, epoch());
        let response = t.response_hours;
        let resolution = t.resolution_hours;
        prop_assert!(response.is_some() && resolution.is_some());

        t.first_response_at = Some(epoch() + Duration::days(later));
        t.resolved_at = Some(epoch() + Duration::days(later * 2));
        t.prepare_for_save(None, epoch() + Duration::days(later));

        prop_assert_eq!(t.response_hours, response);
        prop_assert_eq!(t.resolution_hours, resolution);
    }

    #[test]
    fn terminal_tickets_are_never_overdue(
        priority in priority(),
        closed in any::<bool>(),
        age_hours in 0i64..10_000,
    ) {
        let mut t = ticket(priority);
        t.status = if closed { TicketStatus::Closed } else { TicketStatus::Rejected };
        prop_assert!(!t.is_overdue(epoch() + Duration::hours(age_hours), &SlaPolicy::default()));
    }

    #[test]
    fn balancer_never_exceeds_capacity(
        limits in proptest::collection::vec(1u32..5, 1..5),
        assignments in proptest::collection::vec((0usize..5, status()), 0..30),
    ) {
        let agents: Vec<User> = limits
            .iter()
            .enumerate()
            .map(|(i, max)| {
                User::new(format!("agent{i}"), format!("agent{i}@example.com"), "Agent", Role::Agent, epoch())
                    .with_max_tickets(*max)
            })
            .collect();

        let tickets: Vec<Ticket> = assignments
            .into_iter()
            .map(|(who, status)| {
                let mut t = ticket(Priority::Low);
                t.agent = Some(agents[who % agents.len()].id);
                t.status = status;
                t
            })
            .collect();

        match pick_agent(&agents, &tickets) {
            Some(agent) => {
                let load = active_count(agent.id, &tickets);
                prop_assert!(load < usize::try_from(agent.max_tickets).unwrap());
                for other in &agents {
                    let other_load = active_count(other.id, &tickets);
                    if other_load < usize::try_from(other.max_tickets).unwrap() {
                        prop_assert!(load <= other_load);
                    }
                }
            }
            None => {
                for agent in &agents {
                    prop_assert!(
                        active_count(agent.id, &tickets) >= usize::try_from(agent.max_tickets).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn warranty_verdict_is_deterministic(
        age_days in 0u64..2_000,
        warranty_days in 0u32..1_000,
    ) {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let purchase = today.checked_sub_days(Days::new(age_days)).unwrap();

        let first = warranty::evaluate(Some(purchase), Some(warranty_days), today).unwrap();
        let second = warranty::evaluate(Some(purchase), Some(warranty_days), today).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.valid, age_days <= u64::from(warranty_days));
        prop_assert_eq!(
            first.expires_on,
            purchase.checked_add_days(Days::new(u64::from(warranty_days))).unwrap()
        );
    }

    #[test]
    fn warranty_refresh_matches_evaluate(
        age_days in 0u64..2_000,
        warranty_days in 1u32..1_000,
    ) {
        let category = Category::new("Prop", warranty_days, false, false, epoch());
        let today = epoch().date_naive();
        let purchase = today.checked_sub_days(Days::new(age_days)).unwrap();

        let mut t = Ticket::new(
            TicketDraft {
                purchase_date: Some(purchase),
                category: Some(category.id),
                ..TicketDraft::default()
            },
            UserId::new(),
            epoch(),
        );
        t.prepare_for_save(Some(&category), epoch());

        let expected = warranty::evaluate(Some(purchase), Some(warranty_days), today).unwrap();
        prop_assert_eq!(t.warranty_valid, expected.valid);
        prop_assert_eq!(t.warranty_expires_on, Some(expected.expires_on));
        prop_assert!(!t.warranty_dirty());
    }
}
