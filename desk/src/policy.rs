//! Role permissions.
//!
//! Every permission question is answered by one lookup:
//! [`has_capability`]`(role, capability)`. The table below is the single
//! source of truth for what each role may do.

use crate::ticket::{Comment, Ticket};
use crate::types::{Role, TicketStatus, Visibility};
use crate::user::User;
use serde::{Deserialize, Serialize};

/// A named permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// File new tickets
    CreateTickets,
    /// Work on tickets (view queue, handle claims)
    ManageTickets,
    /// Move tickets through the state machine
    ChangeTicketStatus,
    /// Assign tickets to agents by hand
    AssignTickets,
    /// Hand tickets to a technician by hand
    DeriveToTechnician,
    /// Self-assign unowned tickets
    TakeTickets,
    /// Replace the agent or technician already on a ticket
    ReassignFreely,
    /// See every ticket in the system
    AccessAllTickets,
    /// Edit claim data (invoice, serial, purchase date) on own tickets
    EditTicketData,
    /// Write and read private comments
    CommentPrivately,
    /// Register staff accounts
    CreateEmployees,
    /// Deactivate and reactivate accounts
    DeactivateUsers,
    /// Read the full audit trail
    ViewFullAudit,
    /// Create and deactivate categories
    ManageCategories,
    /// Change status outside the transition table
    ForceStatusChanges,
    /// Flag customers as VIP
    MarkCustomerVip,
    /// Restrict customers
    RestrictCustomers,
    /// Read internal notes and restriction details on accounts
    ViewInternalNotes,
    /// Append internal notes to accounts
    EditInternalNotes,
}

use Capability as C;

const CUSTOMER: &[Capability] = &[C::CreateTickets];

const AGENT: &[Capability] = &[
    C::ManageTickets,
    C::AccessAllTickets,
    C::ChangeTicketStatus,
    C::AssignTickets,
    C::DeriveToTechnician,
    C::TakeTickets,
    C::CommentPrivately,
    C::EditTicketData,
    C::ViewInternalNotes,
    C::EditInternalNotes,
];

const TECHNICIAN: &[Capability] = &[
    C::ManageTickets,
    C::AccessAllTickets,
    C::ChangeTicketStatus,
    C::TakeTickets,
    C::CommentPrivately,
    C::ViewInternalNotes,
];

/// Capabilities granted to `role`.
///
/// Superadmins are not listed: they hold every capability.
#[must_use]
pub const fn capabilities(role: Role) -> Option<&'static [Capability]> {
    match role {
        Role::Customer => Some(CUSTOMER),
        Role::Agent | Role::LegacyEmployee => Some(AGENT),
        Role::Technician => Some(TECHNICIAN),
        Role::SuperAdmin => None,
    }
}

/// Whether `role` holds `capability`.
#[must_use]
pub fn has_capability(role: Role, capability: Capability) -> bool {
    capabilities(role).is_none_or(|caps| caps.contains(&capability))
}

/// Whether `user` may edit the claim data of `ticket`.
///
/// Superadmins always can; staff holding [`Capability::EditTicketData`] when
/// they are the ticket's agent; customers while their own ticket is still open.
#[must_use]
pub fn can_edit(user: &User, ticket: &Ticket) -> bool {
    match user.role {
        Role::SuperAdmin => true,
        Role::Customer => ticket.customer == user.id && ticket.status == TicketStatus::Open,
        Role::Agent | Role::LegacyEmployee | Role::Technician => {
            user.can(C::EditTicketData) && ticket.agent == Some(user.id)
        }
    }
}

/// Whether `user` may see `ticket` at all.
#[must_use]
pub fn can_view(user: &User, ticket: &Ticket) -> bool {
    if user.role == Role::Customer {
        ticket.customer == user.id
    } else {
        user.can(C::AccessAllTickets)
    }
}

/// Whether `comment` is visible to someone with `role`.
#[must_use]
pub fn comment_visible_to(comment: &Comment, role: Role) -> bool {
    match comment.visibility {
        Visibility::Public => true,
        Visibility::Private => has_capability(role, C::CommentPrivately),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketDraft;
    use chrono::Utc;

    #[test]
    fn test_superadmin_has_everything() {
        assert!(has_capability(Role::SuperAdmin, C::ReassignFreely));
        assert!(has_capability(Role::SuperAdmin, C::ForceStatusChanges));
        assert!(has_capability(Role::SuperAdmin, C::CreateTickets));
    }

    #[test]
    fn test_customer_can_only_create() {
        assert!(has_capability(Role::Customer, C::CreateTickets));
        assert!(!has_capability(Role::Customer, C::ChangeTicketStatus));
        assert!(!has_capability(Role::Customer, C::CommentPrivately));
    }

    #[test]
    fn test_technician_cannot_assign_or_derive() {
        assert!(has_capability(Role::Technician, C::ChangeTicketStatus));
        assert!(!has_capability(Role::Technician, C::AssignTickets));
        assert!(!has_capability(Role::Technician, C::DeriveToTechnician));
    }

    #[test]
    fn test_only_superadmin_forces_or_reassigns() {
        for role in [Role::Customer, Role::Agent, Role::LegacyEmployee, Role::Technician] {
            assert!(!has_capability(role, C::ForceStatusChanges));
            assert!(!has_capability(role, C::ReassignFreely));
        }
    }

    #[test]
    fn test_legacy_employee_matches_agent() {
        for cap in AGENT {
            assert!(has_capability(Role::LegacyEmployee, *cap));
        }
        assert!(!has_capability(Role::LegacyEmployee, C::ViewFullAudit));
    }

    #[test]
    fn test_can_edit() {
        let now = Utc::now();
        let customer = User::new("ana", "ana@example.com", "Ana", Role::Customer, now);
        let agent = User::new("luis", "luis@example.com", "Luis", Role::Agent, now);
        let other_agent = User::new("eva", "eva@example.com", "Eva", Role::Agent, now);
        let admin = User::new("root", "root@example.com", "Root", Role::SuperAdmin, now);

        let mut ticket = Ticket::new(TicketDraft::default(), customer.id, now);
        assert!(can_edit(&customer, &ticket));
        assert!(!can_edit(&agent, &ticket));

        ticket.agent = Some(agent.id);
        ticket.status = TicketStatus::InReview;
        assert!(can_edit(&agent, &ticket));
        assert!(!can_edit(&other_agent, &ticket));
        assert!(!can_edit(&customer, &ticket));
        assert!(can_edit(&admin, &ticket));

        let tech = User::new("tito", "tito@example.com", "Tito", Role::Technician, now);
        ticket.agent = Some(tech.id);
        assert!(!can_edit(&tech, &ticket));
    }

    #[test]
    fn test_can_view() {
        let now = Utc::now();
        let customer = User::new("ana", "ana@example.com", "Ana", Role::Customer, now);
        let other = User::new("beto", "beto@example.com", "Beto", Role::Customer, now);
        let tech = User::new("tito", "tito@example.com", "Tito", Role::Technician, now);
        let ticket = Ticket::new(TicketDraft::default(), customer.id, now);

        assert!(can_view(&customer, &ticket));
        assert!(!can_view(&other, &ticket));
        assert!(can_view(&tech, &ticket));
    }
}
