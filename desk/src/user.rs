//! User accounts and account administration.
//!
//! Workload counters are not stored here: they are derived from the tickets
//! that reference a user (see [`crate::balancer`]).

use crate::error::DeskError;
use crate::policy::{Capability, has_capability};
use crate::types::{Role, UserId, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of simultaneous tickets a staff member can hold.
pub const DEFAULT_MAX_TICKETS: u32 = 10;

/// A customer or staff account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Login name (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Role
    pub role: Role,
    /// Account status
    pub status: UserStatus,
    /// Simultaneous non-terminal tickets this user may hold
    pub max_tickets: u32,
    /// Opted in to email notifications
    pub receive_notifications: bool,
    /// VIP customer
    pub is_vip: bool,
    /// When the VIP flag was set
    pub vip_since: Option<DateTime<Utc>>,
    /// Who set the VIP flag
    pub vip_marked_by: Option<UserId>,
    /// Customer under restriction (new tickets go to manual review)
    pub restricted: bool,
    /// Why the restriction was applied
    pub restriction_reason: Option<String>,
    /// When the restriction was applied
    pub restricted_at: Option<DateTime<Utc>>,
    /// Who applied the restriction
    pub restricted_by: Option<UserId>,
    /// Staff-only notes, newest last
    pub internal_notes: String,
    /// When the account was deactivated
    pub deactivated_at: Option<DateTime<Utc>>,
    /// Who deactivated the account
    pub deactivated_by: Option<UserId>,
    /// Why the account was deactivated
    pub deactivation_reason: Option<String>,
    /// Last time the user did anything
    pub last_activity: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an active account with default limits
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            full_name: full_name.into(),
            role,
            status: UserStatus::Active,
            max_tickets: DEFAULT_MAX_TICKETS,
            receive_notifications: true,
            is_vip: false,
            vip_since: None,
            vip_marked_by: None,
            restricted: false,
            restriction_reason: None,
            restricted_at: None,
            restricted_by: None,
            internal_notes: String::new(),
            deactivated_at: None,
            deactivated_by: None,
            deactivation_reason: None,
            last_activity: None,
            created_at: now,
        }
    }

    /// Sets the ticket limit
    #[must_use]
    pub const fn with_max_tickets(mut self, max_tickets: u32) -> Self {
        self.max_tickets = max_tickets;
        self
    }

    /// Whether the account is active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Whether the user holds `capability`
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        has_capability(self.role, capability)
    }

    /// Full name, or the username when no name was given
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    /// Copy without the fields only `ViewInternalNotes` holders may read
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            internal_notes: String::new(),
            restriction_reason: None,
            deactivation_reason: None,
            ..self.clone()
        }
    }

    /// Apply an administrative command issued by `actor`.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] when `actor` lacks the capability
    /// - [`DeskError::Validation`] for an empty reason or note, a non-customer
    ///   target of a customer-only command, or self-deactivation
    pub fn apply(
        &mut self,
        actor: &User,
        command: UserCommand,
        now: DateTime<Utc>,
    ) -> Result<(), DeskError> {
        let required = command.required_capability();
        if !actor.can(required) {
            return Err(DeskError::PermissionDenied(format!(
                "{} cannot {}",
                actor.role,
                command.name()
            )));
        }

        match command {
            UserCommand::MarkVip => {
                self.require_customer("Solo los clientes pueden ser marcados como VIP")?;
                self.is_vip = true;
                self.vip_since = Some(now);
                self.vip_marked_by = Some(actor.id);
            }
            UserCommand::RemoveVip => {
                self.require_customer("Solo los clientes pueden ser marcados como VIP")?;
                self.is_vip = false;
                self.vip_since = None;
                self.vip_marked_by = None;
            }
            UserCommand::Restrict { reason } => {
                self.require_customer("Solo se pueden restringir clientes")?;
                let reason = non_empty(reason, "Debe indicar el motivo de la restricción")?;
                self.restricted = true;
                self.restriction_reason = Some(reason);
                self.restricted_at = Some(now);
                self.restricted_by = Some(actor.id);
            }
            UserCommand::LiftRestriction => {
                self.require_customer("Solo se pueden restringir clientes")?;
                self.restricted = false;
                self.restriction_reason = None;
                self.restricted_at = None;
                self.restricted_by = None;
            }
            UserCommand::AddInternalNote { note } => {
                let note = non_empty(note, "La nota no puede estar vacía")?;
                if !self.internal_notes.is_empty() {
                    self.internal_notes.push('\n');
                }
                self.internal_notes.push_str(&format!(
                    "[{}] {}: {}",
                    now.format("%Y-%m-%d %H:%M"),
                    actor.full_name,
                    note
                ));
            }
            UserCommand::Deactivate { reason } => {
                if actor.id == self.id {
                    return Err(DeskError::Validation(
                        "No puede desactivar su propia cuenta".into(),
                    ));
                }
                let reason = non_empty(reason, "Debe indicar el motivo de la desactivación")?;
                self.status = UserStatus::Inactive;
                self.deactivation_reason = Some(reason);
                self.deactivated_at = Some(now);
                self.deactivated_by = Some(actor.id);
            }
            UserCommand::Activate => {
                self.status = UserStatus::Active;
                self.deactivation_reason = None;
                self.deactivated_at = None;
                self.deactivated_by = None;
            }
        }
        Ok(())
    }

    fn require_customer(&self, message: &str) -> Result<(), DeskError> {
        if self.role == Role::Customer {
            Ok(())
        } else {
            Err(DeskError::Validation(message.into()))
        }
    }
}

fn non_empty(value: String, message: &str) -> Result<String, DeskError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DeskError::Validation(message.into()))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Administrative commands on an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserCommand {
    /// Flag a customer as VIP
    MarkVip,
    /// Remove the VIP flag
    RemoveVip,
    /// Restrict a customer
    Restrict {
        /// Why
        reason: String,
    },
    /// Lift a restriction
    LiftRestriction,
    /// Append a timestamped note
    AddInternalNote {
        /// Note text
        note: String,
    },
    /// Deactivate the account
    Deactivate {
        /// Why
        reason: String,
    },
    /// Reactivate the account
    Activate,
}

impl UserCommand {
    /// Capability the issuing actor must hold
    #[must_use]
    pub const fn required_capability(&self) -> Capability {
        match self {
            Self::MarkVip | Self::RemoveVip => Capability::MarkCustomerVip,
            Self::Restrict { .. } | Self::LiftRestriction => Capability::RestrictCustomers,
            Self::AddInternalNote { .. } => Capability::EditInternalNotes,
            Self::Deactivate { .. } | Self::Activate => Capability::DeactivateUsers,
        }
    }

    /// Command name for logs and messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MarkVip => "mark_vip",
            Self::RemoveVip => "remove_vip",
            Self::Restrict { .. } => "restrict",
            Self::LiftRestriction => "lift_restriction",
            Self::AddInternalNote { .. } => "add_internal_note",
            Self::Deactivate { .. } => "deactivate",
            Self::Activate => "activate",
        }
    }
}

/// Registration input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Role
    pub role: Role,
    /// Ticket limit (defaults to [`DEFAULT_MAX_TICKETS`])
    pub max_tickets: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn admin() -> User {
        User::new("root", "root@example.com", "Root", Role::SuperAdmin, Utc::now())
    }

    fn customer() -> User {
        User::new("ana", "ana@example.com", "Ana Pérez", Role::Customer, Utc::now())
    }

    #[test]
    fn test_vip_requires_capability() {
        let agent = User::new("luis", "luis@example.com", "Luis", Role::Agent, Utc::now());
        let mut target = customer();

        let err = target.apply(&agent, UserCommand::MarkVip, Utc::now());
        assert!(matches!(err, Err(DeskError::PermissionDenied(_))));

        target.apply(&admin(), UserCommand::MarkVip, Utc::now()).unwrap();
        assert!(target.is_vip);
        assert!(target.vip_since.is_some());
    }

    #[test]
    fn test_vip_only_for_customers() {
        let mut agent = User::new("luis", "luis@example.com", "Luis", Role::Agent, Utc::now());
        let err = agent.apply(&admin(), UserCommand::MarkVip, Utc::now());
        assert!(matches!(err, Err(DeskError::Validation(_))));
    }

    #[test]
    fn test_restriction_needs_reason() {
        let mut target = customer();
        let err = target.apply(
            &admin(),
            UserCommand::Restrict { reason: "   ".into() },
            Utc::now(),
        );
        assert!(matches!(err, Err(DeskError::Validation(_))));
        assert!(!target.restricted);

        target
            .apply(
                &admin(),
                UserCommand::Restrict {
                    reason: "Reclamos fraudulentos".into(),
                },
                Utc::now(),
            )
            .unwrap();
        assert!(target.restricted);
        assert_eq!(target.restriction_reason.as_deref(), Some("Reclamos fraudulentos"));
    }

    #[test]
    fn test_internal_notes_append() {
        let agent = User::new("luis", "luis@example.com", "Luis", Role::Agent, Utc::now());
        let mut target = customer();

        target
            .apply(&agent, UserCommand::AddInternalNote { note: "Primera".into() }, Utc::now())
            .unwrap();
        target
            .apply(&agent, UserCommand::AddInternalNote { note: "Segunda".into() }, Utc::now())
            .unwrap();

        let lines: Vec<_> = target.internal_notes.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Luis: Primera"));
        assert!(lines[1].ends_with("Luis: Segunda"));
    }

    #[test]
    fn test_deactivate_and_activate() {
        let admin = admin();
        let mut target = User::new("eva", "eva@example.com", "Eva", Role::Agent, Utc::now());

        target
            .apply(&admin, UserCommand::Deactivate { reason: "Renuncia".into() }, Utc::now())
            .unwrap();
        assert!(!target.is_active());
        assert_eq!(target.deactivated_by, Some(admin.id));

        target.apply(&admin, UserCommand::Activate, Utc::now()).unwrap();
        assert!(target.is_active());
        assert!(target.deactivation_reason.is_none());
    }

    #[test]
    fn test_cannot_deactivate_self() {
        let mut admin = admin();
        let actor = admin.clone();
        let err = admin.apply(&actor, UserCommand::Deactivate { reason: "x".into() }, Utc::now());
        assert!(matches!(err, Err(DeskError::Validation(_))));
    }

    #[test]
    fn test_redacted_hides_staff_fields() {
        let agent = User::new("luis", "luis@example.com", "Luis", Role::Agent, Utc::now());
        let mut target = customer();
        target
            .apply(&agent, UserCommand::AddInternalNote { note: "Insiste".into() }, Utc::now())
            .unwrap();
        target
            .apply(&admin(), UserCommand::Restrict { reason: "Abuso".into() }, Utc::now())
            .unwrap();

        let public = target.redacted();
        assert!(public.internal_notes.is_empty());
        assert!(public.restriction_reason.is_none());
        assert!(public.restricted);
        assert_eq!(public.display_name(), "Ana Pérez");
    }
}
