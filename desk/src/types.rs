//! Domain types for the help desk.
//!
//! Identifiers, enumerations and small value objects shared by every other
//! module. Wire names (`as_str`) are stable lowercase identifiers; labels are
//! the user-facing Spanish names shown to customers and staff.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a ticket
    TicketId
);
uuid_id!(
    /// Unique identifier for a user (customer or staff)
    UserId
);
uuid_id!(
    /// Unique identifier for a category
    CategoryId
);
uuid_id!(
    /// Unique identifier for a comment
    CommentId
);
uuid_id!(
    /// Unique identifier for an attachment
    AttachmentId
);

impl TicketId {
    /// First eight characters of the id, used in subjects and log lines
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string().chars().take(8).collect()
    }
}

// ============================================================================
// Ticket enumerations
// ============================================================================

/// Ticket priority. Determines the SLA window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low priority
    Low,
    /// Medium priority (default)
    #[default]
    Medium,
    /// High priority
    High,
    /// Critical priority
    Critical,
}

impl Priority {
    /// Every priority, lowest first
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// User-facing label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Baja",
            Self::Medium => "Media",
            Self::High => "Alta",
            Self::Critical => "Crítica",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Filed, nobody looking at it yet
    #[default]
    Open,
    /// An agent is reviewing the claim
    InReview,
    /// Claim accepted, repair or resolution pending
    Accepted,
    /// Claim rejected (terminal)
    Rejected,
    /// A technician is repairing the product
    InRepair,
    /// Waiting for information from the customer
    AwaitingCustomer,
    /// Resolved, waiting to be closed
    Resolved,
    /// Closed (terminal)
    Closed,
}

impl TicketStatus {
    /// Every status in lifecycle order
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::InReview,
        Self::Accepted,
        Self::Rejected,
        Self::InRepair,
        Self::AwaitingCustomer,
        Self::Resolved,
        Self::Closed,
    ];

    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InReview => "in_review",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::InRepair => "in_repair",
            Self::AwaitingCustomer => "awaiting_customer",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// User-facing label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Abierto",
            Self::InReview => "En Revisión",
            Self::Accepted => "Aceptado",
            Self::Rejected => "Rechazado",
            Self::InRepair => "En Reparación",
            Self::AwaitingCustomer => "En Espera de Cliente",
            Self::Resolved => "Resuelto",
            Self::Closed => "Cerrado",
        }
    }

    /// Terminal statuses have no outgoing transitions for regular staff
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    /// Resolved or closed
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Statuses counted as "active" work for an agent
    #[must_use]
    pub const fn is_active_for_agent(self) -> bool {
        matches!(
            self,
            Self::Open | Self::InReview | Self::Accepted | Self::AwaitingCustomer
        )
    }

    /// Statuses counted as an approved claim in customer statistics
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::InRepair | Self::Resolved | Self::Closed
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the customer is claiming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Product failure covered by warranty
    #[default]
    Warranty,
    /// Complaint about the product or service
    Complaint,
    /// Return or exchange request
    Return,
    /// Anything else
    Other,
}

impl ClaimType {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warranty => "warranty",
            Self::Complaint => "complaint",
            Self::Return => "return",
            Self::Other => "other",
        }
    }
}

/// Comment visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible to everyone with access to the ticket
    #[default]
    Public,
    /// Staff only
    Private,
}

impl Visibility {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Actor role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Files tickets about their own purchases
    Customer,
    /// Customer-facing triage ("soporte")
    Agent,
    /// Hands-on repair ("soporte técnico")
    Technician,
    /// Unrestricted administrator
    SuperAdmin,
    /// Staff account from before the agent/technician split
    LegacyEmployee,
}

impl Role {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Agent => "agent",
            Self::Technician => "technician",
            Self::SuperAdmin => "superadmin",
            Self::LegacyEmployee => "legacy_employee",
        }
    }

    /// Anyone who is not a customer
    #[must_use]
    pub const fn is_staff(self) -> bool {
        !matches!(self, Self::Customer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Can log in and receive work
    #[default]
    Active,
    /// Deactivated
    Inactive,
}

// ============================================================================
// Attachments
// ============================================================================

/// Coarse file classification derived from the extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// jpg, jpeg, png, webp
    Image,
    /// mp4, mov
    Video,
    /// pdf
    Document,
}

impl FileKind {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

/// What an attachment hangs off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Attached to a ticket
    Ticket,
    /// Attached to a comment
    Comment,
}

impl ObjectKind {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Comment => "comment",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = TicketStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&TicketStatus::Rejected, &TicketStatus::Closed]);
    }

    #[test]
    fn test_short_id_is_eight_chars() {
        let id = TicketId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().replace('-', "").starts_with(&id.short()));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TicketStatus::AwaitingCustomer).unwrap();
        assert_eq!(json, "\"awaiting_customer\"");
    }
}
