//! Ticket domain events.
//!
//! Every mutating service operation emits one or more of these into the
//! configured [`helpdesk_core::event::EventSink`]. The audit log is built from
//! them; nothing else observes writes.

use crate::types::{
    AttachmentId, CommentId, FileKind, ObjectKind, Priority, TicketId, TicketStatus, UserId,
    Visibility,
};
use chrono::{DateTime, Utc};
use helpdesk_core::event::DomainEvent;
use serde::{Deserialize, Serialize};

/// Something that happened to a ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TicketEvent {
    /// A customer filed a ticket
    TicketCreated {
        /// Ticket
        ticket_id: TicketId,
        /// Customer
        customer: UserId,
        /// Subject line
        subject: String,
        /// Invoice number, if given
        invoice_number: Option<String>,
        /// Category name, if any
        category: Option<String>,
        /// Priority
        priority: Priority,
        /// When
        at: DateTime<Utc>,
    },

    /// An agent took over the ticket
    AgentAssigned {
        /// Ticket
        ticket_id: TicketId,
        /// Agent
        agent: UserId,
        /// Chosen by the balancer rather than self-assigned
        automatic: bool,
        /// Who asked (None for automatic assignment)
        actor: Option<UserId>,
        /// When
        at: DateTime<Utc>,
    },

    /// A technician took over the repair
    TechnicianAssigned {
        /// Ticket
        ticket_id: TicketId,
        /// Technician
        technician: UserId,
        /// Chosen by the balancer rather than self-assigned
        automatic: bool,
        /// Who asked (None for automatic derivation)
        actor: Option<UserId>,
        /// When
        at: DateTime<Utc>,
    },

    /// Status moved
    StatusChanged {
        /// Ticket
        ticket_id: TicketId,
        /// Previous status
        from: TicketStatus,
        /// New status
        to: TicketStatus,
        /// Who moved it (None for automatic moves)
        actor: Option<UserId>,
        /// Rejection reason, when rejecting
        reason: Option<String>,
        /// When
        at: DateTime<Utc>,
    },

    /// Ticket entered `closed`
    TicketClosed {
        /// Ticket
        ticket_id: TicketId,
        /// Who closed it
        actor: Option<UserId>,
        /// When
        at: DateTime<Utc>,
    },

    /// A superadmin moved a ticket out of `closed`
    TicketReopened {
        /// Ticket
        ticket_id: TicketId,
        /// New status
        to: TicketStatus,
        /// Superadmin
        actor: Option<UserId>,
        /// When
        at: DateTime<Utc>,
    },

    /// A comment was written
    CommentAdded {
        /// Ticket
        ticket_id: TicketId,
        /// Comment
        comment_id: CommentId,
        /// Author
        author: UserId,
        /// Author display name
        author_name: String,
        /// Visibility
        visibility: Visibility,
        /// Text length in characters
        text_len: usize,
        /// The comment resolved the ticket
        resolves: bool,
        /// When
        at: DateTime<Utc>,
    },

    /// A file was attached
    AttachmentAdded {
        /// Ticket (also for files attached to one of its comments)
        ticket_id: TicketId,
        /// Attachment
        attachment_id: AttachmentId,
        /// File name as uploaded
        original_name: String,
        /// Classification
        kind: FileKind,
        /// Size in bytes
        size_bytes: u64,
        /// Ticket or comment
        object_kind: ObjectKind,
        /// Uploader
        actor: Option<UserId>,
        /// When
        at: DateTime<Utc>,
    },
}

impl TicketEvent {
    /// Ticket the event is about
    #[must_use]
    pub const fn ticket_id(&self) -> TicketId {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::AgentAssigned { ticket_id, .. }
            | Self::TechnicianAssigned { ticket_id, .. }
            | Self::StatusChanged { ticket_id, .. }
            | Self::TicketClosed { ticket_id, .. }
            | Self::TicketReopened { ticket_id, .. }
            | Self::CommentAdded { ticket_id, .. }
            | Self::AttachmentAdded { ticket_id, .. } => *ticket_id,
        }
    }

    /// When it happened
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::TicketCreated { at, .. }
            | Self::AgentAssigned { at, .. }
            | Self::TechnicianAssigned { at, .. }
            | Self::StatusChanged { at, .. }
            | Self::TicketClosed { at, .. }
            | Self::TicketReopened { at, .. }
            | Self::CommentAdded { at, .. }
            | Self::AttachmentAdded { at, .. } => *at,
        }
    }

    /// Who caused it, when known
    #[must_use]
    pub const fn actor(&self) -> Option<UserId> {
        match self {
            Self::TicketCreated { customer, .. } => Some(*customer),
            Self::CommentAdded { author, .. } => Some(*author),
            Self::AgentAssigned { actor, .. }
            | Self::TechnicianAssigned { actor, .. }
            | Self::StatusChanged { actor, .. }
            | Self::TicketClosed { actor, .. }
            | Self::TicketReopened { actor, .. }
            | Self::AttachmentAdded { actor, .. } => *actor,
        }
    }
}

impl DomainEvent for TicketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::TicketCreated { .. } => "TicketCreated.v1",
            Self::AgentAssigned { .. } => "AgentAssigned.v1",
            Self::TechnicianAssigned { .. } => "TechnicianAssigned.v1",
            Self::StatusChanged { .. } => "StatusChanged.v1",
            Self::TicketClosed { .. } => "TicketClosed.v1",
            Self::TicketReopened { .. } => "TicketReopened.v1",
            Self::CommentAdded { .. } => "CommentAdded.v1",
            Self::AttachmentAdded { .. } => "AttachmentAdded.v1",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_payload() {
        let ticket_id = TicketId::new();
        let event = TicketEvent::StatusChanged {
            ticket_id,
            from: TicketStatus::Open,
            to: TicketStatus::InReview,
            actor: None,
            reason: None,
            at: Utc::now(),
        };

        assert_eq!(event.event_type(), "StatusChanged.v1");
        assert_eq!(event.ticket_id(), ticket_id);

        let json = event.to_json().unwrap();
        assert_eq!(json["type"], "StatusChanged");
        assert_eq!(json["to"], "in_review");
    }
}
