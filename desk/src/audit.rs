//! Audit log.
//!
//! [`AuditLog`] is an event sink: plug it into the service and every ticket
//! event becomes an [`AuditEntry`].

use crate::events::TicketEvent;
use crate::types::{TicketId, UserId};
use chrono::{DateTime, Utc};
use helpdesk_core::event::EventSink;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Audit entry category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Ticket created
    Creation,
    /// Agent or technician assigned
    Assignment,
    /// Status changed
    StatusChange,
    /// Comment added
    Comment,
    /// File attached
    Attachment,
    /// Ticket closed
    Close,
    /// Ticket reopened
    Reopen,
}

/// One line of the audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID
    pub id: Uuid,
    /// Ticket
    pub ticket_id: TicketId,
    /// Category
    pub kind: AuditKind,
    /// Human readable description
    pub description: String,
    /// Structured details
    pub data: serde_json::Value,
    /// Who caused it
    pub actor: Option<UserId>,
    /// When
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build the entry describing `event`.
    #[must_use]
    pub fn from_event(event: &TicketEvent) -> Self {
        let (kind, description, data) = match event {
            TicketEvent::TicketCreated {
                subject,
                invoice_number,
                category,
                priority,
                ..
            } => (
                AuditKind::Creation,
                format!("Ticket creado: {subject}"),
                json!({
                    "invoice_number": invoice_number,
                    "category": category,
                    "priority": priority,
                }),
            ),
            TicketEvent::AgentAssigned {
                agent, automatic, ..
            } => (
                AuditKind::Assignment,
                "Agente asignado".to_string(),
                json!({ "agent": agent, "automatic": automatic }),
            ),
            TicketEvent::TechnicianAssigned {
                technician,
                automatic,
                ..
            } => (
                AuditKind::Assignment,
                "Derivado a técnico".to_string(),
                json!({ "technician": technician, "automatic": automatic }),
            ),
            TicketEvent::StatusChanged {
                from, to, reason, ..
            } => (
                AuditKind::StatusChange,
                format!("Estado cambiado de {from} a {to}"),
                json!({ "from": from, "to": to, "reason": reason }),
            ),
            TicketEvent::TicketClosed { .. } => (
                AuditKind::Close,
                "Ticket cerrado".to_string(),
                json!({}),
            ),
            TicketEvent::TicketReopened { to, .. } => (
                AuditKind::Reopen,
                format!("Ticket reabierto en estado {to}"),
                json!({ "to": to }),
            ),
            TicketEvent::CommentAdded {
                author_name,
                visibility,
                text_len,
                resolves,
                ..
            } => (
                AuditKind::Comment,
                format!("Nuevo comentario de {author_name}"),
                json!({
                    "visibility": visibility,
                    "text_len": text_len,
                    "resolves": resolves,
                }),
            ),
            TicketEvent::AttachmentAdded {
                original_name,
                kind,
                size_bytes,
                object_kind,
                ..
            } => (
                AuditKind::Attachment,
                format!("Archivo adjuntado: {original_name}"),
                json!({
                    "kind": kind,
                    "size_bytes": size_bytes,
                    "object_kind": object_kind,
                }),
            ),
        };

        Self {
            id: Uuid::new_v4(),
            ticket_id: event.ticket_id(),
            kind,
            description,
            data,
            actor: event.actor(),
            created_at: event.occurred_at(),
        }
    }
}

/// In-process audit trail fed by ticket events.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Creates an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for one ticket, newest first
    #[must_use]
    pub fn for_ticket(&self, ticket_id: TicketId) -> Vec<AuditEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<_> = entries
            .iter()
            .filter(|e| e.ticket_id == ticket_id)
            .cloned()
            .collect();
        found.reverse();
        found
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink<TicketEvent> for AuditLog {
    fn record(&self, event: TicketEvent) {
        let entry = AuditEntry::from_event(&event);
        tracing::debug!(
            ticket_id = %entry.ticket_id,
            kind = ?entry.kind,
            "Audit entry recorded"
        );
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
