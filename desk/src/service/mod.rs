//! The help desk service.
//!
//! [`HelpDesk`] is the entry point callers use. Each operation:
//! 1. Loads what it needs from the store
//! 2. Checks permissions and runs the pure rules
//! 3. Enforces the save invariants and writes (optimistic concurrency)
//! 4. Emits domain events into the configured sink
//! 5. Sends notifications (failures are logged, never returned)

mod admin;
mod assignment;
mod comments;
mod lifecycle;
mod reports;

use crate::attachment::{AttachmentStore, InMemoryAttachmentStore};
use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::DeskError;
use crate::events::TicketEvent;
use crate::notifications::NotificationService;
use crate::policy::{Capability, can_view};
use crate::store::{InMemoryStore, TicketStore};
use crate::ticket::{Category, Ticket};
use crate::types::{TicketId, UserId};
use crate::user::User;
use helpdesk_core::environment::Clock;
use helpdesk_core::event::{EventSink, FanOutSink, NullSink};
use helpdesk_core::notify::Notifier;
use std::sync::Arc;

/// External collaborators of the help desk.
#[derive(Clone)]
pub struct DeskEnvironment {
    /// Collections
    pub store: Arc<dyn TicketStore>,
    /// Attachment contents
    pub attachments: Arc<dyn AttachmentStore>,
    /// Notification transport
    pub notifier: Arc<dyn Notifier>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Extra event sink (the audit log is always attached)
    pub events: Arc<dyn EventSink<TicketEvent>>,
}

impl DeskEnvironment {
    /// In-memory store and attachment store, no extra event sink.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            attachments: Arc::new(InMemoryAttachmentStore::new()),
            notifier,
            clock,
            events: Arc::new(NullSink),
        }
    }

    /// Replace the extra event sink
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink<TicketEvent>>) -> Self {
        self.events = events;
        self
    }
}

/// Ticket lifecycle and workload engine.
pub struct HelpDesk {
    store: Arc<dyn TicketStore>,
    attachments: Arc<dyn AttachmentStore>,
    clock: Arc<dyn Clock>,
    events: FanOutSink<TicketEvent>,
    audit: Arc<AuditLog>,
    notifications: NotificationService,
    config: Config,
}

impl HelpDesk {
    /// Create a help desk over `env`.
    #[must_use]
    pub fn new(env: DeskEnvironment, config: Config) -> Self {
        let audit = Arc::new(AuditLog::new());
        let events = FanOutSink::new(vec![
            audit.clone() as Arc<dyn EventSink<TicketEvent>>,
            env.events,
        ]);
        let notifications = NotificationService::new(env.notifier, &config);

        Self {
            store: env.store,
            attachments: env.attachments,
            clock: env.clock,
            events,
            audit,
            notifications,
            config,
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The audit log fed by this help desk
    #[must_use]
    pub fn audit_log(&self) -> Arc<AuditLog> {
        self.audit.clone()
    }

    /// Load a ticket as `viewer`.
    ///
    /// # Errors
    ///
    /// - [`DeskError::NotFound`] for an unknown ticket or viewer
    /// - [`DeskError::PermissionDenied`] when the viewer cannot see it
    pub async fn ticket(&self, viewer: UserId, ticket_id: TicketId) -> Result<Ticket, DeskError> {
        let viewer = self.store.get_user(viewer).await?;
        let ticket = self.store.get_ticket(ticket_id).await?;
        if !can_view(&viewer, &ticket) {
            return Err(DeskError::PermissionDenied(format!(
                "{} cannot view ticket {}",
                viewer.username,
                ticket.id.short()
            )));
        }
        Ok(ticket)
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    fn emit(&self, event: TicketEvent) {
        self.events.record(event);
    }

    async fn category_of(&self, ticket: &Ticket) -> Result<Option<Category>, DeskError> {
        match ticket.category() {
            Some(id) => Ok(Some(self.store.get_category(id).await?)),
            None => Ok(None),
        }
    }

    /// Enforce the save invariants and write, refreshing `ticket` with the
    /// stored copy (new version).
    async fn save(&self, ticket: &mut Ticket) -> Result<(), DeskError> {
        let category = if ticket.warranty_dirty() {
            self.category_of(ticket).await?
        } else {
            None
        };
        ticket.prepare_for_save(category.as_ref(), self.clock.now());
        *ticket = self.store.update_ticket(ticket).await?;
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<User, DeskError> {
        Ok(self.store.get_user(id).await?)
    }

    async fn optional_user(&self, id: Option<UserId>) -> Result<Option<User>, DeskError> {
        match id {
            Some(id) => Ok(Some(self.user(id).await?)),
            None => Ok(None),
        }
    }

    async fn touch(&self, user: &User) {
        if let Err(e) = self.store.record_activity(user.id, self.clock.now()).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to record user activity");
        }
    }
}

fn require(user: &User, capability: Capability) -> Result<(), DeskError> {
    if user.can(capability) {
        Ok(())
    } else {
        Err(DeskError::PermissionDenied(format!(
            "{} ({}) lacks {capability:?}",
            user.username, user.role
        )))
    }
}

fn require_text(text: &str, message: &str) -> Result<(), DeskError> {
    if text.trim().is_empty() {
        Err(DeskError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

impl std::fmt::Debug for HelpDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelpDesk")
            .field("config", &self.config)
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}
