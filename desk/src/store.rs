//! Persistence port.
//!
//! [`TicketStore`] is the collection interface the engine needs over tickets,
//! comments, users, categories and attachment metadata. Ticket updates use
//! optimistic concurrency: the caller's `version` must match the stored one
//! and the store bumps it on success.
//!
//! [`InMemoryStore`] keeps everything in insertion order, which the balancer
//! relies on for stable tie-breaking.

use crate::attachment::Attachment;
use crate::ticket::{Category, Comment, Ticket};
use crate::types::{CategoryId, ObjectKind, Role, TicketId, TicketStatus, UserId};
use crate::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Identifier
        id: String,
    },

    /// Uniqueness constraint violated
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Optimistic concurrency conflict: the ticket changed since it was read.
    #[error("Concurrency conflict on ticket {ticket_id}: expected version {expected}, found {actual}")]
    Conflict {
        /// Ticket
        ticket_id: TicketId,
        /// Version the caller read
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Ticket filter. Empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketQuery {
    /// Status must be one of these
    pub statuses: Option<Vec<TicketStatus>>,
    /// Filed by this customer
    pub customer: Option<UserId>,
    /// Assigned to this agent
    pub agent: Option<UserId>,
    /// Assigned to this technician
    pub technician: Option<UserId>,
    /// No agent assigned
    pub unassigned: bool,
    /// Exclude closed and rejected tickets
    pub non_terminal: bool,
    /// Created at or after
    pub created_from: Option<DateTime<Utc>>,
    /// Created at or before
    pub created_to: Option<DateTime<Utc>>,
}

impl TicketQuery {
    /// Matches every ticket
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to `statuses`
    #[must_use]
    pub fn with_statuses(mut self, statuses: impl Into<Vec<TicketStatus>>) -> Self {
        self.statuses = Some(statuses.into());
        self
    }

    /// Restrict to one customer
    #[must_use]
    pub const fn for_customer(mut self, customer: UserId) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Restrict to one agent
    #[must_use]
    pub const fn for_agent(mut self, agent: UserId) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Restrict to one technician
    #[must_use]
    pub const fn for_technician(mut self, technician: UserId) -> Self {
        self.technician = Some(technician);
        self
    }

    /// Only tickets without an agent
    #[must_use]
    pub const fn unassigned(mut self) -> Self {
        self.unassigned = true;
        self
    }

    /// Only open work (not closed, not rejected)
    #[must_use]
    pub const fn non_terminal(mut self) -> Self {
        self.non_terminal = true;
        self
    }

    /// Created inside `[from, to]`
    #[must_use]
    pub const fn created_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    /// Check if a ticket matches this filter
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self
            .statuses
            .as_ref()
            .is_some_and(|statuses| !statuses.contains(&ticket.status))
        {
            return false;
        }
        if self.customer.is_some_and(|c| ticket.customer != c) {
            return false;
        }
        if self.agent.is_some_and(|a| ticket.agent != Some(a)) {
            return false;
        }
        if self.technician.is_some_and(|t| ticket.technician != Some(t)) {
            return false;
        }
        if self.unassigned && ticket.agent.is_some() {
            return false;
        }
        if self.non_terminal && ticket.status.is_terminal() {
            return false;
        }
        if self.created_from.is_some_and(|from| ticket.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| ticket.created_at > to) {
            return false;
        }
        true
    }
}

/// Storage for the help desk's collections.
///
/// Listing operations return entities in insertion order.
#[async_trait]
pub trait TicketStore: Send + Sync {
    // ----- tickets -----

    /// Insert a new ticket.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when the id already exists.
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Load a ticket.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError>;

    /// Replace a ticket if its `version` matches the stored one.
    ///
    /// Returns the stored copy with the bumped version.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] on a version mismatch, [`StoreError::NotFound`]
    /// when absent.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, StoreError>;

    /// Tickets matching `query`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, StoreError>;

    // ----- comments -----

    /// Insert a comment.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the ticket does not exist.
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;

    /// Comments on a ticket, oldest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn comments_for(&self, ticket: TicketId) -> Result<Vec<Comment>, StoreError>;

    // ----- users -----

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when the username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Load a user.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn get_user(&self, id: UserId) -> Result<User, StoreError>;

    /// Replace a user.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Set a user's last activity, leaving every other field as stored.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn record_activity(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Users, optionally restricted to one role.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, StoreError>;

    // ----- categories -----

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when the name is taken (case-insensitive).
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;

    /// Load a category.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn get_category(&self, id: CategoryId) -> Result<Category, StoreError>;

    /// Replace a category.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn update_category(&self, category: &Category) -> Result<(), StoreError>;

    /// All categories.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    // ----- attachments -----

    /// Record attachment metadata.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when the id already exists.
    async fn insert_attachment(&self, attachment: &Attachment) -> Result<(), StoreError>;

    /// Attachments hanging off one object, oldest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn attachments_for(
        &self,
        object_id: Uuid,
        object_kind: ObjectKind,
    ) -> Result<Vec<Attachment>, StoreError>;
}

#[derive(Debug, Default)]
struct Collections {
    tickets: Vec<Ticket>,
    comments: Vec<Comment>,
    users: Vec<User>,
    categories: Vec<Category>,
    attachments: Vec<Attachment>,
}

/// In-memory store for tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.tickets.iter().any(|t| t.id == ticket.id) {
            return Err(StoreError::Duplicate(format!("ticket {}", ticket.id)));
        }
        inner.tickets.push(ticket.clone());
        Ok(())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError> {
        let inner = self.inner.read().await;
        inner
            .tickets
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ticket", id))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket.id)
            .ok_or_else(|| StoreError::not_found("ticket", ticket.id))?;

        if stored.version != ticket.version {
            return Err(StoreError::Conflict {
                ticket_id: ticket.id,
                expected: ticket.version,
                actual: stored.version,
            });
        }

        let mut next = ticket.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.tickets.iter().any(|t| t.id == comment.ticket) {
            return Err(StoreError::not_found("ticket", comment.ticket));
        }
        inner.comments.push(comment.clone());
        Ok(())
    }

    async fn comments_for(&self, ticket: TicketId) -> Result<Vec<Comment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.ticket == ticket)
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        if inner
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        let inner = self.inner.read().await;
        inner
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::not_found("user", user.id))?;
        *stored = user.clone();
        Ok(())
    }

    async fn record_activity(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        stored.last_activity = Some(at);
        Ok(())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect())
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .categories
            .iter()
            .any(|c| c.id == category.id || c.name.eq_ignore_ascii_case(&category.name))
        {
            return Err(StoreError::Duplicate(format!("category {}", category.name)));
        }
        inner.categories.push(category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StoreError> {
        let inner = self.inner.read().await;
        inner
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or_else(|| StoreError::not_found("category", category.id))?;
        *stored = category.clone();
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.inner.read().await.categories.clone())
    }

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.attachments.iter().any(|a| a.id == attachment.id) {
            return Err(StoreError::Duplicate(format!("attachment {}", attachment.id)));
        }
        inner.attachments.push(attachment.clone());
        Ok(())
    }

    async fn attachments_for(
        &self,
        object_id: Uuid,
        object_kind: ObjectKind,
    ) -> Result<Vec<Attachment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attachments
            .iter()
            .filter(|a| a.object_id == object_id && a.object_kind == object_kind)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::ticket::TicketDraft;
    use crate::types::UserStatus;

    #[tokio::test]
    async fn test_update_bumps_version_and_detects_conflicts() {
        let store = InMemoryStore::new();
        let ticket = Ticket::new(TicketDraft::default(), UserId::new(), Utc::now());
        store.insert_ticket(&ticket).await.unwrap();

        let mut first = store.get_ticket(ticket.id).await.unwrap();
        let mut second = first.clone();

        first.subject = "primero".into();
        let saved = store.update_ticket(&first).await.unwrap();
        assert_eq!(saved.version, 1);

        second.subject = "segundo".into();
        let err = store.update_ticket(&second).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                ticket_id: ticket.id,
                expected: 0,
                actual: 1
            }
        );
        assert_eq!(store.get_ticket(ticket.id).await.unwrap().subject, "primero");
    }

    #[tokio::test]
    async fn test_unique_usernames_and_category_names() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_user(&User::new("ana", "ana@example.com", "Ana", Role::Customer, now))
            .await
            .unwrap();
        let dup = store
            .insert_user(&User::new("ana", "otra@example.com", "Ana", Role::Customer, now))
            .await;
        assert!(matches!(dup, Err(StoreError::Duplicate(_))));

        store
            .insert_category(&Category::new("Hardware", 365, true, true, now))
            .await
            .unwrap();
        let dup = store
            .insert_category(&Category::new("hardware", 30, false, false, now))
            .await;
        assert!(matches!(dup, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_record_activity_keeps_other_fields() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let user = User::new("luis", "luis@example.com", "Luis", Role::Agent, now);
        store.insert_user(&user).await.unwrap();

        let mut deactivated = user.clone();
        deactivated.status = UserStatus::Inactive;
        store.update_user(&deactivated).await.unwrap();

        store.record_activity(user.id, now).await.unwrap();

        let stored = store.get_user(user.id).await.unwrap();
        assert_eq!(stored.status, UserStatus::Inactive);
        assert_eq!(stored.last_activity, Some(now));
        assert!(matches!(
            store.record_activity(UserId::new(), now).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = InMemoryStore::new();
        let agent = UserId::new();
        let now = Utc::now();

        let mut assigned = Ticket::new(TicketDraft::default(), UserId::new(), now);
        assigned.agent = Some(agent);
        assigned.status = TicketStatus::InReview;
        let open = Ticket::new(TicketDraft::default(), UserId::new(), now);
        let mut closed = Ticket::new(TicketDraft::default(), UserId::new(), now);
        closed.status = TicketStatus::Closed;

        for t in [&assigned, &open, &closed] {
            store.insert_ticket(t).await.unwrap();
        }

        let unassigned = store
            .list_tickets(&TicketQuery::all().with_statuses([TicketStatus::Open]).unassigned())
            .await
            .unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, open.id);

        let active = store
            .list_tickets(&TicketQuery::all().non_terminal())
            .await
            .unwrap();
        assert_eq!(active.len(), 2);

        let mine = store
            .list_tickets(&TicketQuery::all().for_agent(agent))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }
}
