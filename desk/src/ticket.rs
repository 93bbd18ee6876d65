//! Ticket aggregate, categories and comments.
//!
//! [`Ticket::prepare_for_save`] holds the persistence-time invariants and must
//! run before every write:
//!
//! - `closed_at` is set exactly while the status is `closed`
//! - closing backfills `resolved_at`
//! - response and resolution hours are computed once, then frozen
//! - warranty fields are recomputed only after the purchase date or the
//!   category changed

use crate::types::{CategoryId, ClaimType, CommentId, Priority, TicketId, TicketStatus, UserId, Visibility};
use crate::warranty;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Category
// ============================================================================

/// Product category with its warranty policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID
    pub id: CategoryId,
    /// Unique name
    pub name: String,
    /// Free text description
    pub description: String,
    /// Warranty window in days
    pub warranty_days: u32,
    /// Claims need an invoice number and a copy of the invoice
    pub requires_invoice: bool,
    /// Claims need a serial number
    pub requires_serial: bool,
    /// Inactive categories cannot be used for new tickets
    pub active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Creates an active category
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        warranty_days: u32,
        requires_invoice: bool,
        requires_serial: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            description: String::new(),
            warranty_days,
            requires_invoice,
            requires_serial,
            active: true,
            created_at: now,
        }
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// SLA
// ============================================================================

/// Time allowed before a ticket counts as overdue, per priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    /// Hours for critical tickets
    pub critical_hours: u32,
    /// Hours for high priority tickets
    pub high_hours: u32,
    /// Hours for medium priority tickets
    pub medium_hours: u32,
    /// Hours for low priority tickets
    pub low_hours: u32,
}

impl SlaPolicy {
    /// Window for `priority`
    #[must_use]
    pub fn window(&self, priority: Priority) -> Duration {
        let hours = match priority {
            Priority::Critical => self.critical_hours,
            Priority::High => self.high_hours,
            Priority::Medium => self.medium_hours,
            Priority::Low => self.low_hours,
        };
        Duration::hours(i64::from(hours))
    }
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_hours: 1,
            high_hours: 4,
            medium_hours: 24,
            low_hours: 72,
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Customer input for a new ticket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    /// Invoice number
    pub invoice_number: Option<String>,
    /// Product serial number
    pub serial_number: Option<String>,
    /// Purchase date
    pub purchase_date: Option<NaiveDate>,
    /// Short summary
    pub subject: String,
    /// Full description of the problem
    pub description: String,
    /// Product category
    pub category: Option<CategoryId>,
    /// Priority
    pub priority: Priority,
    /// Claim type
    pub claim_type: ClaimType,
}

/// Partial edit of a ticket's claim data. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEdit {
    /// New invoice number
    pub invoice_number: Option<String>,
    /// New serial number
    pub serial_number: Option<String>,
    /// New purchase date
    pub purchase_date: Option<NaiveDate>,
    /// New subject
    pub subject: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category: Option<CategoryId>,
    /// New priority
    pub priority: Option<Priority>,
}

/// A warranty or complaint case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket ID
    pub id: TicketId,
    /// Invoice number
    pub invoice_number: Option<String>,
    /// Product serial number
    pub serial_number: Option<String>,
    purchase_date: Option<NaiveDate>,
    /// Short summary
    pub subject: String,
    /// Full description
    pub description: String,
    category: Option<CategoryId>,
    /// Priority
    pub priority: Priority,
    /// Claim type
    pub claim_type: ClaimType,
    /// Current status
    pub status: TicketStatus,
    /// Customer who filed the ticket
    pub customer: UserId,
    /// Agent handling the claim
    pub agent: Option<UserId>,
    /// Technician handling the repair
    pub technician: Option<UserId>,
    /// Warranty coverage, as last computed
    pub warranty_valid: bool,
    /// Warranty expiry, as last computed
    pub warranty_expires_on: Option<NaiveDate>,
    /// Why the claim was rejected
    pub rejection_reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last write timestamp
    pub updated_at: DateTime<Utc>,
    /// When an agent was assigned
    pub assigned_at: Option<DateTime<Utc>>,
    /// First staff comment
    pub first_response_at: Option<DateTime<Utc>>,
    /// When the ticket was resolved
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the ticket was closed
    pub closed_at: Option<DateTime<Utc>>,
    /// Hours from creation to first response (frozen once set)
    pub response_hours: Option<f64>,
    /// Hours from creation to resolution (frozen once set)
    pub resolution_hours: Option<f64>,
    /// Optimistic concurrency version, bumped by the store on every update
    pub version: u64,
    #[serde(skip)]
    warranty_dirty: bool,
}

impl Ticket {
    /// Creates an open ticket from customer input.
    #[must_use]
    pub fn new(draft: TicketDraft, customer: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: TicketId::new(),
            invoice_number: draft.invoice_number,
            serial_number: draft.serial_number,
            purchase_date: draft.purchase_date,
            subject: draft.subject,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            claim_type: draft.claim_type,
            status: TicketStatus::Open,
            customer,
            agent: None,
            technician: None,
            warranty_valid: false,
            warranty_expires_on: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
            response_hours: None,
            resolution_hours: None,
            version: 0,
            warranty_dirty: true,
        }
    }

    /// Purchase date
    #[must_use]
    pub const fn purchase_date(&self) -> Option<NaiveDate> {
        self.purchase_date
    }

    /// Category
    #[must_use]
    pub const fn category(&self) -> Option<CategoryId> {
        self.category
    }

    /// Change the purchase date; warranty is recomputed on the next save
    pub fn set_purchase_date(&mut self, date: Option<NaiveDate>) {
        if self.purchase_date != date {
            self.purchase_date = date;
            self.warranty_dirty = true;
        }
    }

    /// Change the category; warranty is recomputed on the next save
    pub fn set_category(&mut self, category: Option<CategoryId>) {
        if self.category != category {
            self.category = category;
            self.warranty_dirty = true;
        }
    }

    /// Whether the warranty inputs changed since the last save
    #[must_use]
    pub const fn warranty_dirty(&self) -> bool {
        self.warranty_dirty
    }

    /// Apply an edit. Returns whether anything changed.
    pub fn apply_edit(&mut self, edit: TicketEdit) -> bool {
        let before = self.clone();
        if let Some(invoice) = edit.invoice_number {
            self.invoice_number = Some(invoice);
        }
        if let Some(serial) = edit.serial_number {
            self.serial_number = Some(serial);
        }
        if let Some(subject) = edit.subject {
            self.subject = subject;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(priority) = edit.priority {
            self.priority = priority;
        }
        if edit.purchase_date.is_some() {
            self.set_purchase_date(edit.purchase_date);
        }
        if edit.category.is_some() {
            self.set_category(edit.category);
        }
        *self != before
    }

    /// Enforce the persistence-time invariants. Call right before writing.
    ///
    /// `category` must be the ticket's current category (if any); it is only
    /// read when the warranty inputs are dirty.
    pub fn prepare_for_save(&mut self, category: Option<&Category>, now: DateTime<Utc>) {
        if self.status == TicketStatus::Closed {
            if self.closed_at.is_none() {
                self.closed_at = Some(now);
            }
            if self.resolved_at.is_none() {
                self.resolved_at = self.closed_at;
            }
        } else {
            self.closed_at = None;
        }

        if self.response_hours.is_none() {
            self.response_hours = self.first_response_at.map(|at| hours_between(self.created_at, at));
        }
        if self.resolution_hours.is_none() {
            self.resolution_hours = self.resolved_at.map(|at| hours_between(self.created_at, at));
        }

        if self.warranty_dirty {
            self.refresh_warranty(category, now.date_naive());
        }

        self.updated_at = now;
    }

    /// Recompute the warranty fields from the current inputs.
    pub fn refresh_warranty(&mut self, category: Option<&Category>, today: NaiveDate) {
        let window = category
            .filter(|c| Some(c.id) == self.category)
            .map(|c| c.warranty_days);
        match warranty::evaluate(self.purchase_date, window, today) {
            Ok(status) => {
                self.warranty_valid = status.valid;
                self.warranty_expires_on = Some(status.expires_on);
            }
            Err(_) => {
                self.warranty_valid = false;
                self.warranty_expires_on = None;
            }
        }
        self.warranty_dirty = false;
    }

    /// Whether the ticket has outlived its SLA window.
    ///
    /// Rejected and closed tickets are never overdue.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>, sla: &SlaPolicy) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.created_at
            .checked_add_signed(sla.window(self.priority))
            .is_some_and(|due| now > due)
    }

    /// Whether `user` is the agent or the technician
    #[must_use]
    pub fn is_handled_by(&self, user: UserId) -> bool {
        self.agent == Some(user) || self.technician == Some(user)
    }
}

#[allow(clippy::cast_precision_loss)] // Durations in seconds fit comfortably in f64
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

// ============================================================================
// Comment
// ============================================================================

/// A comment on a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID
    pub id: CommentId,
    /// Ticket the comment belongs to
    pub ticket: TicketId,
    /// Author
    pub author: UserId,
    /// Body
    pub text: String,
    /// Who can read it
    pub visibility: Visibility,
    /// First staff response on the ticket
    pub is_first_response: bool,
    /// Resolves the ticket
    pub resolves_ticket: bool,
    /// Written by the desk on a status change or assignment
    #[serde(default)]
    pub is_system: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Creates a comment
    #[must_use]
    pub fn new(
        ticket: TicketId,
        author: UserId,
        text: impl Into<String>,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CommentId::new(),
            ticket,
            author,
            text: text.into(),
            visibility,
            is_first_response: false,
            resolves_ticket: false,
            is_system: false,
            created_at: now,
        }
    }
}
