//! Service-level errors.
//!
//! Refused status transitions and automatic assignments that find nobody are
//! not errors; they come back as values so batch operations keep going.

use crate::attachment::AttachmentError;
use crate::store::StoreError;
use crate::types::UserId;
use thiserror::Error;

/// Errors returned by [`crate::HelpDesk`] operations.
#[derive(Error, Debug)]
pub enum DeskError {
    /// Input rejected
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Actor is not allowed to do this
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Self-assignment over the actor's ticket limit
    #[error("Capacity exceeded: user {user} holds {active} of {max} tickets")]
    CapacityExceeded {
        /// Actor
        user: UserId,
        /// Current non-terminal tickets
        active: usize,
        /// Limit
        max: u32,
    },

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Attachment rejected or could not be stored
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),
}

impl From<StoreError> for DeskError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

impl DeskError {
    /// Whether this error is an optimistic concurrency conflict
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::Conflict { .. }))
    }
}
