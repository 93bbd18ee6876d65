//! File attachments.
//!
//! Uploads are checked (extension, size), classified, fingerprinted with
//! SHA-256 and written through an [`AttachmentStore`]. Metadata lives in the
//! [`crate::store::TicketStore`]; bytes live in the attachment store.

use crate::types::{AttachmentId, FileKind, ObjectKind, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Extensions accepted for upload and the kind each one maps to.
pub const ALLOWED_EXTENSIONS: &[(&str, FileKind)] = &[
    ("jpg", FileKind::Image),
    ("jpeg", FileKind::Image),
    ("png", FileKind::Image),
    ("webp", FileKind::Image),
    ("mp4", FileKind::Video),
    ("mov", FileKind::Video),
    ("pdf", FileKind::Document),
];

/// Errors for attachment checks and storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// Extension not in [`ALLOWED_EXTENSIONS`]
    #[error("File type not allowed: {0}")]
    ExtensionNotAllowed(String),

    /// Upload larger than the configured limit
    #[error("File too large: {size} bytes (max {max})")]
    TooLarge {
        /// Upload size
        size: u64,
        /// Limit
        max: u64,
    },

    /// Zero-byte upload
    #[error("File is empty")]
    Empty,

    /// Backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Raw upload as received from the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// Original file name
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Creates an upload
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Stored attachment metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment ID
    pub id: AttachmentId,
    /// Ticket or comment the file hangs off
    pub object_id: Uuid,
    /// Whether `object_id` is a ticket or a comment
    pub object_kind: ObjectKind,
    /// File name as uploaded
    pub original_name: String,
    /// Storage path
    pub path: String,
    /// Coarse classification
    pub kind: FileKind,
    /// MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// SHA-256 of the contents, hex encoded
    pub checksum: String,
    /// Uploader
    pub uploaded_by: Option<UserId>,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Human readable size
    #[must_use]
    pub fn display_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Lowercased extension of `file_name`, if any.
#[must_use]
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Kind of an allowed extension, `None` when it is not in
/// [`ALLOWED_EXTENSIONS`].
#[must_use]
pub fn classify(extension: &str) -> Option<FileKind> {
    ALLOWED_EXTENSIONS
        .iter()
        .find(|(allowed, _)| *allowed == extension)
        .map(|(_, kind)| *kind)
}

/// MIME type guessed from the file name.
#[must_use]
pub fn mime_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// SHA-256 of `bytes`, hex encoded.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Human readable size: `"512.0 B"`, `"1.5 KB"`, `"25.0 MB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Display only
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Check an upload and build its metadata.
///
/// The storage path is `tickets/<ticket>/<uuid>.<ext>` for ticket files and
/// `comments/<comment>/<uuid>.<ext>` for comment files.
///
/// # Errors
///
/// Returns [`AttachmentError`] for an empty upload, a disallowed extension or
/// a size over `max_bytes`.
pub fn inspect(
    upload: &Upload,
    object_id: Uuid,
    object_kind: ObjectKind,
    max_bytes: u64,
    uploaded_by: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Attachment, AttachmentError> {
    if upload.bytes.is_empty() {
        return Err(AttachmentError::Empty);
    }

    let extension = extension_of(&upload.file_name).unwrap_or_default();
    let kind = classify(&extension)
        .ok_or_else(|| AttachmentError::ExtensionNotAllowed(upload.file_name.clone()))?;

    let size = upload.bytes.len() as u64;
    if size > max_bytes {
        return Err(AttachmentError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let prefix = match object_kind {
        ObjectKind::Ticket => "tickets",
        ObjectKind::Comment => "comments",
    };

    Ok(Attachment {
        id: AttachmentId::new(),
        object_id,
        object_kind,
        original_name: upload.file_name.clone(),
        path: format!("{prefix}/{object_id}/{}.{extension}", Uuid::new_v4()),
        kind,
        mime_type: mime_type_for(&upload.file_name),
        size_bytes: size,
        checksum: checksum(&upload.bytes),
        uploaded_by,
        created_at: now,
    })
}

/// Blob storage for attachment contents.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Write `bytes` at `path`, replacing anything there.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Storage`] on backend failure.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), AttachmentError>;

    /// Read the contents at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Storage`] on backend failure.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, AttachmentError>;
}

/// In-memory attachment store for tests and the demo.
#[derive(Debug, Default)]
pub struct InMemoryAttachmentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryAttachmentStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), AttachmentError> {
        self.blobs
            .write()
            .await
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, AttachmentError> {
        Ok(self.blobs.read().await.get(path).cloned())
    }
}
