//! Error types for the storefront editor
//!
//! Errors are split by the layer that produces them: the persistence
//! collaborator reports [`StorageError`], the sync layer reports
//! [`SyncError`], and everything surfaces through [`EditorError`].

use thiserror::Error;

/// Main error type for the storefront editor
#[derive(Error, Debug)]
pub enum EditorError {
    /// Save or publish was requested before a store/template was bound
    #[error("No store/template context is bound to this session")]
    NoContext,

    /// The session opened another template while this save was queued
    #[error("Save dropped: the session switched templates before it was sent")]
    Superseded,

    /// Synchronization with the persistence service failed
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Persistence collaborator failure outside of the sync path
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration value
    #[error("Invalid configuration: {setting} - {reason}")]
    Config { setting: String, reason: String },

    /// A template broke the page/order invariants
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Errors reported by a [`TemplateStore`](crate::storage::TemplateStore)
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No record for store {store_id}, template {template_id}")]
    NotFound {
        store_id: String,
        template_id: String,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Errors raised while reconciling the session with the persistence service
///
/// Cloneable so a single write outcome can be handed to every caller whose
/// save request was coalesced into it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Failed to save template {template_id} for store {store_id}: {reason}")]
    WriteFailure {
        store_id: String,
        template_id: String,
        reason: String,
    },

    #[error("Failed to load template {template_id} for store {store_id}: {reason}")]
    ReadFailure {
        store_id: String,
        template_id: String,
        reason: String,
    },
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn config(setting: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            setting: setting.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}
