//! Persistence contract for templates
//!
//! The editor treats the backend as a key-value document store keyed by
//! `(store, template)`: one [`PersistedRecord`] per key, written by upsert.
//! Retried upserts must be idempotent; the editor does not deduplicate them.

#[cfg(feature = "fs")]
mod file;
mod memory;

#[cfg(feature = "fs")]
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::template::{RecordId, StoreId, Template, TemplateId};

/// The stored form of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub id: RecordId,
    pub store_id: StoreId,
    pub template_id: TemplateId,
    pub template_data: Template,
    pub is_published: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PersistedRecord {
    /// Create a fresh record with a generated id
    pub fn new(
        store_id: StoreId,
        template_id: TemplateId,
        template_data: Template,
        is_published: bool,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: RecordId(uuid::Uuid::new_v4().to_string()),
            store_id,
            template_id,
            template_data,
            is_published,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the record contents, keeping its id and creation time
    pub fn overwrite(&mut self, template_data: Template, is_published: bool) {
        self.template_data = template_data;
        self.is_published = is_published;
        self.updated_at = OffsetDateTime::now_utc();
    }

    pub fn receipt(&self) -> UpsertReceipt {
        UpsertReceipt {
            record_id: self.id.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// What an upsert reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReceipt {
    pub record_id: RecordId,
    pub updated_at: OffsetDateTime,
}

/// Storage trait for template persistence
#[async_trait]
pub trait TemplateStore: 'static + Sync + Send {
    /// Read the stored template; [`StorageError::NotFound`] if there is none
    async fn read(&self, store_id: &StoreId, template_id: &TemplateId)
        -> Result<Template, StorageError>;

    /// Insert or replace the record for `(store_id, template_id)`
    async fn upsert(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
        template: &Template,
        is_published: bool,
    ) -> Result<UpsertReceipt, StorageError>;
}

pub(crate) fn not_found(store_id: &StoreId, template_id: &TemplateId) -> StorageError {
    StorageError::NotFound {
        store_id: store_id.to_string(),
        template_id: template_id.to_string(),
    }
}
