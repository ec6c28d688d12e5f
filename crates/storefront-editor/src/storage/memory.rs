//! In-memory template store for tests and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{PersistedRecord, TemplateStore, UpsertReceipt, not_found};
use crate::cache::CacheKey;
use crate::error::StorageError;
use crate::template::{StoreId, Template, TemplateId};

/// Keeps records in a map guarded by a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<CacheKey, PersistedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the full record (useful for testing)
    pub fn record(&self, store_id: &str, template_id: &str) -> Option<PersistedRecord> {
        self.records
            .lock()
            .ok()?
            .get(&CacheKey::new(store_id, template_id))
            .cloned()
    }

    /// Seed a record directly, bypassing upsert
    pub fn insert(&self, record: PersistedRecord) {
        if let Ok(mut records) = self.records.lock() {
            let key = CacheKey::new(record.store_id.clone(), record.template_id.clone());
            records.insert(key, record);
        }
    }

    /// Get number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn read(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
    ) -> Result<Template, StorageError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        records
            .get(&CacheKey::new(store_id.clone(), template_id.clone()))
            .map(|record| record.template_data.clone())
            .ok_or_else(|| not_found(store_id, template_id))
    }

    async fn upsert(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
        template: &Template,
        is_published: bool,
    ) -> Result<UpsertReceipt, StorageError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        let key = CacheKey::new(store_id.clone(), template_id.clone());
        let record = records
            .entry(key)
            .and_modify(|record| record.overwrite(template.clone(), is_published))
            .or_insert_with(|| {
                PersistedRecord::new(
                    store_id.clone(),
                    template_id.clone(),
                    template.clone(),
                    is_published,
                )
            });
        Ok(record.receipt())
    }
}
