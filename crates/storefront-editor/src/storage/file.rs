use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{PersistedRecord, TemplateStore, UpsertReceipt, not_found};
use crate::error::StorageError;
use crate::template::{StoreId, Template, TemplateId};

/// File-based template store
///
/// Each record is one JSON document at
/// `{base}/stores/{store_id}/templates/{template_id}.json`.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new file store with the given base path
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the directory holding a store's templates
    fn templates_dir(&self, store_id: &StoreId) -> Result<PathBuf, StorageError> {
        Ok(self
            .base_path
            .join("stores")
            .join(path_segment(&store_id.0)?)
            .join("templates"))
    }

    fn record_file(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
    ) -> Result<PathBuf, StorageError> {
        Ok(self
            .templates_dir(store_id)?
            .join(format!("{}.json", path_segment(&template_id.0)?)))
    }

    /// Read the full record, `None` if it was never written
    pub async fn read_record(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
    ) -> Result<Option<PersistedRecord>, StorageError> {
        let path = self.record_file(store_id, template_id)?;
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }
}

#[async_trait]
impl TemplateStore for FileStore {
    async fn read(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
    ) -> Result<Template, StorageError> {
        self.read_record(store_id, template_id)
            .await?
            .map(|record| record.template_data)
            .ok_or_else(|| not_found(store_id, template_id))
    }

    async fn upsert(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
        template: &Template,
        is_published: bool,
    ) -> Result<UpsertReceipt, StorageError> {
        let record = match self.read_record(store_id, template_id).await? {
            Some(mut record) => {
                record.overwrite(template.clone(), is_published);
                record
            }
            None => PersistedRecord::new(
                store_id.clone(),
                template_id.clone(),
                template.clone(),
                is_published,
            ),
        };

        fs::create_dir_all(self.templates_dir(store_id)?).await?;

        // replaced atomically via rename
        let path = self.record_file(store_id, template_id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&record)?).await?;
        fs::rename(&tmp, &path).await?;

        Ok(record.receipt())
    }
}

/// Ids become single path components; anything that could leave the base
/// directory is rejected
fn path_segment(id: &str) -> Result<&str, StorageError> {
    let invalid = id.is_empty()
        || id == "."
        || id.contains("..")
        || id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::Backend(format!(
            "Invalid id for file storage: '{}'",
            id
        )));
    }
    Ok(id)
}
