//! Storefront editor is the editing engine behind a drag-and-drop storefront
//! template builder: a page/block document model, pure mutations, bounded
//! undo history, a TTL template cache and write-through persistence with
//! autosave.
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront_editor::{
//!     BlockKind, EditorConfig, EditorSession, MemoryStore, Mutation, NewBlock, NoopNotifier,
//!     SyncService, TemplateCache, defaults::blank_template, pages,
//! };
//!
//! # async fn demo() -> storefront_editor::Result<()> {
//! let config = EditorConfig::from_env()?;
//! let sync = Arc::new(SyncService::new(
//!     Arc::new(TemplateCache::with_ttl(config.cache_ttl)),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NoopNotifier),
//! ));
//!
//! let session = EditorSession::new(sync, config, blank_template("t1"));
//! session.open("s1", "t1").await;
//! session.apply(Mutation::AddBlock {
//!     page: pages::HOME.to_string(),
//!     block: NewBlock::new(BlockKind::Hero),
//! });
//! session.publish().await?;
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod block;
pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod history;
pub mod mutations;
pub mod notify;
pub mod session;
pub mod storage;
pub mod sync;
pub mod template;

// Re-export core types
pub use block::{Block, BlockKind, BlockStyles, NewBlock};
pub use cache::{CacheKey, TemplateCache};
pub use config::EditorConfig;
pub use error::{EditorError, Result, StorageError, SyncError};
pub use history::History;
pub use mutations::Mutation;
pub use notify::{ChannelNotifier, EditorEvent, NoopNotifier, Notifier};
pub use session::{EditorSession, SyncStatus, ViewMode};
#[cfg(feature = "fs")]
pub use storage::FileStore;
pub use storage::{MemoryStore, PersistedRecord, TemplateStore, UpsertReceipt};
pub use sync::{LoadedTemplate, SyncService, TemplateOrigin};
pub use template::{RecordId, StoreId, Template, TemplateBuilder, TemplateId, TemplateStyles, pages};

// Used by `new_block!`
#[doc(hidden)]
pub use serde_json;

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
