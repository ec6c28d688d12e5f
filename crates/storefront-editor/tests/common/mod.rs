#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use storefront_editor::{
    ChannelNotifier, EditorEvent, MemoryStore, StorageError, StoreId, SyncService, Template,
    TemplateCache, TemplateId, TemplateStore, UpsertReceipt,
};

/// Memory-backed store whose reads and writes can be failed or held open
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,

    /// Upserts wait on this lock, so holding it keeps writes in flight
    pub hold: tokio::sync::Mutex<()>,

    /// Same for reads
    pub read_hold: tokio::sync::Mutex<()>,
    pub reads: AtomicUsize,

    /// Signalled each time an upsert reaches the store
    pub entered: Notify,

    /// `(template name, is_published)` of every upsert, in order
    pub written: Mutex<Vec<(String, bool)>>,
    pub upserts: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Seed a stored template without going through the write counters
    pub async fn seed(&self, store_id: &str, template: Template) {
        self.inner
            .upsert(&store_id.into(), &template.id.clone(), &template, false)
            .await
            .unwrap();
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<(String, bool)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateStore for ScriptedStore {
    async fn read(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
    ) -> Result<Template, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let _held = self.read_hold.lock().await;

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection refused".into()));
        }
        self.inner.read(store_id, template_id).await
    }

    async fn upsert(
        &self,
        store_id: &StoreId,
        template_id: &TemplateId,
        template: &Template,
        is_published: bool,
    ) -> Result<UpsertReceipt, StorageError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let _held = self.hold.lock().await;

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("write rejected".into()));
        }
        self.written
            .lock()
            .unwrap()
            .push((template.name.clone(), is_published));
        self.inner
            .upsert(store_id, template_id, template, is_published)
            .await
    }
}

pub struct Harness {
    pub store: Arc<ScriptedStore>,
    pub sync: Arc<SyncService>,
    pub events: tokio::sync::mpsc::UnboundedReceiver<EditorEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cache(TemplateCache::new())
    }

    pub fn with_cache(cache: TemplateCache) -> Self {
        let store = ScriptedStore::new();
        let (notifier, events) = ChannelNotifier::new();
        let sync = Arc::new(SyncService::new(
            Arc::new(cache),
            store.clone(),
            Arc::new(notifier),
        ));
        Self { store, sync, events }
    }

    /// Everything emitted so far
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Yield until `ready` holds; spawned tasks get to run in between
pub async fn wait_until(ready: impl Fn() -> bool) {
    while !ready() {
        tokio::task::yield_now().await;
    }
}

pub fn saved_events(events: &[EditorEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, EditorEvent::Saved { .. }))
        .count()
}
