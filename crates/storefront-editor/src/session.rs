//! # Edit Session Management
//!
//! An [`EditorSession`] is one user's view of one template. It routes UI
//! edits through the mutation engine, records them in the undo history,
//! tracks unsaved changes and keeps the autosave timer running while there
//! are any.
//!
//! ## Persistence status
//!
//! ```text
//! Clean --(edit)--> Dirty --(save ok)--> Clean
//!                     |
//!                     +--(save failed)--> Dirty (cache invalidated, retried next tick)
//! ```
//!
//! Dirty means the current template differs from the last one confirmed by
//! the store, so undoing back to the saved state makes the session clean
//! again.
//!
//! ## Context changes
//!
//! Every `open`/`close` bumps an epoch. A load or save that completes after
//! the epoch moved on is discarded instead of being applied to the new
//! context. Writes already sent are never cancelled, only their results.
//!
//! ## Saves
//!
//! A session sends one save at a time. A save requested while another is in
//! flight waits its turn and then sends the template as it is at that point,
//! so edits made while waiting go out with it.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::cache::CacheKey;
use crate::config::EditorConfig;
use crate::defaults::fallback_template;
use crate::error::{EditorError, Result, SyncError};
use crate::history::History;
use crate::mutations::{Mutation, ensure_page};
use crate::notify::EditorEvent;
use crate::sync::{SyncService, TemplateOrigin};
use crate::template::{RecordId, StoreId, Template, TemplateId, pages};

/// Device preview the canvas is drawn for; the editor only stores it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// Whether the session has edits the store has not confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Clean,
    Dirty,
}

struct SessionState {
    context: Option<CacheKey>,
    epoch: u64,
    current: Template,
    last_saved: Template,
    dirty: bool,
    history: History,
    active_page: String,
    selected_block: Option<String>,
    view_mode: ViewMode,
    /// Dropping the sender stops the autosave loop after any save in flight
    autosave: Option<oneshot::Sender<()>>,
}

impl SessionState {
    fn history_flags(&self) -> (bool, bool) {
        (self.history.can_undo(), self.history.can_redo())
    }

    fn autosave_armed(&self) -> bool {
        self.autosave.as_ref().is_some_and(|stop| !stop.is_closed())
    }

    fn cancel_autosave(&mut self) {
        if self.autosave.take().is_some() {
            debug!("Autosave cancelled");
        }
    }

    /// Switch to `template` as if freshly loaded: clean, with a new history
    fn reset(&mut self, template: Template, history_limit: usize) {
        let template = ensure_page(&template, pages::HOME).into_owned();
        self.history = History::with_limit(template.clone(), history_limit);
        self.last_saved = template.clone();
        self.current = template;
        self.dirty = false;
        self.active_page = pages::HOME.to_string();
        self.selected_block = None;
    }
}

struct SessionInner {
    sync: Arc<SyncService>,
    config: EditorConfig,
    state: Mutex<SessionState>,

    /// Held while a save is being sent
    save_turn: tokio::sync::Mutex<()>,
}

/// Snapshot taken before a save is sent
struct SaveTicket {
    epoch: u64,
    key: CacheKey,
    template: Template,
}

/// Single-user editing session over one template
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

impl EditorSession {
    /// Create an unbound session showing `initial`
    ///
    /// Edits are tracked but nothing is saved until a store/template is bound
    /// with [`open`](Self::open).
    pub fn new(sync: Arc<SyncService>, config: EditorConfig, initial: Template) -> Self {
        let initial = ensure_page(&initial, pages::HOME).into_owned();
        let state = SessionState {
            context: None,
            epoch: 0,
            current: initial.clone(),
            last_saved: initial.clone(),
            dirty: false,
            history: History::with_limit(initial, config.history_limit),
            active_page: pages::HOME.to_string(),
            selected_block: None,
            view_mode: ViewMode::default(),
            autosave: None,
        };

        Self {
            inner: Arc::new(SessionInner {
                sync,
                config,
                state: Mutex::new(state),
                save_turn: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Bind the session to a store/template and load it
    ///
    /// Unknown templates start from the built-in default for `template_id`.
    /// Returns `None` if another `open`/`close` superseded this one while the
    /// load was in flight.
    pub async fn open(
        &self,
        store_id: impl Into<StoreId>,
        template_id: impl Into<TemplateId>,
    ) -> Option<TemplateOrigin> {
        let key = CacheKey::new(store_id, template_id);
        let epoch = {
            let mut state = self.inner.lock();
            state.cancel_autosave();
            state.context = None;
            state.epoch += 1;
            state.epoch
        };

        let fallback = fallback_template(key.template_id.as_ref());
        let loaded = self
            .inner
            .sync
            .load(&key.store_id, &key.template_id, fallback)
            .await;

        let events = {
            let mut state = self.inner.lock();
            if state.epoch != epoch {
                debug!(store = %key.store_id, template = %key.template_id, "Discarding stale load");
                return None;
            }
            let before = state.history_flags();
            state.reset(loaded.template, self.inner.config.history_limit);
            info!(store = %key.store_id, template = %key.template_id, origin = ?loaded.origin, "Editor session opened");
            state.context = Some(key);
            history_events(before, state.history_flags())
        };
        self.inner.emit(events);
        Some(loaded.origin)
    }

    /// Unbind the session, dropping any unsaved edits
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.cancel_autosave();
        state.context = None;
        state.epoch += 1;
    }

    /// Apply a user edit; returns whether the template changed
    pub fn apply(&self, mutation: Mutation) -> bool {
        let events = {
            let mut state = self.inner.lock();
            let before = state.history_flags();
            let next = match mutation.apply(&state.current) {
                std::borrow::Cow::Borrowed(_) => return false,
                std::borrow::Cow::Owned(next) => next,
            };
            if next == state.current {
                return false;
            }
            debug_assert!(
                next.validate().is_ok(),
                "{} broke template invariants",
                mutation.name()
            );
            debug!(mutation = mutation.name(), "Applying mutation");

            state.history.record(next.clone());
            state.current = next;
            self.inner.refresh_dirty(&mut state);
            history_events(before, state.history_flags())
        };
        self.inner.emit(events);
        true
    }

    /// Switch the active page, creating it if needed; clears the selection
    pub fn select_page(&self, page: impl Into<String>) {
        let page = page.into();
        self.apply(Mutation::EnsurePage { page: page.clone() });

        let mut state = self.inner.lock();
        state.active_page = page;
        state.selected_block = None;
    }

    /// Select a block on the active page, or clear the selection with `None`
    ///
    /// Returns false (and clears the selection) if the block is not on the
    /// active page.
    pub fn select_block(&self, block_id: Option<&str>) -> bool {
        let mut state = self.inner.lock();
        let found = block_id
            .filter(|id| state.current.block(&state.active_page, id).is_some())
            .map(str::to_string);
        let selected = found.is_some() || block_id.is_none();
        state.selected_block = found;
        selected
    }

    /// Step back in history; returns whether anything changed
    pub fn undo(&self) -> bool {
        self.replay(|history| history.undo().cloned())
    }

    /// Step forward in history; returns whether anything changed
    pub fn redo(&self) -> bool {
        self.replay(|history| history.redo().cloned())
    }

    // History moves are never recorded back into history.
    fn replay(&self, step: impl FnOnce(&mut History) -> Option<Template>) -> bool {
        let events = {
            let mut state = self.inner.lock();
            let before = state.history_flags();
            let Some(template) = step(&mut state.history) else {
                return false;
            };
            let active_page = state.active_page.clone();
            state.current = ensure_page(&template, &active_page).into_owned();
            self.inner.refresh_dirty(&mut state);
            history_events(before, state.history_flags())
        };
        self.inner.emit(events);
        true
    }

    /// Save the current template explicitly
    pub async fn save(&self) -> Result<RecordId> {
        self.inner.save(false, false).await
    }

    /// Save the current template and mark it published
    pub async fn publish(&self) -> Result<RecordId> {
        self.inner.save(true, false).await
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.inner.lock().view_mode = mode;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.inner.lock().view_mode
    }

    /// Copy of the template being edited
    pub fn template(&self) -> Template {
        self.inner.lock().current.clone()
    }

    pub fn active_page(&self) -> String {
        self.inner.lock().active_page.clone()
    }

    /// Blocks of the active page
    pub fn active_blocks(&self) -> Vec<Block> {
        let state = self.inner.lock();
        state
            .current
            .page(&state.active_page)
            .map(<[Block]>::to_vec)
            .unwrap_or_default()
    }

    /// The selected block as it currently is, if it still exists
    pub fn selected_block(&self) -> Option<Block> {
        let state = self.inner.lock();
        let id = state.selected_block.as_deref()?;
        state.current.block(&state.active_page, id).cloned()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    pub fn status(&self) -> SyncStatus {
        if self.is_dirty() {
            SyncStatus::Dirty
        } else {
            SyncStatus::Clean
        }
    }

    pub fn can_undo(&self) -> bool {
        self.inner.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.lock().history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// The bound store/template, if any
    pub fn context(&self) -> Option<(StoreId, TemplateId)> {
        self.inner
            .lock()
            .context
            .as_ref()
            .map(|key| (key.store_id.clone(), key.template_id.clone()))
    }

    /// Whether the autosave timer is armed
    pub fn autosave_pending(&self) -> bool {
        self.inner.lock().autosave_armed()
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.inner.lock().cancel_autosave();
    }
}

impl SessionInner {
    // State is plain data and every update completes before unlocking.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, events: Vec<EditorEvent>) {
        for event in events {
            self.sync.notifier().notify(event);
        }
    }

    /// Recompute the dirty flag and arm or cancel autosave to match
    fn refresh_dirty(self: &Arc<Self>, state: &mut SessionState) {
        state.dirty = state.current != state.last_saved;
        if !state.dirty {
            state.cancel_autosave();
        } else if state.context.is_some() && !state.autosave_armed() {
            state.autosave = self.spawn_autosave(state.epoch);
        }
    }

    fn spawn_autosave(self: &Arc<Self>, epoch: u64) -> Option<oneshot::Sender<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime available, autosave disabled");
            return None;
        };
        let session: Weak<SessionInner> = Arc::downgrade(self);
        let period = self.config.autosave_interval;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        debug!(?period, "Autosave armed");

        // detached; a tick that started always runs its save to completion
        let _task = runtime.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = tokio::time::sleep(period) => {}
                }
                let Some(inner) = session.upgrade() else {
                    break;
                };
                if !inner.autosave_tick(epoch).await {
                    break;
                }
            }
        });
        Some(stop_tx)
    }

    /// One autosave attempt; returns whether the timer should keep running
    async fn autosave_tick(self: &Arc<Self>, epoch: u64) -> bool {
        {
            let state = self.lock();
            if state.epoch != epoch || !state.dirty {
                return false;
            }
        }
        debug!("Autosave tick");
        match self.save(false, true).await {
            Ok(_) => self.lock().dirty,
            Err(EditorError::NoContext | EditorError::Superseded) => false,
            Err(_) => true,
        }
    }

    fn requested_epoch(&self) -> Result<u64> {
        let state = self.lock();
        match state.context {
            Some(_) => Ok(state.epoch),
            None => Err(EditorError::NoContext),
        }
    }

    /// Snapshot the template to send; taken only once it is this save's turn
    fn ticket(&self, requested_epoch: u64) -> Result<SaveTicket> {
        let state = self.lock();
        let key = state.context.clone().ok_or(EditorError::NoContext)?;
        if state.epoch != requested_epoch {
            return Err(EditorError::Superseded);
        }
        Ok(SaveTicket {
            epoch: state.epoch,
            key,
            template: state.current.clone(),
        })
    }

    /// Save the current template; `silent` suppresses the success event
    async fn save(self: &Arc<Self>, publish: bool, silent: bool) -> Result<RecordId> {
        let requested_epoch = self.requested_epoch()?;
        let _turn = self.save_turn.lock().await;
        let ticket = self.ticket(requested_epoch)?;
        let result = self
            .sync
            .save(
                &ticket.key.store_id,
                &ticket.key.template_id,
                ticket.template.clone(),
                publish,
            )
            .await;

        let events = self.finish_save(ticket, &result, publish, silent);
        self.emit(events);
        result.map_err(EditorError::from)
    }

    fn finish_save(
        self: &Arc<Self>,
        ticket: SaveTicket,
        result: &std::result::Result<RecordId, SyncError>,
        published: bool,
        silent: bool,
    ) -> Vec<EditorEvent> {
        let mut state = self.lock();
        if state.epoch != ticket.epoch {
            debug!(store = %ticket.key.store_id, template = %ticket.key.template_id, "Discarding stale save result");
            return Vec::new();
        }

        match result {
            Ok(record_id) => {
                state.last_saved = ticket.template;
                self.refresh_dirty(&mut state);
                if silent {
                    Vec::new()
                } else {
                    vec![EditorEvent::Saved {
                        record_id: record_id.clone(),
                        published,
                    }]
                }
            }
            Err(e) => {
                // dirty stays set; the next autosave tick retries
                vec![EditorEvent::SaveFailed {
                    reason: e.to_string(),
                }]
            }
        }
    }
}

fn history_events(before: (bool, bool), after: (bool, bool)) -> Vec<EditorEvent> {
    if before == after {
        return Vec::new();
    }
    vec![EditorEvent::HistoryChanged {
        can_undo: after.0,
        can_redo: after.1,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, NewBlock};
    use crate::cache::TemplateCache;
    use crate::notify::NoopNotifier;
    use crate::storage::MemoryStore;

    fn session() -> EditorSession {
        let sync = Arc::new(SyncService::new(
            Arc::new(TemplateCache::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(NoopNotifier),
        ));
        EditorSession::new(sync, EditorConfig::default(), fallback_template("t1"))
    }

    fn add(page: &str, id: &str) -> Mutation {
        Mutation::AddBlock {
            page: page.to_string(),
            block: NewBlock::new(BlockKind::Text).with_id(id),
        }
    }

    #[test]
    fn test_unbound_session_tracks_edits_without_autosave() {
        let session = session();
        assert!(session.apply(add(pages::HOME, "a")));
        assert!(session.is_dirty());
        assert!(!session.autosave_pending());
        assert!(session.context().is_none());
    }

    #[test]
    fn test_noop_mutation_is_not_recorded() {
        let session = session();
        let changed = session.apply(Mutation::DeleteBlock {
            page: pages::HOME.into(),
            block_id: "ghost".into(),
        });
        assert!(!changed);
        assert_eq!(session.history_len(), 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_undo_back_to_saved_state_is_clean() {
        let session = session();
        session.apply(add(pages::HOME, "a"));
        assert!(session.undo());
        assert!(!session.is_dirty());
        assert!(session.redo());
        assert!(session.is_dirty());
        assert!(!session.redo());
    }

    #[test]
    fn test_select_page_creates_page_and_clears_selection() {
        let session = session();
        session.apply(add(pages::HOME, "a"));
        assert!(session.select_block(Some("a")));
        assert_eq!(session.selected_block().map(|b| b.id), Some("a".to_string()));

        session.select_page(pages::CART);
        assert_eq!(session.active_page(), pages::CART);
        assert!(session.selected_block().is_none());
        assert!(session.template().has_page(pages::CART));
        assert!(session.active_blocks().is_empty());

        // switching to an existing page adds no history entry
        let len = session.history_len();
        session.select_page(pages::HOME);
        assert_eq!(session.history_len(), len);
    }

    #[test]
    fn test_select_unknown_block_clears_selection() {
        let session = session();
        session.apply(add(pages::HOME, "a"));
        session.select_block(Some("a"));
        assert!(!session.select_block(Some("missing")));
        assert!(session.selected_block().is_none());
        assert!(session.select_block(None));
    }

    #[test]
    fn test_undo_keeps_active_page_present() {
        let session = session();
        session.select_page(pages::CHECKOUT);
        session.undo();
        assert!(session.template().has_page(pages::CHECKOUT));
        assert_eq!(session.active_page(), pages::CHECKOUT);
    }

    #[test]
    fn test_view_mode_round_trip() {
        let session = session();
        assert_eq!(session.view_mode(), ViewMode::Desktop);
        session.set_view_mode(ViewMode::Mobile);
        assert_eq!(session.view_mode(), ViewMode::Mobile);
    }

    #[tokio::test]
    async fn test_save_without_context_fails() {
        let session = session();
        session.apply(add(pages::HOME, "a"));
        assert!(matches!(session.save().await, Err(EditorError::NoContext)));
        assert!(session.is_dirty());
    }
}
