//! Side channel for user-facing feedback
//!
//! The editor never renders anything itself. Save outcomes, load warnings and
//! undo/redo availability are pushed to a [`Notifier`] supplied by the host.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::template::RecordId;

/// Events the editor reports to the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// An explicit save or publish succeeded (never sent for autosaves)
    Saved {
        record_id: RecordId,
        published: bool,
    },

    /// A save failed; edits are not durable yet
    SaveFailed { reason: String },

    /// Loading failed and a fallback template is being shown
    LoadWarning { reason: String },

    /// Undo/redo availability changed
    HistoryChanged { can_undo: bool, can_redo: bool },
}

/// Receives editor events
pub trait Notifier: Send + Sync {
    fn notify(&self, event: EditorEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: EditorEvent) {}
}

/// Forwards events over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<EditorEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver the host reads from
    pub fn new() -> (Self, UnboundedReceiver<EditorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: EditorEvent) {
        // receiver gone means nobody is listening anymore
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut events) = ChannelNotifier::new();
        notifier.notify(EditorEvent::LoadWarning { reason: "offline".into() });
        notifier.notify(EditorEvent::HistoryChanged { can_undo: true, can_redo: false });

        assert_eq!(
            events.try_recv().unwrap(),
            EditorEvent::LoadWarning { reason: "offline".into() }
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            EditorEvent::HistoryChanged { can_undo: true, .. }
        ));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (notifier, events) = ChannelNotifier::new();
        drop(events);
        notifier.notify(EditorEvent::SaveFailed { reason: "x".into() });
    }
}
