//! Outbound narration.
//!
//! The core never writes to a console or a socket. Everything a player should
//! read goes through an [`EventSink`], and the front end decides how to deliver
//! it. Sinks must never block the caller: they are invoked while entity locks
//! are held.

use log::warn;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use mud_shared::{EventKind, GameEvent};

/// Receiver of narration events
pub trait EventSink: Send + Sync {
    fn on_event(&self, kind: EventKind, target: &str, message: &str);
}

/// Handle that forwards events to a background delivery task (fire and forget)
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<GameEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver the delivery task drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GameEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, kind: EventKind, target: &str, message: &str) {
        if let Err(e) = self.sender.try_send(GameEvent::new(kind, target, message)) {
            warn!("Dropping {} event for {:?}: {}", kind, target, e);
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GameEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().clone()
    }

    /// Messages addressed to one target
    pub fn messages_for(&self, kind: EventKind, target: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind && e.target == target)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn on_event(&self, kind: EventKind, target: &str, message: &str) {
        self.events.lock().push(GameEvent::new(kind, target, message));
    }
}
