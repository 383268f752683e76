//! Cross-process fan-out seam.
//!
//! A process never writes room traffic straight to its local sockets: it
//! publishes here, and one dispatcher task per process forwards envelopes
//! into that process's registry. The in-tree transport is a process-local
//! broadcast channel; a multi-process deployment swaps it for an external
//! pub/sub (Redis or similar) behind the same publish/subscribe surface.

use tokio::sync::broadcast;

use super::events::ServerEvent;

/// Receivers that fall behind see `RecvError::Lagged` and skip.
const BUS_CAPACITY: usize = 1024;

/// Where an envelope should be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Every connection subscribed to the room.
    Room(String),
    /// Every connection authenticated as the identity.
    User(String),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub target: Target,
    pub event: ServerEvent,
}

#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Envelope>,
}

impl Bus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish to every process on the bus, this one included. Publishing
    /// with no live subscribers is not an error.
    pub fn publish(&self, target: Target, event: ServerEvent) {
        let _ = self.tx.send(Envelope { target, event });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
