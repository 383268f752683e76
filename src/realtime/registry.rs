//! Process-local connection state.
//!
//! An entry lives exactly as long as its socket and is never a source of
//! truth for room membership. Reconnecting starts from an empty
//! subscription set that the client rebuilds with join requests.
//!
//! Every mutation happens synchronously inside one lock acquisition, with
//! no suspension point between reading and updating an entry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::Identity;

use super::bus::Target;
use super::events::ServerEvent;

pub type ConnId = Uuid;

struct Connection {
    user_id: String,
    rooms: HashSet<String>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<ConnId, Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a verified identity. The returned receiver
    /// is the connection's delivery queue, drained by its socket task.
    /// Registering also puts the connection on the identity-keyed private
    /// channel (see [`Target::User`]).
    pub fn register(&self, user: &Identity) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::now_v7();
        let conn = Connection {
            user_id: user.id.clone(),
            rooms: HashSet::new(),
            tx,
        };
        self.inner.lock().unwrap().insert(id, conn);
        (id, rx)
    }

    /// Idempotent: returns false when the room was already subscribed (or
    /// the connection is gone).
    pub fn subscribe(&self, conn: ConnId, room_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(&conn) {
            Some(c) => c.rooms.insert(room_id.to_owned()),
            None => false,
        }
    }

    pub fn is_subscribed(&self, conn: ConnId, room_id: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.get(&conn).is_some_and(|c| c.rooms.contains(room_id))
    }

    /// Push an event to a single connection. Dropped silently if the
    /// connection disappeared mid-operation.
    pub fn send_to(&self, conn: ConnId, event: ServerEvent) {
        let inner = self.inner.lock().unwrap();
        if let Some(c) = inner.get(&conn) {
            let _ = c.tx.send(event);
        }
    }

    /// Deliver a bus envelope to every matching local connection.
    pub fn deliver(&self, target: &Target, event: &ServerEvent) {
        let inner = self.inner.lock().unwrap();
        for c in inner.values() {
            let matches = match target {
                Target::Room(room_id) => c.rooms.contains(room_id),
                Target::User(user_id) => c.user_id == *user_id,
            };
            if matches {
                let _ = c.tx.send(event.clone());
            }
        }
    }

    /// Drop all subscription state for a connection. Persistent room
    /// membership is untouched.
    pub fn remove(&self, conn: ConnId) {
        self.inner.lock().unwrap().remove(&conn);
    }
}
