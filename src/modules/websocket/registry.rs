/// Presence Registry
///
/// Live mapping from an authenticated user to the one socket currently
/// serving them. The map is sharded, so sessions on every worker read and
/// write it without a global lock. Nothing here is persisted; after a restart
/// the map is rebuilt as clients reconnect.
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::ServerMessage;

/// Outbound side of one socket. `conn_id` distinguishes a reconnect from the
/// connection it replaced.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { conn_id: Uuid::now_v7(), tx }
    }

    /// Serializes and queues an event. Returns false when the socket is gone.
    pub fn send(&self, msg: &ServerMessage) -> bool {
        match serde_json::to_string(msg) {
            Ok(json) => self.tx.send(json).is_ok(),
            Err(e) => {
                tracing::error!("Failed to serialize server message: {}", e);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Clone, Default)]
pub struct PresenceRegistry {
    connections: Arc<DashMap<Uuid, ConnectionHandle>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the user to `handle`, silently replacing any previous connection.
    /// Returns the replaced handle, if any.
    pub fn register(&self, user_id: Uuid, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.connections.insert(user_id, handle)
    }

    /// Removes the mapping only while `conn_id` is still the registered
    /// connection. A superseded connection closing must not evict its successor.
    pub fn unregister(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        self.connections.remove_if(&user_id, |_, handle| handle.conn_id == conn_id).is_some()
    }

    pub fn lookup(&self, user_id: Uuid) -> Option<ConnectionHandle> {
        self.connections
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.lookup(user_id).is_some()
    }

    /// Pushes an event to the user's live connection. Offline is not an error.
    pub fn emit(&self, user_id: Uuid, msg: &ServerMessage) -> bool {
        match self.lookup(user_id) {
            Some(handle) => handle.send(msg),
            None => false,
        }
    }

    /// Sends to every connected user except `skip`. Returns the number reached.
    pub fn broadcast_except(&self, skip: Uuid, msg: &ServerMessage) -> usize {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize broadcast: {}", e);
                return 0;
            }
        };

        let targets: Vec<ConnectionHandle> = self
            .connections
            .iter()
            .filter(|entry| *entry.key() != skip)
            .map(|entry| entry.value().clone())
            .collect();

        targets.iter().filter(|handle| handle.tx.send(json.clone()).is_ok()).count()
    }

    /// Users with a live connection. Closed handles not yet unregistered are
    /// skipped, matching [`Self::is_online`].
    pub fn online_count(&self) -> usize {
        self.connections.iter().filter(|entry| !entry.value().is_closed()).count()
    }
}
