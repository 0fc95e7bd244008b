/// Presence Service
///
/// Wraps the in-memory [`PresenceRegistry`] with the side effects of a user
/// coming and going: peers are told through `user_online` / `user_offline`
/// right away, and the `is_online` / `last_seen` columns are written in the
/// background. Writes for one user land in the order the transitions
/// happened; a write overtaken by a newer one is skipped.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use super::message::ServerMessage;
use super::registry::{ConnectionHandle, PresenceRegistry};
use crate::modules::user::{model::UserProfile, repository::UserRepository};
use crate::utils::Clock;

#[derive(Clone)]
pub struct PresenceService {
    registry: PresenceRegistry,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
    sequence: Arc<AtomicU64>,
    // user -> sequence number of the last write that reached the store
    written: Arc<DashMap<Uuid, Arc<Mutex<u64>>>>,
}

impl PresenceService {
    pub fn with_dependencies(
        registry: PresenceRegistry,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PresenceService {
            registry,
            user_repo,
            clock,
            sequence: Arc::new(AtomicU64::new(0)),
            written: Arc::new(DashMap::new()),
        }
    }

    /// Registers the socket and announces the user. The returned handle
    /// resolves once the presence row has been written.
    pub fn connect(&self, profile: &UserProfile, handle: ConnectionHandle) -> JoinHandle<()> {
        if let Some(replaced) = self.registry.register(profile.id, handle) {
            tracing::debug!(user = %profile.id, old_conn = %replaced.conn_id, "Connection replaced");
        }

        let peers = self.registry.broadcast_except(profile.id, &ServerMessage::user_online(profile));
        tracing::info!(user = %profile.id, peers, "User online");

        self.persist(profile.id, true)
    }

    /// Forgets the connection. A connection already superseded by a newer one
    /// is dropped quietly and returns `None`.
    pub fn disconnect(&self, user_id: Uuid, conn_id: Uuid) -> Option<JoinHandle<()>> {
        if !self.registry.unregister(user_id, conn_id) {
            tracing::debug!(user = %user_id, conn = %conn_id, "Stale connection closed");
            return None;
        }

        let last_seen = self.clock.now();
        self.registry.broadcast_except(user_id, &ServerMessage::UserOffline { user_id, last_seen });
        tracing::info!(user = %user_id, "User offline");

        Some(self.persist(user_id, false))
    }

    fn persist(&self, user_id: Uuid, is_online: bool) -> JoinHandle<()> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let slot = self.written.entry(user_id).or_default().clone();
        let repo = self.user_repo.clone();
        let now = self.clock.now();

        tokio::spawn(async move {
            let mut last = slot.lock().await;
            if *last > seq {
                tracing::debug!(user = %user_id, seq, "Presence write superseded");
                return;
            }
            match repo.set_presence(&user_id, is_online, now).await {
                Ok(()) => *last = seq,
                Err(e) => log::error!("Failed to persist presence for {}: {}", user_id, e),
            }
        })
    }
}
