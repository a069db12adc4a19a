use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::participant::Participant;

/// Unique identifier for a connected participant.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ParticipantId(pub u64);

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Live-membership set of participants.
///
/// Shared by the listener (adds), every participant's own lifecycle (removes)
/// and the broadcast engine (snapshots). The lock is held only to mutate
/// membership or copy a snapshot, never across connection I/O.
pub struct Registry {
    participants: RwLock<HashMap<ParticipantId, Arc<Participant>>>,
    next_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            participants: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next participant id.
    pub fn next_id(&self) -> ParticipantId {
        ParticipantId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Insert a participant. Each participant is added at most once, when its
    /// receive loop starts.
    pub async fn add(&self, participant: Arc<Participant>) {
        let id = participant.id();
        let count = {
            let mut participants = self.participants.write().await;
            participants.insert(id, participant);
            participants.len()
        };
        debug!(peer = %id, participants = count, "participant registered");
    }

    /// Remove a participant if present. Returns `None` when it was already
    /// gone, so concurrent failure paths may double-remove safely.
    pub async fn remove(&self, id: ParticipantId) -> Option<Arc<Participant>> {
        let removed = self.participants.write().await.remove(&id);
        if removed.is_some() {
            debug!(peer = %id, "participant removed");
        }
        removed
    }

    /// A consistent point-in-time copy of the membership, for iteration
    /// without holding the lock across per-recipient writes.
    pub async fn snapshot(&self) -> Vec<Arc<Participant>> {
        self.participants.read().await.values().cloned().collect()
    }

    /// Number of currently-registered participants.
    pub async fn len(&self) -> usize {
        self.participants.read().await.len()
    }
}
