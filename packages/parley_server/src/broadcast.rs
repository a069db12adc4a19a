use std::sync::Arc;

use tracing::{info, warn};

use crate::participant::{NamePolicy, Participant};
use crate::registry::Registry;

/// Broadcast engine and participant-termination coordinator.
///
/// Owns the registry and the display-name policy; everything that mutates
/// membership or fans a message out goes through here.
pub struct ChatRoom {
    registry: Registry,
    name_policy: NamePolicy,
}

impl ChatRoom {
    pub fn new(name_policy: NamePolicy) -> Self {
        Self {
            registry: Registry::new(),
            name_policy,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn name_policy(&self) -> NamePolicy {
        self.name_policy
    }

    /// Deliver `msg` to every participant in a registry snapshot, the sender
    /// included (clients display their own messages from the echo).
    ///
    /// The snapshot is taken under the membership lock and released before
    /// any delivery, so a slow recipient never blocks membership changes. A
    /// failed delivery terminates that one recipient and the fan-out
    /// continues; one unreachable participant never aborts delivery to the
    /// others. No acknowledgment, retry, or buffering.
    pub async fn broadcast(&self, msg: &str) {
        let targets = self.registry.snapshot().await;
        for participant in targets {
            if let Err(e) = participant.deliver(msg).await {
                warn!(
                    peer = %participant.id(),
                    error = %e,
                    "delivery failed, dropping participant"
                );
                self.terminate(&participant).await;
            }
        }
    }

    /// Terminal actions for a participant, run exactly once regardless of
    /// which path got here first (receive-loop exit or delivery failure):
    /// remove from the registry, close the output stream, and announce the
    /// departure if a display name was ever established.
    pub async fn terminate(&self, participant: &Arc<Participant>) {
        if !participant.begin_termination() {
            return;
        }

        self.registry.remove(participant.id()).await;
        participant.shutdown_writer().await;
        let display_name = participant.display_name().await;
        info!(
            peer = %participant.id(),
            addr = %participant.addr(),
            name = display_name.as_deref().unwrap_or("<unnamed>"),
            "participant disconnected"
        );

        // Advisory departure notice. Delivered directly rather than through
        // broadcast(): failures here are ignored, so the notice can neither
        // block the termination path nor recurse into further terminations —
        // an unreachable recipient gets cleaned up by its own read loop.
        if let Some(name) = participant.display_name().await {
            let notice = format!("{name} left chat.");
            for peer in self.registry.snapshot().await {
                let _ = peer.deliver(&notice).await;
            }
        }
    }
}
