use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use parley_wire::{WireError, read_frame, write_frame};

use crate::broadcast::ChatRoom;
use crate::registry::ParticipantId;

/// Policy for extracting a display name from an incoming message, applied
/// until a name is established.
///
/// Display-name assignment is application-layer sugar; the server never
/// parses message fields beyond what the policy looks at.
pub type NamePolicy = fn(&str) -> Option<String>;

/// Default policy, matching the chat GUI's convention: a message containing
/// no `#` field separator is a join announcement ("... joined chat: Alice"),
/// and its last whitespace-separated token is the display name.
pub fn default_name_policy(msg: &str) -> Option<String> {
    if msg.contains('#') {
        return None;
    }
    msg.split_whitespace().last().map(str::to_string)
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One connected chat session, bound to one transport connection.
///
/// The participant owns the write half of its connection; the read half is
/// consumed by the receive loop task. There is exactly one variant of
/// participant, so this is a plain struct plus a spawned task, not a
/// behavioral hierarchy.
pub struct Participant {
    id: ParticipantId,
    addr: SocketAddr,
    /// Write half. The mutex serializes frame writes so two broadcasts
    /// concurrently targeting this connection never interleave bytes.
    writer: Mutex<BoxedWriter>,
    /// Display name, set once the name policy matches an incoming message.
    display_name: RwLock<Option<String>>,
    /// Latched on the first entry into the terminal state.
    terminated: AtomicBool,
}

impl Participant {
    pub fn new(id: ParticipantId, addr: SocketAddr, writer: BoxedWriter) -> Arc<Self> {
        Arc::new(Self {
            id,
            addr,
            writer: Mutex::new(writer),
            display_name: RwLock::new(None),
            terminated: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn display_name(&self) -> Option<String> {
        self.display_name.read().await.clone()
    }

    pub(crate) async fn set_display_name(&self, name: String) {
        *self.display_name.write().await = Some(name);
    }

    /// Write one message to this participant's connection.
    ///
    /// Called by the broadcast engine only; the per-connection mutex makes
    /// concurrent `deliver` calls from different broadcasts serialize here.
    pub async fn deliver(&self, msg: &str) -> Result<(), WireError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, msg).await
    }

    /// Enter the terminal state. Returns `false` if some other path got
    /// there first; the terminal actions run exactly once.
    pub(crate) fn begin_termination(&self) -> bool {
        !self.terminated.swap(true, Ordering::SeqCst)
    }

    /// Best-effort close of the write half, sending FIN to the peer.
    pub(crate) async fn shutdown_writer(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// Register `participant` in the room and run its receive loop as an
/// independent task. Non-blocking for the listener.
pub fn spawn<R>(room: Arc<ChatRoom>, participant: Arc<Participant>, reader: R) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(run_receive_loop(room, participant, reader))
}

/// The participant's Active phase: one frame at a time, in arrival order,
/// each handed to the broadcast engine before the next read. Per-sender
/// broadcast ordering follows from this sequencing.
async fn run_receive_loop<R>(room: Arc<ChatRoom>, participant: Arc<Participant>, mut reader: R)
where
    R: AsyncRead + Unpin,
{
    room.registry().add(participant.clone()).await;
    info!(peer = %participant.id(), addr = %participant.addr(), "participant joined");

    loop {
        match read_frame(&mut reader).await {
            Ok(Some(msg)) => {
                if participant.display_name().await.is_none() {
                    if let Some(name) = (room.name_policy())(&msg) {
                        debug!(peer = %participant.id(), name = %name, "display name established");
                        participant.set_display_name(name).await;
                    }
                }
                room.broadcast(&msg).await;
            }
            Ok(None) => {
                debug!(peer = %participant.id(), "stream closed by peer");
                break;
            }
            Err(e) => {
                warn!(peer = %participant.id(), error = %e, "read failed");
                break;
            }
        }
    }

    room.terminate(&participant).await;
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::duplex_participant;

    // ── default_name_policy ─────────────────────────────────────────────

    #[test]
    fn name_from_join_announcement() {
        assert_eq!(
            default_name_policy("User joined chat: Alice"),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn structured_message_yields_no_name() {
        assert_eq!(default_name_policy("Alice#hello#12:00:00"), None);
    }

    #[test]
    fn blank_message_yields_no_name() {
        assert_eq!(default_name_policy("   "), None);
    }

    #[test]
    fn single_token_is_the_name() {
        assert_eq!(default_name_policy("Alice"), Some("Alice".to_string()));
    }

    // ── deliver ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn deliver_writes_one_frame() {
        let (participant, mut receiver) = duplex_participant(ParticipantId(1));
        participant.deliver("hello").await.unwrap();
        let msg = read_frame(&mut receiver).await.unwrap();
        assert_eq!(msg.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn deliver_fails_after_peer_drops() {
        let (participant, receiver) = duplex_participant(ParticipantId(1));
        drop(receiver);
        assert!(participant.deliver("hello").await.is_err());
    }

    #[tokio::test]
    async fn termination_latch_fires_once() {
        let (participant, _receiver) = duplex_participant(ParticipantId(1));
        assert!(participant.begin_termination());
        assert!(!participant.begin_termination());
    }

    #[tokio::test]
    async fn display_name_starts_unset() {
        let (participant, _receiver) = duplex_participant(ParticipantId(1));
        assert!(participant.display_name().await.is_none());
        participant.set_display_name("Alice".into()).await;
        assert_eq!(participant.display_name().await.as_deref(), Some("Alice"));
    }
}
