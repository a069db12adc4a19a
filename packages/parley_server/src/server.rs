use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broadcast::ChatRoom;
use crate::participant::{self, NamePolicy, Participant, default_name_policy};

/// Errors fatal to starting the server. Everything after a successful bind
/// is contained per-connection and never surfaced here.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Knobs supplied by the application layer.
pub struct ServerOptions {
    /// How to derive a participant's display name from its messages.
    pub name_policy: NamePolicy,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            name_policy: default_name_policy,
        }
    }
}

/// A running chat server: the bound listener plus its accept-loop task.
pub struct ChatServer {
    room: Arc<ChatRoom>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl ChatServer {
    /// Bind `addr` and start accepting connections in the background.
    ///
    /// Bind failure is the one hard startup error. The accept loop runs
    /// until [`shutdown`](Self::shutdown).
    pub async fn serve(addr: SocketAddr, options: ServerOptions) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let room = Arc::new(ChatRoom::new(options.name_policy));
        let cancel = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(listener, room.clone(), cancel.clone()));

        info!(addr = %local_addr, "chat server listening");
        Ok(Self {
            room,
            local_addr,
            cancel,
            accept_task,
        })
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The room, for introspection (registry membership in tests).
    #[allow(dead_code)]
    pub fn room(&self) -> &Arc<ChatRoom> {
        &self.room
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Existing participants keep running until their own streams close;
    /// there is no cancellation path for them by design.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.accept_task.await;
        info!("chat server stopped");
    }
}

/// Accept connections indefinitely. A failed accept is logged and the loop
/// continues; only cancellation (the intentional close of the listening
/// socket) exits it.
async fn accept_loop(listener: TcpListener, room: Arc<ChatRoom>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("accept loop stopped");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!(%addr, "accepted connection");
                        start_participant(&room, stream, addr);
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

fn start_participant(room: &Arc<ChatRoom>, stream: TcpStream, addr: SocketAddr) {
    let (reader, writer) = stream.into_split();
    let participant = Participant::new(room.registry().next_id(), addr, Box::new(writer));
    participant::spawn(room.clone(), participant, reader);
}
