use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use parley_wire::{read_frame, write_frame};

/// Errors surfaced to the client application.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The connection is down; no further messages can be submitted.
    #[error("connection closed")]
    Closed,
}

/// One client connection to a chat server.
///
/// Internally two tasks: a reader forwarding every received frame into the
/// incoming channel, and a writer owning the write half and draining the
/// outbound channel. Dropping the client stops both and closes the
/// connection.
pub struct ChatClient {
    outbound: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<String>,
}

impl ChatClient {
    /// Connect to a server and start the connection tasks.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr, source })?;
        let (reader, writer) = stream.into_split();

        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(reader_task(reader, incoming_tx));
        tokio::spawn(writer_task(writer, outbound_rx));

        Ok(Self { outbound, incoming })
    }

    /// Submit a message for sending. Fails once the connection is down.
    pub fn send(&self, msg: impl Into<String>) -> Result<(), ClientError> {
        self.outbound.send(msg.into()).map_err(|_| ClientError::Closed)
    }

    /// The next message received from the server; `None` after disconnect.
    pub async fn recv(&mut self) -> Option<String> {
        self.incoming.recv().await
    }
}

/// Forward each received frame to the application until the stream ends.
async fn reader_task(mut reader: OwnedReadHalf, incoming_tx: mpsc::UnboundedSender<String>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(msg)) => {
                if incoming_tx.send(msg).is_err() {
                    // Application dropped the client.
                    break;
                }
            }
            Ok(None) => {
                debug!("server closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "receive failed");
                break;
            }
        }
    }
}

/// Own the write half and drain the outbound channel; exits when the client
/// is dropped or a write fails.
async fn writer_task(mut writer: OwnedWriteHalf, mut outbound_rx: mpsc::UnboundedReceiver<String>) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            warn!(error = %e, "send failed");
            break;
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// A one-connection echo server standing in for the real thing.
    async fn echo_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            while let Ok(Some(msg)) = read_frame(&mut reader).await {
                if write_frame(&mut writer, &msg).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let addr = echo_server().await;
        let mut client = ChatClient::connect(addr).await.unwrap();

        client.send("hello").unwrap();
        let echoed = timeout(TEST_TIMEOUT, client.recv()).await.unwrap();
        assert_eq!(echoed.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn recv_returns_none_after_server_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut client = ChatClient::connect(addr).await.unwrap();
        let msg = timeout(TEST_TIMEOUT, client.recv()).await.unwrap();
        assert!(msg.is_none());
    }

    #[tokio::test]
    async fn connect_to_dead_port_fails() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = ChatClient::connect(addr).await;
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }
}
