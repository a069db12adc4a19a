//! Parley client core - the connection half of a chat client
//!
//! This crate is everything a chat UI needs short of the UI itself: connect
//! to a server, receive every broadcast message over a channel, and submit
//! outgoing messages. It knows nothing about windows or text widgets.
//!
//! # Example
//!
//! ```no_run
//! use parley_client::{ChatClient, ChatMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), parley_client::ClientError> {
//!     let mut client = ChatClient::connect("127.0.0.1:8082".parse().unwrap()).await?;
//!
//!     client.send(ChatMessage::compose("Alice", "hello"))?;
//!
//!     while let Some(payload) = client.recv().await {
//!         match ChatMessage::parse(&payload) {
//!             ChatMessage::Chat { sender, body, timestamp } => {
//!                 println!("[{timestamp}] {sender}: {body}");
//!             }
//!             ChatMessage::Notice(text) => println!("* {text}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod connection;
mod message;

pub use connection::{ChatClient, ClientError};
pub use message::{ChatMessage, FIELD_SEPARATOR};
