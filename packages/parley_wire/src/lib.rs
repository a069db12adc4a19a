//! Parley wire protocol - length-prefixed text framing
//!
//! A TCP stream has no message boundaries; this crate maps between the byte
//! stream and discrete text messages. Both the server and the client core use
//! it, as do tests over in-memory duplex streams.
//!
//! # Example
//!
//! ```no_run
//! use parley_wire::{read_frame, write_frame};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), parley_wire::WireError> {
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:8082").await?;
//!     let (mut reader, mut writer) = stream.into_split();
//!
//!     write_frame(&mut writer, "hello").await?;
//!
//!     while let Some(msg) = read_frame(&mut reader).await? {
//!         println!("received: {msg}");
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod framing;

pub use error::WireError;
pub use framing::{MAX_FRAME_SIZE, read_frame, write_frame};
