//! Application-layer message convention: `sender#body#timestamp`.
//!
//! This is a convention of the chat UI, not of the server core — the server
//! relays payloads verbatim. A payload without any separator is a
//! server-generated or join/leave notice and is displayed as-is.

use chrono::Local;

/// Field separator in a structured chat payload.
pub const FIELD_SEPARATOR: char = '#';

/// A received payload, as the display layer sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatMessage {
    /// A user message: sender, body, and the sender's local timestamp.
    Chat {
        sender: String,
        body: String,
        timestamp: String,
    },
    /// A payload with no field structure (join/leave or server notice).
    Notice(String),
}

impl ChatMessage {
    /// Compose the wire payload for a user message, stamping the current
    /// local time.
    pub fn compose(sender: &str, body: &str) -> String {
        let timestamp = Local::now().format("%H:%M:%S");
        format!("{sender}{FIELD_SEPARATOR}{body}{FIELD_SEPARATOR}{timestamp}")
    }

    /// Compose the join announcement sent as a connection's first message.
    /// Carries no separator, so recipients display it verbatim and the
    /// server's name policy can pick the name out of it.
    pub fn compose_join(sender: &str) -> String {
        format!("User joined chat: {sender}")
    }

    /// Parse a received payload. Anything without all three fields is a
    /// notice, displayed verbatim rather than parsed.
    pub fn parse(payload: &str) -> ChatMessage {
        let mut parts = payload.splitn(3, FIELD_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(sender), Some(body), Some(timestamp)) => ChatMessage::Chat {
                sender: sender.to_string(),
                body: body.to_string(),
                timestamp: timestamp.to_string(),
            },
            _ => ChatMessage::Notice(payload.to_string()),
        }
    }
}
