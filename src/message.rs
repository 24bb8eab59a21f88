//! Wire text produced by the relay
//!
//! The protocol is newline-delimited UTF-8. Outbound lines carry no framing
//! beyond the newline, which the line codec appends.

use crate::types::SessionId;

/// Sent to a new session only, before any broadcast text
pub const WELCOME_TEXT: &str = "Welcome to demo chat room";

/// Format an inbound line for fan-out: `<senderId>:<line>`
pub fn chat_line(sender: SessionId, line: &str) -> String {
    format!("{}:{}", sender, line)
}

/// Broadcast to the remaining sessions once a session has left
pub fn left_notice(id: SessionId) -> String {
    format!("user `{}` has left.", id)
}
