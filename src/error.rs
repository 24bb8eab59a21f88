//! Error types for the chat relay
//!
//! Defines session-level errors and outbound delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Session-level failures are contained to the session that hit them;
/// none of them reach the Hub or other sessions.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (binding the listener, connecting)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The Hub intake channel is closed (Hub no longer running)
    #[error("Hub closed")]
    HubClosed,
}

/// Outbound delivery errors
///
/// Occurs when the Hub cannot place a line into a session's outbound queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The session's writer has gone away
    #[error("Channel closed")]
    ChannelClosed,

    /// The outbound queue is at capacity
    #[error("Queue full")]
    QueueFull,
}
