//! Session struct definition
//!
//! Represents a connected client: its identity and the sending half of
//! its outbound queue.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::types::SessionId;

/// Connected client information
///
/// The Hub takes ownership of the Session when it joins. The outbound
/// sender is never cloned, so dropping the Session closes the queue and
/// lets the writer task finish.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Peer address, informational only
    pub remote_addr: String,
    /// Time the connection was accepted
    pub joined_at: Instant,
    /// Hub → writer queue
    outbound: mpsc::Sender<String>,
    /// Session-scoped token; cancelling it closes the transport
    token: CancellationToken,
}

impl Session {
    /// Create a new session with the given ID and outbound sender
    pub fn new(
        id: SessionId,
        remote_addr: String,
        outbound: mpsc::Sender<String>,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            remote_addr,
            joined_at: Instant::now(),
            outbound,
            token,
        }
    }

    /// Queue a line, waiting for space if the queue is full
    ///
    /// Returns an error if the writer has gone away.
    pub async fn send(&self, line: String) -> Result<(), SendError> {
        self.outbound
            .send(line)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Queue a line without waiting
    pub fn try_send(&self, line: String) -> Result<(), SendError> {
        self.outbound.try_send(line).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Check whether the writer side of the queue is gone
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Force the connection closed
    ///
    /// The session's own tasks then run the normal Closing path.
    pub fn disconnect(&self) {
        self.token.cancel();
    }
}
