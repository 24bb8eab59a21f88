//! Connection handler
//!
//! Drives one session from accept to close: allocates the Session, runs
//! the inbound reader, outbound writer and idle monitor as three tasks tied
//! to one session-scoped cancellation token, and joins all of them on
//! teardown.
//!
//! Lifecycle: `Connecting → Active → Closing → Closed`. Cancelling the
//! session token is how the transport gets closed from outside the reader
//! (idle timeout, write failure, server shutdown).

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SessionSettings;
use crate::error::AppError;
use crate::hub::HubHandle;
use crate::idle::{ActivitySignal, IdleMonitor, IdleOutcome};
use crate::message::{chat_line, left_notice, WELCOME_TEXT};
use crate::session::Session;
use crate::types::SessionId;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client closed its side of the stream
    Eof,
    /// Read failed, a line was not UTF-8, or a line was too long
    ReadError,
    /// A write to the client failed
    WriteError,
    /// No activity within the idle window
    IdleTimeout,
    /// Closed by the server (shutdown, or dropped as a slow consumer)
    Cancelled,
    /// The Hub stopped accepting events
    HubClosed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CloseReason::Eof => "end of stream",
            CloseReason::ReadError => "read error",
            CloseReason::WriteError => "write error",
            CloseReason::IdleTimeout => "idle timeout",
            CloseReason::Cancelled => "closed by server",
            CloseReason::HubClosed => "hub closed",
        };
        f.write_str(reason)
    }
}

/// Handle an accepted connection
///
/// Takes ownership of the transport for the whole session; both halves are
/// dropped, and the write half shut down, on every exit path. `shutdown`
/// is the server-wide token: cancelling it closes this session too.
pub async fn handle_connection<T>(
    stream: T,
    remote_addr: String,
    hub: HubHandle,
    settings: SessionSettings,
    shutdown: CancellationToken,
) -> Result<CloseReason, AppError>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = SessionId::next();
    let token = shutdown.child_token();
    info!("Session {} connected from {}", id, remote_addr);

    let (read_half, write_half) = io::split(stream);
    let lines = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(settings.max_line_length),
    );
    let sink = FramedWrite::new(write_half, LinesCodec::new());

    // Hub -> client queue; only the Session ever holds the sender
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(settings.outbound_capacity);
    let session = Session::new(id, remote_addr, outbound_tx, token.clone());

    let write_task = tokio::spawn(write_outbound(id, sink, outbound_rx, token.clone()));

    if session.send(WELCOME_TEXT.to_string()).await.is_err() {
        debug!("Writer for session {} ended before welcome", id);
    }

    if let Err(e) = hub.join(session).await {
        error!("Failed to register session {} - hub closed", id);
        token.cancel();
        let _ = write_task.await;
        return Err(e);
    }

    let (activity, monitor) = IdleMonitor::new(id, settings.idle_timeout, token.clone());
    let idle_task = tokio::spawn(monitor.run());
    let read_task = tokio::spawn(read_inbound(id, lines, hub.clone(), activity, token.clone()));

    let read_reason = read_task.await.unwrap_or_else(|e| {
        error!("Read task for session {} failed: {}", id, e);
        CloseReason::ReadError
    });

    // Closing
    let hub_alive = hub.leave(id).await.is_ok();
    if hub_alive {
        let _ = hub.message(id, left_notice(id)).await;
    }

    // The writer ends once the Hub drops our queue, or on cancellation
    let write_failed = write_task.await.unwrap_or_else(|e| {
        error!("Write task for session {} failed: {}", id, e);
        true
    });
    token.cancel();
    let idle = idle_task.await.unwrap_or(IdleOutcome::Cancelled);

    let reason = match read_reason {
        CloseReason::Cancelled if write_failed => CloseReason::WriteError,
        // Losing the Hub drops our queue, which cancels the session first.
        CloseReason::Cancelled if !hub_alive => CloseReason::HubClosed,
        CloseReason::Cancelled if idle == IdleOutcome::TimedOut => CloseReason::IdleTimeout,
        other => other,
    };

    info!("Session {} disconnected ({})", id, reason);
    Ok(reason)
}

/// Inbound reader: client lines -> Hub messages
async fn read_inbound<R>(
    id: SessionId,
    mut lines: FramedRead<R, LinesCodec>,
    hub: HubHandle,
    activity: ActivitySignal,
    token: CancellationToken,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return CloseReason::Cancelled,
            next = lines.next() => next,
        };

        match next {
            Some(Ok(line)) => {
                let forwarded = tokio::select! {
                    biased;
                    _ = token.cancelled() => return CloseReason::Cancelled,
                    forwarded = hub.message(id, chat_line(id, &line)) => forwarded,
                };
                if forwarded.is_err() {
                    debug!("Hub closed, ending read task for {}", id);
                    return CloseReason::HubClosed;
                }
                activity.notify();
            }
            Some(Err(e)) => {
                debug!("Read error for session {}: {}", id, e);
                return CloseReason::ReadError;
            }
            None => {
                debug!("Session {} reached end of stream", id);
                return CloseReason::Eof;
            }
        }
    }
}

/// Outbound writer: queued lines -> client
///
/// Returns true if a write failed. Always cancels the session token on the
/// way out, so a writer that stops for any reason takes the session down.
async fn write_outbound<W>(
    id: SessionId,
    mut sink: FramedWrite<W, LinesCodec>,
    mut outbound: mpsc::Receiver<String>,
    token: CancellationToken,
) -> bool
where
    W: AsyncWrite + Unpin,
{
    let mut failed = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = outbound.recv() => next,
        };
        let Some(line) = next else {
            debug!("Outbound queue closed for session {}", id);
            break;
        };

        let written = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            written = sink.send(line) => written,
        };
        if let Err(e) = written {
            warn!("Write to session {} failed: {}", id, e);
            failed = true;
            break;
        }
    }

    // Stop accepting lines before anything else so the Hub never waits on us.
    drop(outbound);
    token.cancel();

    // Closing an already closed transport is not an error worth reporting.
    let _ = sink.into_inner().shutdown().await;
    debug!("Write task ended for session {}", id);
    failed
}
