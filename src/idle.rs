//! Per-session inactivity watchdog
//!
//! The monitor runs a resettable countdown. Each activity signal pushes the
//! deadline out by a full window; reaching the deadline cancels the session
//! token, which closes the session's transport.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::SessionId;

/// How the monitor finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The window elapsed with no activity; the session was cancelled
    TimedOut,
    /// The session was torn down for another reason
    Cancelled,
}

/// Sending side of the activity signal, held by the inbound reader
#[derive(Debug, Clone)]
pub struct ActivitySignal {
    sender: mpsc::Sender<()>,
}

impl ActivitySignal {
    /// Record activity
    ///
    /// Never blocks. If a signal is already pending the reset it will cause
    /// covers this one too.
    pub fn notify(&self) {
        let _ = self.sender.try_send(());
    }
}

/// Watchdog for one session
#[derive(Debug)]
pub struct IdleMonitor {
    id: SessionId,
    window: Duration,
    activity: mpsc::Receiver<()>,
    token: CancellationToken,
}

impl IdleMonitor {
    /// Create a monitor and the signal used to reset it
    pub fn new(
        id: SessionId,
        window: Duration,
        token: CancellationToken,
    ) -> (ActivitySignal, Self) {
        let (sender, activity) = mpsc::channel(1);
        let monitor = Self {
            id,
            window,
            activity,
            token,
        };
        (ActivitySignal { sender }, monitor)
    }

    /// Run until the window elapses or the session token is cancelled
    pub async fn run(mut self) -> IdleOutcome {
        let deadline = time::sleep(self.window);
        tokio::pin!(deadline);
        let mut listening = true;

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!("Idle monitor for session {} cancelled", self.id);
                    return IdleOutcome::Cancelled;
                }
                signal = self.activity.recv(), if listening => match signal {
                    Some(()) => deadline.as_mut().reset(Instant::now() + self.window),
                    // Reader is gone; keep counting so a stuck teardown is still bounded.
                    None => listening = false,
                },
                _ = &mut deadline => {
                    debug!("Session {} idle for {:?}, closing", self.id, self.window);
                    self.token.cancel();
                    return IdleOutcome::TimedOut;
                }
            }
        }
    }
}
