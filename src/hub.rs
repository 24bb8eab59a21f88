//! Hub actor implementation
//!
//! The single authority over room membership. Sessions talk to it only
//! through `HubEvent`s on one bounded channel; the membership map is
//! owned by the event loop and never shared.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::FullQueuePolicy;
use crate::error::{AppError, SendError};
use crate::session::Session;
use crate::types::SessionId;

/// Events sent from connection handlers to the Hub
#[derive(Debug)]
pub enum HubEvent {
    /// Session entered the room
    Join(Session),
    /// Session left the room
    Leave(SessionId),
    /// Line to fan out to everyone except `owner`
    Message { owner: SessionId, text: String },
    /// Snapshot of the current members
    Members {
        respond_to: oneshot::Sender<Vec<MemberInfo>>,
    },
}

/// Copy of one member's details, as returned by `HubHandle::members`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: SessionId,
    pub remote_addr: String,
    pub joined_at: Instant,
}

impl From<&Session> for MemberInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            remote_addr: session.remote_addr.clone(),
            joined_at: session.joined_at,
        }
    }
}

/// Create a Hub and the handle used to reach it
///
/// `capacity` bounds the intake channel shared by all sessions.
pub fn channel(capacity: usize, policy: FullQueuePolicy) -> (HubHandle, Hub) {
    let (sender, receiver) = mpsc::channel(capacity);
    (HubHandle { sender }, Hub::new(receiver, policy))
}

/// The Hub actor
///
/// Processes one event at a time, so membership needs no lock. Removing a
/// session from `members` drops its outbound sender, which closes the
/// queue exactly once.
pub struct Hub {
    /// Current members: SessionId -> Session
    members: HashMap<SessionId, Session>,
    /// What to do when a recipient's queue is full
    policy: FullQueuePolicy,
    /// Event receiver channel
    receiver: mpsc::Receiver<HubEvent>,
}

impl Hub {
    /// Create a new Hub with the given event receiver
    pub fn new(receiver: mpsc::Receiver<HubEvent>, policy: FullQueuePolicy) -> Self {
        Self {
            members: HashMap::new(),
            policy,
            receiver,
        }
    }

    /// Run the Hub event loop
    ///
    /// Continuously receives and processes events until all handles are dropped.
    pub async fn run(mut self) {
        info!("Hub started (full queue policy: {:?})", self.policy);

        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event).await;
        }

        info!("Hub shutting down with {} members", self.members.len());
    }

    /// Process a single event
    async fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Join(session) => self.handle_join(session),
            HubEvent::Leave(id) => self.handle_leave(id),
            HubEvent::Message { owner, text } => self.handle_message(owner, text).await,
            HubEvent::Members { respond_to } => {
                let members = self.members.values().map(MemberInfo::from).collect();
                let _ = respond_to.send(members);
            }
        }
    }

    fn handle_join(&mut self, session: Session) {
        if self.members.contains_key(&session.id) {
            warn!("Session {} joined twice, ignoring second join", session.id);
            return;
        }

        info!("Session {} joined from {}", session.id, session.remote_addr);
        self.members.insert(session.id, session);
        debug!("Total members: {}", self.members.len());
    }

    fn handle_leave(&mut self, id: SessionId) {
        // Dropping the session closes its outbound queue.
        match self.members.remove(&id) {
            Some(session) => {
                info!(
                    "Session {} left after {:?}",
                    id,
                    session.joined_at.elapsed()
                );
                debug!("Total members: {}", self.members.len());
            }
            None => debug!("Leave for session {} which is not a member", id),
        }
    }

    async fn handle_message(&mut self, owner: SessionId, text: String) {
        let mut slow = Vec::new();

        for session in self.members.values() {
            if session.id == owner {
                continue;
            }
            if session.is_closed() {
                debug!("Session {} writer gone, skipping", session.id);
                continue;
            }

            let result = match self.policy {
                FullQueuePolicy::Block => session.send(text.clone()).await,
                FullQueuePolicy::Drop | FullQueuePolicy::Disconnect => {
                    session.try_send(text.clone())
                }
            };

            match result {
                Ok(()) => {}
                Err(SendError::ChannelClosed) => {
                    debug!("Session {} writer gone, skipping", session.id);
                }
                Err(SendError::QueueFull) if self.policy == FullQueuePolicy::Disconnect => {
                    warn!("Session {} outbound queue full, disconnecting", session.id);
                    slow.push(session.id);
                }
                Err(SendError::QueueFull) => {
                    warn!("Session {} outbound queue full, dropping message", session.id);
                }
            }
        }

        for id in slow {
            if let Some(session) = self.members.remove(&id) {
                session.disconnect();
            }
        }
    }
}

/// Cloneable handle for sending events to the Hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Hand a session over to the Hub
    pub async fn join(&self, session: Session) -> Result<(), AppError> {
        self.send(HubEvent::Join(session)).await
    }

    /// Remove a session from the room
    pub async fn leave(&self, id: SessionId) -> Result<(), AppError> {
        self.send(HubEvent::Leave(id)).await
    }

    /// Fan a line out to every member except `owner`
    pub async fn message(&self, owner: SessionId, text: String) -> Result<(), AppError> {
        self.send(HubEvent::Message { owner, text }).await
    }

    /// Snapshot of the current members
    pub async fn members(&self) -> Result<Vec<MemberInfo>, AppError> {
        let (respond_to, response) = oneshot::channel();
        self.send(HubEvent::Members { respond_to }).await?;
        response.await.map_err(|_| AppError::HubClosed)
    }

    async fn send(&self, event: HubEvent) -> Result<(), AppError> {
        self.sender.send(event).await.map_err(|_| AppError::HubClosed)
    }
}
