//! Single-room Line Chat Relay Library
//!
//! A small TCP chat relay built on tokio: every line a client sends is
//! broadcast to every other connected client, and clients that stay quiet
//! for longer than the idle window are dropped.
//!
//! # Architecture
//! Uses the Actor pattern with bounded `mpsc` channels:
//! - `Hub` is the central actor and the only owner of room membership
//! - Each connection runs a reader, a writer and an idle monitor, tied
//!   together by one `CancellationToken` and joined on teardown
//! - No locks needed - all membership access goes through message passing
//!
//! # Wire format
//! Newline-delimited UTF-8. A new client first receives
//! `Welcome to demo chat room`; lines from others arrive as
//! `<senderId>:<line>`; departures as ``user `<id>` has left.``
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio_util::sync::CancellationToken;
//! use chat_relay::{serve, ChatConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ChatConfig::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     serve(listener, config, CancellationToken::new()).await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod idle;
pub mod message;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::{ChatConfig, FullQueuePolicy, SessionSettings};
pub use error::{AppError, SendError};
pub use handler::{handle_connection, CloseReason};
pub use hub::{Hub, HubEvent, HubHandle, MemberInfo};
pub use idle::{ActivitySignal, IdleMonitor, IdleOutcome};
pub use server::serve;
pub use session::Session;
pub use types::{IdAllocator, SessionId};
