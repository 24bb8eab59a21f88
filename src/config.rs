//! Runtime configuration
//!
//! Every knob can be given as a command line flag or an environment
//! variable. Defaults match the classic demo room: port 2022, one minute
//! idle window, queues of eight.

use std::time::Duration;

use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};

/// Default listen address
pub const DEFAULT_ADDR: &str = "0.0.0.0:2022";
/// Default idle window in seconds
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
/// Default per-session outbound queue capacity (K)
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 8;
/// Default Hub intake capacity (M)
pub const DEFAULT_HUB_CAPACITY: usize = 8;
/// Default maximum inbound line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// What the Hub does when a recipient's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FullQueuePolicy {
    /// Wait for space. One slow client stalls broadcast for everyone.
    #[default]
    Block,
    /// Skip that recipient for this message
    Drop,
    /// Remove the slow recipient from the room
    Disconnect,
}

/// Chat relay configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "chat_relay")]
#[command(about = "Single-room line-based chat relay")]
pub struct ChatConfig {
    /// Address to listen on
    #[arg(short, long, env = "CHAT_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Seconds of inactivity before a session is closed
    #[arg(
        long,
        env = "CHAT_IDLE_TIMEOUT_SECS",
        default_value_t = DEFAULT_IDLE_TIMEOUT_SECS,
        value_parser = RangedU64ValueParser::<u64>::new().range(1..)
    )]
    pub idle_timeout_secs: u64,

    /// Capacity of each session's outbound queue
    #[arg(
        long,
        env = "CHAT_OUTBOUND_CAPACITY",
        default_value_t = DEFAULT_OUTBOUND_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub outbound_capacity: usize,

    /// Capacity of the Hub's event intake
    #[arg(
        long,
        env = "CHAT_HUB_CAPACITY",
        default_value_t = DEFAULT_HUB_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub hub_capacity: usize,

    /// Longest inbound line accepted, in bytes
    #[arg(
        long,
        env = "CHAT_MAX_LINE_LENGTH",
        default_value_t = DEFAULT_MAX_LINE_LENGTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_line_length: usize,

    /// Behavior when a recipient's outbound queue is full
    #[arg(long, env = "CHAT_FULL_QUEUE_POLICY", value_enum, default_value_t = FullQueuePolicy::Block)]
    pub full_queue_policy: FullQueuePolicy,
}

impl ChatConfig {
    /// The idle window as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// The per-connection subset of the configuration
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: self.idle_timeout(),
            outbound_capacity: self.outbound_capacity,
            max_line_length: self.max_line_length,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            hub_capacity: DEFAULT_HUB_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            full_queue_policy: FullQueuePolicy::default(),
        }
    }
}

/// Settings each connection handler needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Maximum inactivity before the session is closed
    pub idle_timeout: Duration,
    /// Outbound queue capacity (K)
    pub outbound_capacity: usize,
    /// Longest inbound line accepted
    pub max_line_length: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        ChatConfig::default().session_settings()
    }
}
