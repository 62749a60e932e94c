// crates/agent/src/session/mod.rs
//! Call session controller.
//!
//! [`SessionMachine`] decides what the view shows and which fetches to
//! start; [`CallSession`] drives it from host notifications on tokio.

mod machine;
mod runner;

use std::time::Duration;

pub use machine::{ContextSource, Effect, SessionMachine, SessionMessage, MISSING_INFO_MESSAGE};
pub use runner::{CallSession, SessionHandle};

/// Timing and fallback settings for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause before re-pulling the host context for an answered call that
    /// arrived without its routing details.
    pub refetch_delay: Duration,
    /// Switch to the mock host and fetcher when no host is attached.
    pub dev_fallback: bool,
    pub dev_context_delay: Duration,
    pub dev_fetch_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refetch_delay: Duration::from_millis(1_000),
            dev_fallback: false,
            dev_context_delay: Duration::from_millis(500),
            dev_fetch_delay: Duration::from_millis(500),
        }
    }
}
