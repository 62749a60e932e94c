// crates/agent/src/lib.rs
//! Agent-assist runtime.
//!
//! Listens to phone-context notifications from the telephony host, works out
//! which call is on the line, fetches its handoff state through the proxy
//! and publishes a [`SessionSnapshot`](handoff_view_types::SessionSnapshot)
//! for the presentation layer.

pub mod error;
pub mod fetch;
pub mod host;
pub mod session;

pub use error::*;
pub use fetch::{FetchConfig, HandoffClient, HandoffFetcher, MockHandoffFetcher};
pub use host::{HostNotification, JsonLinesHost, MockHost, PhoneContextHost, UnavailableHost};
pub use session::{CallSession, SessionConfig, SessionHandle};
