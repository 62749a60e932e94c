// crates/types/src/lib.rs
//! Data types shared across the handoff-view workspace.
//!
//! Everything here is plain data: the raw call-context payload delivered by
//! the telephony host, the identity derived from it, the handoff state
//! returned by the conversational-AI backend and the session states the
//! agent surfaces to its presentation layer.

pub mod call_event;
pub mod error;
pub mod handoff;
pub mod identity;
pub mod session;

mod lenient;

pub use call_event::*;
pub use error::*;
pub use handoff::*;
pub use identity::*;
pub use session::*;
