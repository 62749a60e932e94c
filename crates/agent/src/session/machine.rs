// crates/agent/src/session/machine.rs
//! Synchronous session state machine.
//!
//! Consumes one [`SessionMessage`] at a time and returns the side effects
//! the driver must start. Holding no I/O keeps every transition testable
//! without a runtime.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use handoff_view_core::parse_call_event;
use handoff_view_types::{CallIdentity, HandoffState, RawCallEvent, SessionSnapshot, SessionState};
use tracing::{debug, info, warn};

/// Shown when an answered call lacks a project or trace id and no context
/// re-fetch is pending.
pub const MISSING_INFO_MESSAGE: &str = "Missing required information from call. \
Please ensure the call was forwarded with proper queue naming.";

/// Where a context event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Pushed by the host subscription.
    Subscription,
    /// Pulled once right after subscribing.
    InitialPull,
}

impl ContextSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextSource::Subscription => "onPhoneContext",
            ContextSource::InitialPull => "getPhoneContext(initial)",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Host configured and subscription established.
    HostReady { development_mode: bool },
    /// Host failed to initialise, or its subscription broke.
    HostFailed(String),
    Context {
        event: RawCallEvent,
        source: ContextSource,
    },
    /// The delayed context pull finished.
    RefetchCompleted(Result<RawCallEvent, String>),
    /// A handoff fetch finished. Errors carry the user-facing message.
    FetchCompleted {
        key: String,
        result: Result<HandoffState, String>,
    },
}

/// Work the driver must start on the machine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartFetch {
        key: String,
        project_id: String,
        trace_id: String,
    },
    /// Pull the host context again after `delay`.
    ScheduleRefetch { delay: Duration },
}

#[derive(Debug)]
pub struct SessionMachine {
    snapshot: SessionSnapshot,
    ready: bool,
    host_error: Option<String>,
    /// Keys whose fetch succeeded. Only ever grows.
    consumed: HashSet<String>,
    /// Keys with a fetch outstanding, mapped to the project fetched for.
    in_flight: HashMap<String, String>,
    /// Key of the answered call the view follows.
    active_key: Option<String>,
    /// Key whose handoff is held in the snapshot.
    loaded_key: Option<String>,
    refetch_delay: Duration,
}

impl SessionMachine {
    pub fn new(refetch_delay: Duration) -> Self {
        Self {
            snapshot: SessionSnapshot::default(),
            ready: false,
            host_error: None,
            consumed: HashSet::new(),
            in_flight: HashMap::new(),
            active_key: None,
            loaded_key: None,
            refetch_delay,
        }
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.state
    }

    pub fn is_consumed(&self, key: &str) -> bool {
        self.consumed.contains(key)
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn handle(&mut self, message: SessionMessage) -> Vec<Effect> {
        let mut effects = Vec::new();
        match message {
            SessionMessage::HostReady { development_mode } => {
                info!(development_mode, "Phone context host ready");
                self.ready = true;
                self.snapshot.development_mode = development_mode;
            }
            SessionMessage::HostFailed(message) => {
                warn!(error = %message, "Phone context host failed");
                self.host_error = Some(message);
            }
            SessionMessage::Context { event, source } => {
                let identity = parse_call_event(&event);
                debug!(source = source.as_str(), ?identity, "Phone context received");
                if identity.needs_context_refetch() && !self.snapshot.refetch_pending {
                    info!(
                        call_id = identity.call_id.as_deref().unwrap_or_default(),
                        "Active call detected but missing data, scheduling context re-fetch"
                    );
                    self.snapshot.refetch_pending = true;
                    effects.push(Effect::ScheduleRefetch {
                        delay: self.refetch_delay,
                    });
                }
                self.snapshot.identity = Some(identity);
            }
            SessionMessage::RefetchCompleted(result) => {
                self.snapshot.refetch_pending = false;
                match result {
                    Ok(event) => {
                        let identity = parse_call_event(&event);
                        debug!(?identity, "Re-parsed refreshed phone context");
                        self.snapshot.identity = Some(identity);
                    }
                    Err(e) => warn!(error = %e, "Context re-fetch failed"),
                }
            }
            SessionMessage::FetchCompleted { key, result } => {
                let project_id = self.in_flight.remove(&key);
                let is_active = self.active_key.as_deref() == Some(key.as_str());
                match result {
                    Ok(handoff) => {
                        self.consumed.insert(key.clone());
                        if !is_active && self.active_key.is_some() {
                            debug!(%key, "Handoff arrived for a call no longer on screen");
                            return effects;
                        }
                        // Kept even while the call is not answered, so it
                        // shows again when the call resumes.
                        self.snapshot.handoff = Some(handoff);
                        self.snapshot.handoff_project_id = project_id;
                        self.loaded_key = Some(key.clone());
                        if is_active {
                            self.set_state(SessionState::Loaded, None);
                        } else {
                            debug!(%key, "Handoff arrived while the call is not answered");
                        }
                    }
                    Err(message) => {
                        if is_active {
                            self.set_state(SessionState::Error, Some(message));
                        } else {
                            debug!(%key, "Handoff fetch failed for a call no longer on screen");
                        }
                    }
                }
                return effects;
            }
        }
        self.evaluate(&mut effects);
        effects
    }

    /// Decide the state from the held identity and start a fetch when the
    /// call qualifies.
    fn evaluate(&mut self, effects: &mut Vec<Effect>) {
        if let Some(error) = self.host_error.clone() {
            self.set_state(SessionState::Error, Some(error));
            return;
        }
        if !self.ready {
            self.set_state(SessionState::Initializing, None);
            return;
        }
        let Some(identity) = self.snapshot.identity.clone() else {
            self.set_state(SessionState::Waiting, None);
            return;
        };
        if !identity.is_answered {
            self.active_key = None;
            self.set_state(SessionState::Waiting, None);
            return;
        }

        let key = identity.dedup_key();
        if self.in_flight.contains_key(&key) {
            debug!(%key, "Fetch already outstanding for call");
            self.active_key = Some(key);
            self.set_state(SessionState::Loading, None);
            return;
        }
        if self.consumed.contains(&key) {
            if self.loaded_key.as_deref() == Some(key.as_str()) {
                self.active_key = Some(key);
                self.set_state(SessionState::Loaded, None);
            } else {
                debug!(%key, "Call already handled, ignoring event");
            }
            return;
        }

        let CallIdentity {
            project_id: Some(project_id),
            trace_id: Some(trace_id),
            ..
        } = identity
        else {
            if self.snapshot.refetch_pending {
                self.set_state(SessionState::Loading, None);
            } else {
                self.set_state(SessionState::Error, Some(MISSING_INFO_MESSAGE.to_string()));
            }
            return;
        };

        self.in_flight.insert(key.clone(), project_id.clone());
        self.active_key = Some(key.clone());
        self.loaded_key = None;
        self.snapshot.handoff = None;
        self.snapshot.handoff_project_id = None;
        self.set_state(SessionState::Loading, None);
        effects.push(Effect::StartFetch {
            key,
            project_id,
            trace_id,
        });
    }

    fn set_state(&mut self, state: SessionState, error_message: Option<String>) {
        if self.snapshot.state != state {
            info!(from = ?self.snapshot.state, to = ?state, "Session state changed");
        }
        if let Some(message) = &error_message {
            warn!(error = %message, "Session error");
        }
        self.snapshot.state = state;
        self.snapshot.error_message = error_message;
    }
}
