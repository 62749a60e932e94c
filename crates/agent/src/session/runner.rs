// crates/agent/src/session/runner.rs
//! Async driver for [`SessionMachine`].
//!
//! One task owns the machine and drains a single queue. A forwarder task
//! feeds host notifications into it in delivery order; fetches and the
//! delayed context pull run as their own tasks and report back through the
//! same queue.

use std::sync::Arc;

use handoff_view_types::SessionSnapshot;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::machine::{ContextSource, Effect, SessionMachine, SessionMessage};
use super::SessionConfig;
use crate::error::HostError;
use crate::fetch::{HandoffFetcher, MockHandoffFetcher};
use crate::host::{HostNotification, MockHost, PhoneContextHost, REQUIRED_CAPABILITIES};

#[derive(Debug)]
enum DriverEvent {
    Message(SessionMessage),
    /// The host notification stream ended.
    HostClosed,
}

/// Entry point for running a session against a host.
pub struct CallSession;

impl CallSession {
    /// Start a session on the current runtime.
    ///
    /// The session ends once the host stream has closed and every fetch it
    /// started has reported back.
    pub fn spawn(
        host: Arc<dyn PhoneContextHost>,
        fetcher: Arc<dyn HandoffFetcher>,
        config: SessionConfig,
    ) -> SessionHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            machine: SessionMachine::new(config.refetch_delay),
            host,
            fetcher,
            events_tx,
            snapshots: snapshot_tx,
            outstanding: 0,
            host_closed: false,
        };
        let task = tokio::spawn(driver.run(events_rx, config));
        SessionHandle {
            snapshots: snapshot_rx,
            task,
        }
    }
}

/// Handle to a running session.
pub struct SessionHandle {
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<SessionSnapshot>,
}

impl SessionHandle {
    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait for the session to end and return its final snapshot.
    pub async fn wait(self) -> SessionSnapshot {
        match self.task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Session task failed");
                self.snapshots.borrow().clone()
            }
        }
    }
}

struct Driver {
    machine: SessionMachine,
    host: Arc<dyn PhoneContextHost>,
    fetcher: Arc<dyn HandoffFetcher>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
    /// Spawned fetches and context pulls that have not reported back.
    outstanding: usize,
    host_closed: bool,
}

impl Driver {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<DriverEvent>,
        config: SessionConfig,
    ) -> SessionSnapshot {
        self.connect(&config).await;

        while !(self.host_closed && self.outstanding == 0) {
            let Some(event) = events.recv().await else {
                break;
            };
            match event {
                DriverEvent::HostClosed => {
                    debug!("Phone context stream closed");
                    self.host_closed = true;
                }
                DriverEvent::Message(message) => {
                    if matches!(
                        message,
                        SessionMessage::RefetchCompleted(_) | SessionMessage::FetchCompleted { .. }
                    ) {
                        self.outstanding = self.outstanding.saturating_sub(1);
                    }
                    self.dispatch(message);
                }
            }
        }

        info!(state = ?self.machine.state(), "Session ended");
        self.machine.snapshot().clone()
    }

    /// Configure and subscribe, falling back to development mode when the
    /// host is missing and the fallback is enabled.
    async fn connect(&mut self, config: &SessionConfig) {
        info!(host = self.host.name(), "Connecting to phone context host");
        let mut development_mode = false;
        let notifications = match open(self.host.as_ref()).await {
            Ok(rx) => rx,
            Err(HostError::Unsupported(reason)) if config.dev_fallback => {
                warn!(%reason, "Phone context host unavailable, running in development mode");
                self.host = Arc::new(MockHost::new(config.dev_context_delay));
                self.fetcher = Arc::new(MockHandoffFetcher::new(config.dev_fetch_delay));
                development_mode = true;
                match open(self.host.as_ref()).await {
                    Ok(rx) => rx,
                    Err(e) => return self.fail(e),
                }
            }
            Err(e) => return self.fail(e),
        };

        self.dispatch(SessionMessage::HostReady { development_mode });

        let events = self.events_tx.clone();
        tokio::spawn(forward_notifications(notifications, events));

        match self.host.get_phone_context().await {
            Ok(event) => self.dispatch(SessionMessage::Context {
                event,
                source: ContextSource::InitialPull,
            }),
            Err(e) => warn!(error = %e, "Initial phone context pull failed"),
        }
    }

    fn fail(&mut self, error: HostError) {
        error!(error = %error, "Failed to initialise phone context host");
        self.dispatch(SessionMessage::HostFailed(error.to_string()));
        self.host_closed = true;
    }

    fn dispatch(&mut self, message: SessionMessage) {
        for effect in self.machine.handle(message) {
            self.execute(effect);
        }
        let next = self.machine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == *next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }

    fn execute(&mut self, effect: Effect) {
        self.outstanding += 1;
        let events = self.events_tx.clone();
        match effect {
            Effect::StartFetch {
                key,
                project_id,
                trace_id,
            } => {
                let fetcher = self.fetcher.clone();
                tokio::spawn(async move {
                    let result = fetcher
                        .fetch(&project_id, &trace_id)
                        .await
                        .map_err(|e| {
                            error!(error = %e, %project_id, %trace_id, "Handoff fetch failed");
                            e.user_message()
                        });
                    let _ = events.send(DriverEvent::Message(SessionMessage::FetchCompleted {
                        key,
                        result,
                    }));
                });
            }
            Effect::ScheduleRefetch { delay } => {
                let host = self.host.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let result = host.get_phone_context().await.map_err(|e| e.to_string());
                    let _ = events.send(DriverEvent::Message(SessionMessage::RefetchCompleted(result)));
                });
            }
        }
    }
}

async fn open(host: &dyn PhoneContextHost) -> Result<mpsc::Receiver<HostNotification>, HostError> {
    host.configure(&REQUIRED_CAPABILITIES).await?;
    host.subscribe().await
}

async fn forward_notifications(
    mut notifications: mpsc::Receiver<HostNotification>,
    events: mpsc::UnboundedSender<DriverEvent>,
) {
    while let Some(notification) = notifications.recv().await {
        let message = match notification {
            HostNotification::Context(event) => SessionMessage::Context {
                event,
                source: ContextSource::Subscription,
            },
            HostNotification::Error(e) => SessionMessage::HostFailed(e),
        };
        if events.send(DriverEvent::Message(message)).is_err() {
            return;
        }
    }
    let _ = events.send(DriverEvent::HostClosed);
}
