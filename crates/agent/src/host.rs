// crates/agent/src/host.rs
//! Telephony host interface.
//!
//! The host pushes phone-context notifications through a subscription and
//! answers on-demand pulls of the current context. Implementations:
//!
//! - [`JsonLinesHost`] replays one JSON event per line from a file or stdin
//! - [`UnavailableHost`] stands for "no host attached"
//! - [`MockHost`] emits a sample call for development mode

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use handoff_view_types::{CallObject, CallParty, ForwardedBy, RawCallEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::HostError;

/// Capabilities the agent declares when configuring the host.
pub const REQUIRED_CAPABILITIES: [&str; 3] = ["getRunningContext", "getPhoneContext", "onPhoneContext"];

const NOTIFICATION_BUFFER: usize = 64;

/// A push notification from the host's context subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNotification {
    Context(RawCallEvent),
    /// The subscription broke after it was established.
    Error(String),
}

#[async_trait]
pub trait PhoneContextHost: Send + Sync {
    /// Declare required capabilities. Called once before subscribing.
    async fn configure(&self, capabilities: &[&str]) -> Result<(), HostError>;

    /// Start receiving context notifications. The stream ends when the host
    /// has nothing more to deliver.
    async fn subscribe(&self) -> Result<mpsc::Receiver<HostNotification>, HostError>;

    /// Pull the current phone context.
    async fn get_phone_context(&self) -> Result<RawCallEvent, HostError>;

    fn name(&self) -> &str;
}

/// Host backed by a stream of JSON lines, one [`RawCallEvent`] per line.
///
/// Blank lines are ignored and malformed lines are logged and skipped. Pulls
/// return the most recent event delivered.
pub struct JsonLinesHost {
    reader: Mutex<Option<Box<dyn AsyncBufRead + Send + Unpin>>>,
    latest: Arc<Mutex<Option<RawCallEvent>>>,
    pace: Duration,
}

impl JsonLinesHost {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            reader: Mutex::new(Some(Box::new(BufReader::new(reader)))),
            latest: Arc::new(Mutex::new(None)),
            pace: Duration::ZERO,
        }
    }

    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::from_reader(file))
    }

    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    /// Wait this long between consecutive events.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }
}

#[async_trait]
impl PhoneContextHost for JsonLinesHost {
    async fn configure(&self, capabilities: &[&str]) -> Result<(), HostError> {
        debug!(?capabilities, "JSON-lines host configured");
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<HostNotification>, HostError> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| HostError::Subscription("reader lock poisoned".into()))?
            .take()
            .ok_or_else(|| HostError::Subscription("already subscribed".into()))?;

        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        let latest = self.latest.clone();
        let pace = self.pace;
        tokio::spawn(async move {
            let mut reader = reader;
            let mut buf = Vec::new();
            let mut line_no = 0usize;
            let mut delivered = 0usize;
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(HostNotification::Error(e.to_string())).await;
                        return;
                    }
                }
                line_no += 1;
                let Ok(line) = std::str::from_utf8(&buf) else {
                    warn!(line = line_no, "Skipping phone context line that is not valid UTF-8");
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let event: RawCallEvent = match serde_json::from_str(line) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(line = line_no, error = %e, "Skipping malformed phone context line");
                        continue;
                    }
                };
                if delivered > 0 && !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(event.clone());
                }
                if tx.send(HostNotification::Context(event)).await.is_err() {
                    return;
                }
                delivered += 1;
            }
            debug!(delivered, "Phone context stream ended");
        });
        Ok(rx)
    }

    async fn get_phone_context(&self) -> Result<RawCallEvent, HostError> {
        self.latest
            .lock()
            .map_err(|_| HostError::Context("context lock poisoned".into()))?
            .clone()
            .ok_or_else(|| HostError::Context("no phone context received yet".into()))
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

/// No host attached. Every operation reports [`HostError::Unsupported`].
#[derive(Debug, Default)]
pub struct UnavailableHost;

#[async_trait]
impl PhoneContextHost for UnavailableHost {
    async fn configure(&self, _capabilities: &[&str]) -> Result<(), HostError> {
        Err(HostError::Unsupported(
            "no phone context source attached; this view must run inside the telephony client".into(),
        ))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<HostNotification>, HostError> {
        Err(HostError::Unsupported("no phone context source attached".into()))
    }

    async fn get_phone_context(&self) -> Result<RawCallEvent, HostError> {
        Err(HostError::Unsupported("no phone context source attached".into()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Development-mode host: delivers [`sample_call_event`] once after a short
/// delay, then closes the stream.
#[derive(Debug)]
pub struct MockHost {
    delay: Duration,
    emitted: Arc<AtomicBool>,
}

impl MockHost {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            emitted: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl PhoneContextHost for MockHost {
    async fn configure(&self, _capabilities: &[&str]) -> Result<(), HostError> {
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<HostNotification>, HostError> {
        let (tx, rx) = mpsc::channel(1);
        let delay = self.delay;
        let emitted = self.emitted.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("Delivering mock phone context");
            emitted.store(true, Ordering::SeqCst);
            let _ = tx.send(HostNotification::Context(sample_call_event())).await;
        });
        Ok(rx)
    }

    async fn get_phone_context(&self) -> Result<RawCallEvent, HostError> {
        if self.emitted.load(Ordering::SeqCst) {
            Ok(sample_call_event())
        } else {
            Err(HostError::Context("no active call".into()))
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// An answered call forwarded by a queue routed to `EXAMPLE-PROJECT-123`.
pub fn sample_call_event() -> RawCallEvent {
    let queue_label = "sales_queue__EXAMPLE-PROJECT-123";
    RawCallEvent {
        active_tab: Some("History".into()),
        call_id: Some("mock-call-id-123456".into()),
        call_object: Some(CallObject {
            account_id: Some("mock-account-abc123".into()),
            answer_start_time: Some("2026-01-30 04:20:52".into()),
            call_end_time: Some("2026-01-30 04:20:55".into()),
            callee: Some(CallParty {
                extension_id: Some("mock-extension-456".into()),
                extension_number: Some("1001".into()),
                extension_type: Some("User".into()),
                phone_number: Some("+15555551001".into()),
                user_id: Some("mock-user-789".into()),
                ..Default::default()
            }),
            caller: Some(CallParty {
                extension_id: Some(queue_label.into()),
                extension_number: Some("mock-queue-abc".into()),
                extension_type: Some("CallQueue".into()),
                phone_number: Some("+15555551000".into()),
                ..Default::default()
            }),
            forwarded_by: Some(ForwardedBy {
                extension_number: Some("1002".into()),
                name: Some(queue_label.into()),
                ..Default::default()
            }),
            ringing_start_time: Some("2026-01-30 04:20:50".into()),
            trace_id: Some("1234567890123456789".into()),
            ..Default::default()
        }),
        call_status: Some("Active".into()),
        direction: Some("Unknown".into()),
        event_ts: Some("2026-01-30 04:20:55".into()),
        trace_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_json_lines_host_delivers_events_in_order() {
        let input = concat!(
            r#"{"callId":"c1","callStatus":"Ringing"}"#,
            "\n\n",
            "this is not json\n",
            r#"{"callId":"c1","callStatus":"Active"}"#,
            "\n",
        );
        let host = JsonLinesHost::from_reader(Cursor::new(input.as_bytes().to_vec()));
        host.configure(&REQUIRED_CAPABILITIES).await.unwrap();
        assert!(host.get_phone_context().await.is_err());

        let mut rx = host.subscribe().await.unwrap();
        let mut statuses = Vec::new();
        while let Some(notification) = rx.recv().await {
            match notification {
                HostNotification::Context(event) => statuses.push(event.call_status.unwrap()),
                HostNotification::Error(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(statuses, vec!["Ringing", "Active"]);
        let latest = host.get_phone_context().await.unwrap();
        assert_eq!(latest.call_status.as_deref(), Some("Active"));
    }

    #[tokio::test]
    async fn test_json_lines_host_skips_invalid_utf8_line() {
        let mut input = br#"{"callId":"c0"}"#.to_vec();
        input.extend_from_slice(b"\n{\"callId\":\"\xff\xfe\"}\n");
        input.extend_from_slice(br#"{"callId":"c1","callStatus":"Active"}"#);
        input.push(b'\n');
        let host = JsonLinesHost::from_reader(Cursor::new(input));

        let mut rx = host.subscribe().await.unwrap();
        let mut call_ids = Vec::new();
        while let Some(notification) = rx.recv().await {
            match notification {
                HostNotification::Context(event) => call_ids.push(event.call_id.unwrap()),
                HostNotification::Error(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(call_ids, vec!["c0", "c1"]);
    }

    #[tokio::test]
    async fn test_json_lines_host_subscribes_once() {
        let host = JsonLinesHost::from_reader(Cursor::new(Vec::new()));
        let _rx = host.subscribe().await.unwrap();
        assert!(matches!(host.subscribe().await, Err(HostError::Subscription(_))));
    }

    #[tokio::test]
    async fn test_unavailable_host_is_unsupported() {
        let host = UnavailableHost;
        assert!(matches!(
            host.configure(&REQUIRED_CAPABILITIES).await,
            Err(HostError::Unsupported(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_host_emits_sample_once() {
        let host = MockHost::new(Duration::from_millis(500));
        assert!(host.get_phone_context().await.is_err());

        let mut rx = host.subscribe().await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first, HostNotification::Context(sample_call_event()));
        assert!(rx.recv().await.is_none());
        assert_eq!(host.get_phone_context().await.unwrap(), sample_call_event());
    }
}
