//! End-to-end session behaviour against scripted hosts and fetchers.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use handoff_view_agent::error::{AttemptError, FetchError, HostError};
use handoff_view_agent::session::MISSING_INFO_MESSAGE;
use handoff_view_agent::{
    CallSession, FetchConfig, HandoffClient, HandoffFetcher, HostNotification, JsonLinesHost,
    PhoneContextHost, SessionConfig, SessionHandle, UnavailableHost,
};
use handoff_view_types::{HandoffState, RawCallEvent, SessionState};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Host that plays back a fixed list of notifications, each after a delay
/// relative to the previous one, then closes the stream.
struct ScriptedHost {
    script: Mutex<Option<Vec<(Duration, HostNotification)>>>,
    pulls: Mutex<VecDeque<Result<RawCallEvent, String>>>,
    pull_count: AtomicUsize,
}

impl ScriptedHost {
    fn new(script: Vec<(Duration, HostNotification)>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            pulls: Mutex::new(VecDeque::new()),
            pull_count: AtomicUsize::new(0),
        }
    }

    /// Answers for successive `get_phone_context` calls. The first answers
    /// the initial pull made right after subscribing.
    fn with_pulls(self, pulls: Vec<Result<RawCallEvent, String>>) -> Self {
        *self.pulls.lock().unwrap() = pulls.into();
        self
    }

    fn pulls(&self) -> usize {
        self.pull_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhoneContextHost for ScriptedHost {
    async fn configure(&self, capabilities: &[&str]) -> Result<(), HostError> {
        assert!(capabilities.contains(&"onPhoneContext"));
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<HostNotification>, HostError> {
        let script = self.script.lock().unwrap().take().unwrap_or_default();
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for (delay, notification) in script {
                tokio::time::sleep(delay).await;
                if tx.send(notification).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }

    async fn get_phone_context(&self) -> Result<RawCallEvent, HostError> {
        self.pull_count.fetch_add(1, Ordering::SeqCst);
        match self.pulls.lock().unwrap().pop_front() {
            Some(Ok(event)) => Ok(event),
            Some(Err(e)) => Err(HostError::Context(e)),
            None => Err(HostError::Context("no active call".into())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Fetcher that records its calls and replays queued results, answering
/// with the sample handoff once the queue is empty.
struct CountingFetcher {
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    results: Mutex<VecDeque<Result<HandoffState, FetchError>>>,
}

impl CountingFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
        }
    }

    fn with_results(self, results: Vec<Result<HandoffState, FetchError>>) -> Self {
        *self.results.lock().unwrap() = results.into();
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HandoffFetcher for CountingFetcher {
    async fn fetch(&self, project_id: &str, trace_id: &str) -> Result<HandoffState, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((project_id.to_string(), trace_id.to_string()));
        let result = self.results.lock().unwrap().pop_front();
        tokio::time::sleep(self.delay).await;
        result.unwrap_or_else(|| Ok(HandoffState::sample()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn event(value: serde_json::Value) -> RawCallEvent {
    serde_json::from_value(value).unwrap()
}

fn answered(call_id: &str, project: &str, trace: &str) -> RawCallEvent {
    event(json!({
        "callId": call_id,
        "callStatus": "active",
        "traceId": trace,
        "callObject": { "forwardedBy": { "name": format!("q__{project}") } }
    }))
}

fn context(delay_ms: u64, event: RawCallEvent) -> (Duration, HostNotification) {
    (Duration::from_millis(delay_ms), HostNotification::Context(event))
}

fn exhausted() -> FetchError {
    FetchError::Exhausted {
        attempts: 3,
        last: AttemptError::Timeout(10_000),
    }
}

/// Records the states the session publishes once the host is up.
///
/// `Initializing` is dropped: a host that connects without yielding moves
/// the session past it before the recorder first runs.
fn record_states(session: &SessionHandle) -> tokio::task::JoinHandle<Vec<SessionState>> {
    let mut updates = session.subscribe();
    tokio::spawn(async move {
        let mut states = Vec::new();
        loop {
            let state = updates.borrow_and_update().state;
            if state != SessionState::Initializing && states.last() != Some(&state) {
                states.push(state);
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
        states
    })
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn answered_call_loads_handoff_state() {
    let host = Arc::new(ScriptedHost::new(vec![context(0, answered("c1", "PROJ-1", "t1"))]));
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(200)));

    let session = CallSession::spawn(host.clone(), fetcher.clone(), SessionConfig::default());
    let states = record_states(&session);
    let last = session.wait().await;

    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(last.handoff, Some(HandoffState::sample()));
    assert_eq!(last.identity.unwrap().project_id.as_deref(), Some("PROJ-1"));
    assert_eq!(fetcher.calls(), vec![("PROJ-1".to_string(), "t1".to_string())]);
    assert_eq!(
        states.await.unwrap(),
        vec![
            SessionState::Waiting,
            SessionState::Loading,
            SessionState::Loaded,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_events_for_one_call_fetch_once() {
    let call = answered("c1", "PROJ-1", "t1");
    let host = Arc::new(ScriptedHost::new(vec![
        context(0, call.clone()),
        // while the first fetch is still running
        context(50, call.clone()),
        // after it completed
        context(2_000, call),
    ]));
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(500)));

    let last = CallSession::spawn(host, fetcher.clone(), SessionConfig::default())
        .wait()
        .await;

    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn incomplete_call_refetches_once_then_errors() {
    let partial = event(json!({
        "callId": "c1",
        "callStatus": "active",
        "callObject": { "forwardedBy": { "name": "plain queue" }, "traceId": "t1" }
    }));
    let host = Arc::new(
        ScriptedHost::new(vec![context(0, partial.clone())])
            .with_pulls(vec![Err("no call yet".into()), Ok(partial)]),
    );
    let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
    let started = tokio::time::Instant::now();

    let session = CallSession::spawn(host.clone(), fetcher.clone(), SessionConfig::default());
    let states = record_states(&session);
    let last = session.wait().await;

    assert!(started.elapsed() >= Duration::from_millis(1_000));
    assert_eq!(last.state, SessionState::Error);
    assert_eq!(last.error_message.as_deref(), Some(MISSING_INFO_MESSAGE));
    assert!(!last.refetch_pending);
    // initial pull plus exactly one re-fetch
    assert_eq!(host.pulls(), 2);
    assert!(fetcher.calls().is_empty());
    assert_eq!(
        states.await.unwrap(),
        vec![
            SessionState::Waiting,
            SessionState::Loading,
            SessionState::Error,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn refetched_context_completes_identity() {
    let partial = event(json!({ "callId": "c1", "callStatus": "connected" }));
    let host = Arc::new(
        ScriptedHost::new(vec![context(0, partial)])
            .with_pulls(vec![Err("no call yet".into()), Ok(answered("c1", "PROJ-7", "t7"))]),
    );
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(100)));

    let last = CallSession::spawn(host, fetcher.clone(), SessionConfig::default())
        .wait()
        .await;

    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(fetcher.calls(), vec![("PROJ-7".to_string(), "t7".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_is_retried_by_next_event() {
    let call = answered("c1", "PROJ-1", "t1");
    let host = Arc::new(ScriptedHost::new(vec![
        context(0, call.clone()),
        context(5_000, call),
    ]));
    let fetcher = Arc::new(
        CountingFetcher::new(Duration::from_millis(100)).with_results(vec![Err(exhausted())]),
    );

    let session = CallSession::spawn(host, fetcher.clone(), SessionConfig::default());
    let mut updates = session.subscribe();
    let error = updates
        .wait_for(|s| s.state == SessionState::Error)
        .await
        .unwrap()
        .clone();
    assert_eq!(
        error.error_message.as_deref(),
        Some("Failed to fetch call information after 3 attempts: the request timed out.")
    );
    drop(updates);

    let last = session.wait().await;
    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(last.error_message, None);
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn call_answered_again_shows_handoff_without_refetch() {
    let call = answered("c1", "PROJ-1", "t1");
    let mut ended = call.clone();
    ended.call_status = Some("Disconnected".into());
    let host = Arc::new(ScriptedHost::new(vec![
        context(0, call.clone()),
        context(1_000, ended),
        context(1_000, call),
    ]));
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(100)));

    let last = CallSession::spawn(host, fetcher.clone(), SessionConfig::default())
        .wait()
        .await;

    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(last.handoff, Some(HandoffState::sample()));
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn call_held_and_resumed_during_fetch_loads() {
    let call = answered("c1", "PROJ-1", "t1");
    let mut held = call.clone();
    held.call_status = Some("Hold".into());
    let host = Arc::new(ScriptedHost::new(vec![
        context(0, call.clone()),
        context(100, held),
        context(100, call),
    ]));
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(1_000)));

    let last = CallSession::spawn(host, fetcher.clone(), SessionConfig::default())
        .wait()
        .await;

    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(last.handoff, Some(HandoffState::sample()));
    assert_eq!(last.handoff_project_id.as_deref(), Some("PROJ-1"));
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscription_error_after_ready_is_terminal() {
    let host = Arc::new(ScriptedHost::new(vec![
        context(0, answered("c1", "PROJ-1", "t1")),
        (Duration::from_millis(1_000), HostNotification::Error("socket closed".into())),
        context(1_000, answered("c2", "PROJ-2", "t2")),
    ]));
    let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(100)));

    let last = CallSession::spawn(host, fetcher.clone(), SessionConfig::default())
        .wait()
        .await;

    assert_eq!(last.state, SessionState::Error);
    assert_eq!(last.error_message.as_deref(), Some("socket closed"));
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_host_falls_back_to_development_mode() {
    let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
    let started = tokio::time::Instant::now();

    let last = CallSession::spawn(
        Arc::new(UnavailableHost),
        fetcher.clone(),
        SessionConfig {
            dev_fallback: true,
            ..SessionConfig::default()
        },
    )
    .wait()
    .await;

    assert!(started.elapsed() >= Duration::from_millis(1_000));
    assert!(last.development_mode);
    assert_eq!(last.state, SessionState::Loaded);
    assert_eq!(last.handoff, Some(HandoffState::sample()));
    let identity = last.identity.unwrap();
    assert_eq!(identity.project_id.as_deref(), Some("EXAMPLE-PROJECT-123"));
    assert_eq!(identity.trace_id.as_deref(), Some("1234567890123456789"));
    // the mock fetcher replaces the configured one
    assert!(fetcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_host_without_fallback_is_an_error() {
    let last = CallSession::spawn(
        Arc::new(UnavailableHost),
        Arc::new(CountingFetcher::new(Duration::ZERO)),
        SessionConfig::default(),
    )
    .wait()
    .await;

    assert_eq!(last.state, SessionState::Error);
    assert!(!last.development_mode);
    let message = last.error_message.unwrap();
    assert!(message.contains("not supported"), "{message}");
}

#[tokio::test]
async fn replayed_events_fetch_through_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/poly/handoff_state"))
        .and(query_param("projectId", "EXAMPLE-PROJECT-123"))
        .and(query_param("sharedId", "555"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "test_value_1": "XYZ-1" },
            "id": null,
            "shared_id": "555",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let events = [
        json!({ "callId": "c9", "callStatus": "Ringing" }),
        json!({
            "callId": "c9",
            "callStatus": "Active",
            "callObject": {
                "forwardedBy": { "name": "support__EXAMPLE-PROJECT-123" },
                "traceId": "555"
            }
        }),
        json!({
            "callId": "c9",
            "callStatus": "Active",
            "callObject": {
                "forwardedBy": { "name": "support__EXAMPLE-PROJECT-123" },
                "traceId": "555"
            }
        }),
    ]
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    let host = Arc::new(JsonLinesHost::from_reader(Cursor::new(events.into_bytes())));
    let fetcher = Arc::new(HandoffClient::new(FetchConfig {
        base_url: server.uri(),
        ..FetchConfig::default()
    }));

    let last = CallSession::spawn(host, fetcher, SessionConfig::default())
        .wait()
        .await;

    assert_eq!(last.state, SessionState::Loaded);
    let handoff = last.handoff.unwrap();
    assert_eq!(handoff.shared_id, "555");
    assert_eq!(handoff.data["test_value_1"], json!("XYZ-1"));
}
