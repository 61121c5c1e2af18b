use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::time::Instant;

use trade_deck::config::{BufferCaps, ChannelSettings, ReconnectPolicy, TRACKER};
use trade_deck::data::{
    ChannelTransport, JobStatusSource, JobSubmitter, PeerLink, PushChannelClient, SocketLink,
    StatusError, SubmitError,
};
use trade_deck::engine::{
    ConnectionState, JobLauncher, JobProgressTracker, SessionCallbacks, TrackerPhase,
};
use trade_deck::models::{JobStatus, ProgressState, SubmitResponse, SweepRequest};

struct Backend {
    replies: Mutex<VecDeque<ProgressState>>,
    polls: AtomicU32,
}

#[async_trait]
impl JobSubmitter for Backend {
    async fn submit_sweep(&self, request: &SweepRequest) -> Result<SubmitResponse, SubmitError> {
        Ok(SubmitResponse {
            test_id: Some("abc".into()),
            message: "Multi-run backtest started".into(),
            total_configurations: request.configuration_count() as u32,
        })
    }
}

#[async_trait]
impl JobStatusSource for Backend {
    async fn fetch_status(&self, test_id: &str) -> Result<ProgressState, StatusError> {
        assert_eq!(test_id, "abc");
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(StatusError::NotFound)
    }
}

fn seven_by_seven() -> SweepRequest {
    let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    SweepRequest {
        symbols: list(&["EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "USDCAD", "XAUUSD", "NZDUSD"]),
        timeframes: list(&["M1", "M5", "M15", "M30", "H1", "H4", "D1"]),
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        initial_balance: 10_000.0,
        strategy: None,
    }
}

#[tokio::test(start_paused = true)]
async fn submitted_sweep_is_tracked_to_completion() {
    let mut replies: VecDeque<ProgressState> = (0..3)
        .map(|_| {
            let mut p = ProgressState::running("abc", 40.0);
            p.total_configurations = 49;
            p
        })
        .collect();
    let mut done = ProgressState::running("abc", 100.0).with_status(JobStatus::Completed);
    done.total_configurations = 49;
    done.completed_configurations = 49;
    replies.push_back(done);

    let backend = Arc::new(Backend {
        replies: Mutex::new(replies),
        polls: AtomicU32::new(0),
    });
    let tracker = JobProgressTracker::new(backend.clone(), TRACKER, Handle::current());
    let launcher = JobLauncher::new(backend.clone());

    let completions = Arc::new(AtomicU32::new(0));
    let (tx, rx) = tokio::sync::oneshot::channel();
    let counter = completions.clone();
    let callbacks = SessionCallbacks::new(
        move |state| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(state);
        },
        |error| panic!("sweep failed: {}", error),
    );

    let t0 = Instant::now();
    let receipt = launcher
        .launch(&tracker, &seven_by_seven(), callbacks)
        .await
        .unwrap();
    assert_eq!(receipt.test_id, "abc");
    assert_eq!(receipt.total_configurations, 49);

    let final_state = rx.await.unwrap();
    assert!(t0.elapsed() >= Duration::from_secs(5));
    assert_eq!(final_state.status, JobStatus::Completed);
    assert_eq!(final_state.progress_percent, 100.0);
    assert_eq!(final_state.completed_configurations, 49);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(backend.polls.load(Ordering::SeqCst), 4);
    assert_eq!(tracker.snapshot().phase, TrackerPhase::Completed);
}

struct RefusingTransport {
    opens: AtomicU32,
}

#[async_trait]
impl ChannelTransport for RefusingTransport {
    async fn open(&self, _url: &str) -> Result<SocketLink> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("connection refused"))
    }
}

/// Hands out prepared links in order, then refuses.
struct QueuedLinks(Mutex<VecDeque<SocketLink>>);

impl QueuedLinks {
    fn with(links: impl IntoIterator<Item = SocketLink>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(links.into_iter().collect())))
    }
}

#[async_trait]
impl ChannelTransport for QueuedLinks {
    async fn open(&self, _url: &str) -> Result<SocketLink> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no more links"))
    }
}

fn channel_settings() -> ChannelSettings {
    ChannelSettings {
        url: "ws://backend/ws".into(),
        connect_timeout: Duration::from_secs(1),
        reconnect: ReconnectPolicy {
            interval: Duration::from_millis(5000),
            max_attempts: 10,
        },
        buffers: BufferCaps::default(),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn eleven_failures_end_in_failed_after_ten_timers() {
    let transport = Arc::new(RefusingTransport {
        opens: AtomicU32::new(0),
    });
    let client = PushChannelClient::new(channel_settings(), transport.clone(), &Handle::current());
    client.connect();

    tokio::time::sleep(Duration::from_secs(120)).await;
    let snap = client.connection();
    assert_eq!(snap.state, ConnectionState::Failed);
    assert_eq!(snap.scheduled_reconnects, 10);
    assert_eq!(transport.opens.load(Ordering::SeqCst), 11);

    // Only a manual connect starts over.
    client.connect();
    settle().await;
    assert_eq!(transport.opens.load(Ordering::SeqCst), 12);
    assert_eq!(client.connection().state, ConnectionState::Reconnecting);
}

#[tokio::test(start_paused = true)]
async fn live_feed_keeps_acknowledgements_and_ignores_unknown_topics() {
    let (link, peer) = SocketLink::in_memory();
    let PeerLink {
        to_client,
        mut from_client,
    } = peer;
    let client = PushChannelClient::new(
        channel_settings(),
        QueuedLinks::with([link]),
        &Handle::current(),
    );
    client.connect();
    settle().await;
    assert!(client.is_open());

    let alert = json!({
        "id": 7, "level": "critical", "type": "margin_level",
        "message": "Margin level below 150%", "timestamp": "2026-03-01T09:30:00Z"
    });
    to_client
        .send(json!({"type": "new_alert", "alert": alert}).to_string())
        .unwrap();
    settle().await;
    let before = client.snapshot();

    to_client
        .send(json!({"type": "quantum_flux", "data": {"positions": []}}).to_string())
        .unwrap();
    to_client.send("{not json".into()).unwrap();
    settle().await;
    let after = client.snapshot();
    assert_eq!(after.alerts.to_vec(), before.alerts.to_vec());
    assert_eq!(after.positions, before.positions);
    assert_eq!(after.system_stats, before.system_stats);

    assert!(client.acknowledge_alert("7"));
    assert!(from_client.recv().await.unwrap().contains("\"alert_id\":\"7\""));

    to_client
        .send(
            json!({"type": "alert_acknowledged", "data": {"alert_id": "7", "acknowledged_by": "ops"}})
                .to_string(),
        )
        .unwrap();
    to_client
        .send(json!({"type": "system_alerts", "alerts": [alert]}).to_string())
        .unwrap();
    settle().await;

    let alerts = client.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].acknowledged);
    assert_eq!(alerts[0].acknowledged_by.as_deref(), Some("ops"));

    to_client
        .send(json!({"type": "alert_dismissed", "data": {"alert_id": 7}}).to_string())
        .unwrap();
    settle().await;
    assert!(client.alerts().is_empty());

    client.disconnect();
    settle().await;
    assert_eq!(client.connection().state, ConnectionState::Closed);
    assert!(!client.clear_alerts());
}

#[tokio::test(start_paused = true)]
async fn dropped_link_recovers_on_the_next_timer() {
    let (first, first_peer) = SocketLink::in_memory();
    let (second, second_peer) = SocketLink::in_memory();
    let PeerLink {
        to_client,
        mut from_client,
    } = second_peer;
    let client = PushChannelClient::new(
        channel_settings(),
        QueuedLinks::with([first, second]),
        &Handle::current(),
    );
    client.connect();
    settle().await;
    assert!(client.is_open());

    drop(first_peer);
    settle().await;
    let snap = client.connection();
    assert_eq!(snap.state, ConnectionState::Reconnecting);
    assert_eq!(snap.reconnect_attempts, 1);
    assert_eq!(snap.dropped_links, 1);
    assert!(!client.request_logs("system", 50));

    // Still waiting out the 5s interval, and the loss was counted once.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let snap = client.connection();
    assert_eq!(snap.state, ConnectionState::Reconnecting);
    assert_eq!(snap.dropped_links, 1);

    tokio::time::sleep(Duration::from_millis(2600)).await;
    let snap = client.connection();
    assert_eq!(snap.state, ConnectionState::Open);
    assert_eq!(snap.reconnect_attempts, 0);
    assert_eq!(snap.scheduled_reconnects, 1);

    to_client
        .send(json!({"type": "database_status", "data": {"connected": true}}).to_string())
        .unwrap();
    settle().await;
    assert_eq!(
        client.with_state(|s| s.database_status.clone()),
        Some(json!({"connected": true}))
    );
    assert!(client.request_logs("system", 50));
    assert!(from_client.recv().await.unwrap().contains("request_logs"));
}
