use std::future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Sleep, sleep};

use crate::config::ChannelSettings;
use crate::data::transport::{ChannelTransport, SocketLink};
use crate::engine::{ChannelEffect, ChannelEvent, Connection, ConnectionState, apply_frame};
use crate::models::{Alert, ClientCommand, LiveState, LogEntry, Position};
use crate::utils::SlowScope;

#[cfg(debug_assertions)]
use crate::config::DF;

const FRAME_BUDGET: Duration = Duration::from_millis(1);

/// What the UI needs to draw the connection indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    /// Reconnect timers armed since the client was created.
    pub scheduled_reconnects: u32,
    /// Open sockets that went away without being asked to.
    pub dropped_links: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Connect,
    Reconnect,
    Disconnect,
}

/// Handle to one logical push connection.
///
/// All slice mutation happens inside the driver task, in frame arrival order.
/// Consumers only get clones.
pub struct PushChannelClient {
    live: Arc<RwLock<LiveState>>,
    status: Arc<RwLock<ConnectionSnapshot>>,
    outbound: Arc<Mutex<Option<UnboundedSender<String>>>>,
    control: UnboundedSender<Control>,
}

impl PushChannelClient {
    /// Spawns the (idle) driver on `runtime`. Nothing is opened until `connect`.
    pub fn new(
        settings: ChannelSettings,
        transport: Arc<dyn ChannelTransport>,
        runtime: &Handle,
    ) -> Self {
        let live = Arc::new(RwLock::new(LiveState::new(settings.buffers)));
        let status = Arc::new(RwLock::new(ConnectionSnapshot::default()));
        let outbound = Arc::new(Mutex::new(None));
        let (control, control_rx) = unbounded_channel();

        let driver = ChannelDriver {
            connection: Connection::new(settings.reconnect),
            url: settings.url,
            transport,
            live: live.clone(),
            status: status.clone(),
            outbound: outbound.clone(),
            control_rx,
            link_rx: None,
            pending_open: None,
            reconnect_timer: None,
            scheduled_reconnects: 0,
            dropped_links: 0,
        };
        runtime.spawn(driver.run());

        Self {
            live,
            status,
            outbound,
            control,
        }
    }

    /// Open the channel unless it is already open or opening.
    pub fn connect(&self) {
        self.control(Control::Connect);
    }

    /// Drop the current socket and start over with a fresh attempt budget.
    pub fn reconnect(&self) {
        self.control(Control::Reconnect);
    }

    /// Close the channel; no automatic reconnection follows.
    pub fn disconnect(&self) {
        self.control(Control::Disconnect);
    }

    fn control(&self, cmd: Control) {
        if self.control.send(cmd).is_err() {
            log::error!("Push channel driver is gone; {:?} ignored", cmd);
        }
    }

    /// Transmit a raw text frame. False unless the channel is open.
    pub fn send(&self, message: &str) -> bool {
        let guard = self.outbound.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.send(message.to_string()).is_ok(),
            None => false,
        }
    }

    pub fn send_command(&self, command: &ClientCommand) -> bool {
        let text = match serde_json::to_string(command) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Could not encode {:?}: {}", command, e);
                return false;
            }
        };
        let sent = self.send(&text);
        #[cfg(debug_assertions)]
        if DF.log_commands {
            log::info!("[command] {} sent={}", text, sent);
        }
        sent
    }

    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        self.send_command(&ClientCommand::AcknowledgeAlert {
            alert_id: alert_id.to_string(),
        })
    }

    pub fn dismiss_alert(&self, alert_id: &str) -> bool {
        self.send_command(&ClientCommand::DismissAlert {
            alert_id: alert_id.to_string(),
        })
    }

    pub fn clear_alerts(&self) -> bool {
        self.send_command(&ClientCommand::ClearAlerts)
    }

    pub fn request_logs(&self, log_type: &str, lines: u32) -> bool {
        self.send_command(&ClientCommand::RequestLogs {
            log_type: log_type.to_string(),
            lines,
        })
    }

    pub fn search_logs(&self, search_term: &str, log_type: Option<&str>) -> bool {
        self.send_command(&ClientCommand::SearchLogs {
            search_term: search_term.to_string(),
            log_type: log_type.map(str::to_string),
        })
    }

    // --- Read-only slice access ---

    pub fn connection(&self) -> ConnectionSnapshot {
        self.status
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_open(&self) -> bool {
        self.connection().state == ConnectionState::Open
    }

    /// Borrow the whole state for one read (e.g. one UI frame).
    pub fn with_state<R>(&self, f: impl FnOnce(&LiveState) -> R) -> R {
        let guard = self.live.read().unwrap_or_else(|p| p.into_inner());
        f(&guard)
    }

    pub fn snapshot(&self) -> LiveState {
        self.with_state(|s| s.clone())
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.with_state(|s| s.alerts.to_vec())
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.with_state(|s| s.logs.to_vec())
    }

    pub fn positions(&self) -> Vec<Position> {
        self.with_state(|s| s.positions.clone())
    }
}

struct ChannelDriver {
    connection: Connection,
    url: String,
    transport: Arc<dyn ChannelTransport>,
    live: Arc<RwLock<LiveState>>,
    status: Arc<RwLock<ConnectionSnapshot>>,
    outbound: Arc<Mutex<Option<UnboundedSender<String>>>>,
    control_rx: UnboundedReceiver<Control>,
    link_rx: Option<UnboundedReceiver<String>>,
    pending_open: Option<BoxFuture<'static, Result<SocketLink>>>,
    /// The only reconnect timer. Replaced only after being cleared.
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    scheduled_reconnects: u32,
    dropped_links: u32,
}

enum Wake {
    Control(Option<Control>),
    Opened(Result<SocketLink>),
    Frame(Option<String>),
    TimerFired,
}

impl ChannelDriver {
    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                cmd = self.control_rx.recv() => Wake::Control(cmd),
                opened = poll_pending_open(&mut self.pending_open) => Wake::Opened(opened),
                frame = next_frame(&mut self.link_rx) => Wake::Frame(frame),
                _ = timer_elapsed(&mut self.reconnect_timer) => Wake::TimerFired,
            };

            let event = match wake {
                Wake::Control(Some(Control::Connect)) => ChannelEvent::ConnectRequested,
                Wake::Control(Some(Control::Reconnect)) => ChannelEvent::ReconnectRequested,
                Wake::Control(Some(Control::Disconnect)) => ChannelEvent::DisconnectRequested,
                Wake::Control(None) => {
                    // Client handle dropped.
                    self.step(ChannelEvent::DisconnectRequested);
                    return;
                }
                Wake::Opened(result) => {
                    self.pending_open = None;
                    match result {
                        Ok(link) => {
                            self.install(link);
                            ChannelEvent::Opened
                        }
                        Err(e) => {
                            log::warn!("Push channel open failed: {:#}", e);
                            self.set_error(format!("{:#}", e));
                            ChannelEvent::Lost
                        }
                    }
                }
                Wake::Frame(Some(text)) => {
                    let _timing = SlowScope::start("frame apply", FRAME_BUDGET);
                    let mut live = self.live.write().unwrap_or_else(|p| p.into_inner());
                    apply_frame(&mut live, &text);
                    continue;
                }
                Wake::Frame(None) => {
                    log::warn!("Push channel closed by peer");
                    // A closed receiver resolves at once; keep it out of the select.
                    self.drop_link();
                    self.dropped_links += 1;
                    self.set_error("socket closed".to_string());
                    ChannelEvent::Lost
                }
                Wake::TimerFired => {
                    self.reconnect_timer = None;
                    ChannelEvent::ReconnectTimerFired
                }
            };
            self.step(event);
        }
    }

    fn step(&mut self, event: ChannelEvent) {
        let before = self.connection.state();
        let effects = self.connection.apply(event);
        for effect in effects {
            self.perform(effect);
        }
        let after = self.connection.state();

        if before != after {
            match after {
                ConnectionState::Failed => log::error!(
                    "Push channel gave up after {} reconnect attempts",
                    self.connection.reconnect_attempts()
                ),
                _ => log::info!("Push channel {} -> {}", before, after),
            }
        }
        self.publish();
    }

    fn perform(&mut self, effect: ChannelEffect) {
        match effect {
            ChannelEffect::OpenSocket => {
                self.drop_link();
                let transport = self.transport.clone();
                let url = self.url.clone();
                self.pending_open = Some(Box::pin(async move { transport.open(&url).await }));
            }
            ChannelEffect::CloseSocket => {
                self.pending_open = None;
                self.drop_link();
            }
            ChannelEffect::ScheduleReconnect(delay) => {
                self.reconnect_timer = None;
                self.reconnect_timer = Some(Box::pin(sleep(delay)));
                self.scheduled_reconnects += 1;
                log::warn!(
                    "Push channel reconnect {}/{} in {:?}",
                    self.connection.reconnect_attempts(),
                    self.connection.policy().max_attempts,
                    delay
                );
            }
            ChannelEffect::CancelReconnect => {
                self.reconnect_timer = None;
            }
        }
    }

    fn install(&mut self, link: SocketLink) {
        let SocketLink { outbound, inbound } = link;
        *self.outbound.lock().unwrap_or_else(|p| p.into_inner()) = Some(outbound);
        self.link_rx = Some(inbound);
        self.status
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .last_error = None;
    }

    fn drop_link(&mut self) {
        self.outbound
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        self.link_rx = None;
    }

    fn set_error(&self, error: String) {
        self.status
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .last_error = Some(error);
    }

    fn publish(&self) {
        let mut status = self.status.write().unwrap_or_else(|p| p.into_inner());
        status.state = self.connection.state();
        status.reconnect_attempts = self.connection.reconnect_attempts();
        status.scheduled_reconnects = self.scheduled_reconnects;
        status.dropped_links = self.dropped_links;
    }
}

async fn poll_pending_open(
    pending: &mut Option<BoxFuture<'static, Result<SocketLink>>>,
) -> Result<SocketLink> {
    match pending.as_mut() {
        Some(fut) => fut.await,
        None => future::pending().await,
    }
}

async fn next_frame(link: &mut Option<UnboundedReceiver<String>>) -> Option<String> {
    match link.as_mut() {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn timer_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(t) => t.as_mut().await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BufferCaps, ReconnectPolicy};
    use crate::data::transport::PeerLink;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Refuses every open and counts the attempts.
    struct RefusingTransport {
        opens: AtomicU32,
    }

    /// Transport that returns links prepared by the test, in order.
    struct LinkQueue {
        links: Mutex<VecDeque<SocketLink>>,
    }

    #[async_trait]
    impl ChannelTransport for RefusingTransport {
        async fn open(&self, _url: &str) -> Result<SocketLink> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("connection refused"))
        }
    }

    #[async_trait]
    impl ChannelTransport for LinkQueue {
        async fn open(&self, _url: &str) -> Result<SocketLink> {
            self.links
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    fn settings(max_attempts: u32) -> ChannelSettings {
        ChannelSettings {
            url: "ws://test/ws".into(),
            connect_timeout: Duration::from_secs(1),
            reconnect: ReconnectPolicy {
                interval: Duration::from_millis(200),
                max_attempts,
            },
            buffers: BufferCaps {
                alerts: 100,
                logs: 500,
            },
        }
    }

    async fn wait_for(client: &PushChannelClient, state: ConnectionState) -> ConnectionSnapshot {
        for _ in 0..10_000 {
            let snap = client.connection();
            if snap.state == state {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("never reached {:?}, last {:?}", state, client.connection());
    }

    fn peer_pair() -> (Arc<LinkQueue>, Vec<PeerLink>) {
        let mut links = VecDeque::new();
        let mut peers = Vec::new();
        for _ in 0..3 {
            let (link, peer) = SocketLink::in_memory();
            links.push_back(link);
            peers.push(peer);
        }
        (
            Arc::new(LinkQueue {
                links: Mutex::new(links),
            }),
            peers,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connections_stop_at_the_bound() {
        let transport = Arc::new(RefusingTransport {
            opens: AtomicU32::new(0),
        });
        let client = PushChannelClient::new(settings(10), transport.clone(), &Handle::current());
        client.connect();

        let snap = wait_for(&client, ConnectionState::Failed).await;
        assert_eq!(snap.scheduled_reconnects, 10);
        // initial open + one per timer
        assert_eq!(transport.opens.load(Ordering::SeqCst), 11);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(client.connection().scheduled_reconnects, 10);
        assert_eq!(transport.opens.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_update_slices_in_order() {
        let (transport, mut peers) = peer_pair();
        let client = PushChannelClient::new(settings(10), transport, &Handle::current());
        assert!(!client.send("early"));

        client.connect();
        wait_for(&client, ConnectionState::Open).await;

        let peer = &mut peers[0];
        for cpu in [10, 20, 30] {
            peer.to_client
                .send(json!({"type": "system_stats", "data": {"cpu": cpu}}).to_string())
                .unwrap();
        }
        peer.to_client.send("garbage".into()).unwrap();
        peer.to_client
            .send(json!({"type": "mystery", "data": {}}).to_string())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stats = client.with_state(|s| s.system_stats.clone());
        assert_eq!(stats, Some(json!({"cpu": 30})));
        assert!(client.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_go_out_but_do_not_touch_state() {
        let (transport, mut peers) = peer_pair();
        let client = PushChannelClient::new(settings(10), transport, &Handle::current());
        client.connect();
        wait_for(&client, ConnectionState::Open).await;

        let peer = &mut peers[0];
        peer.to_client
            .send(
                json!({"type": "new_alert", "alert": {
                    "id": "a1", "level": "error", "type": "margin",
                    "message": "margin low", "timestamp": "2026-03-01T12:00:00Z"
                }})
                .to_string(),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(client.acknowledge_alert("a1"));
        assert!(client.request_logs("trading", 100));
        let sent = peer.from_client.recv().await.unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&sent).unwrap(),
            json!({"type": "acknowledge_alert", "alert_id": "a1"})
        );
        assert!(peer.from_client.recv().await.unwrap().contains("request_logs"));
        assert!(!client.alerts()[0].acknowledged);

        peer.to_client
            .send(json!({"type": "alert_acknowledged", "data": {"alert_id": "a1"}}).to_string())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.alerts()[0].acknowledged);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_socket_reconnects_then_resets_attempts() {
        let (transport, mut peers) = peer_pair();
        let client = PushChannelClient::new(settings(10), transport, &Handle::current());
        client.connect();
        wait_for(&client, ConnectionState::Open).await;

        let first = peers.remove(0);
        drop(first);
        let snap = wait_for(&client, ConnectionState::Reconnecting).await;
        assert_eq!(snap.reconnect_attempts, 1);
        assert_eq!(snap.last_error.as_deref(), Some("socket closed"));
        assert!(!client.send("while down"));

        // Half the reconnect interval: the closed link is handled once, not polled again.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let snap = client.connection();
        assert_eq!(snap.state, ConnectionState::Reconnecting);
        assert_eq!(snap.dropped_links, 1);

        let snap = wait_for(&client, ConnectionState::Open).await;
        assert_eq!(snap.reconnect_attempts, 0);
        assert_eq!(snap.scheduled_reconnects, 1);
        assert_eq!(snap.dropped_links, 1);
        assert!(snap.last_error.is_none());

        // The replacement link carries frames.
        peers[0]
            .to_client
            .send(json!({"type": "trading_stats", "data": {"pnl": 12.5}}).to_string())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            client.with_state(|s| s.trading_stats.clone()),
            Some(json!({"pnl": 12.5}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_beats_a_pending_reconnect() {
        let (transport, mut peers) = peer_pair();
        let client = PushChannelClient::new(settings(10), transport, &Handle::current());
        client.connect();
        wait_for(&client, ConnectionState::Open).await;

        drop(peers.remove(0));
        wait_for(&client, ConnectionState::Reconnecting).await;
        client.disconnect();
        wait_for(&client, ConnectionState::Closed).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snap = client.connection();
        assert_eq!(snap.state, ConnectionState::Closed);
        assert_eq!(snap.scheduled_reconnects, 1);
        assert!(!client.send("late"));
    }
}
