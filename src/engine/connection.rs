//! Reconnection state machine for the push channel.
//!
//! `Connection::apply` is pure: it updates the state and returns the side
//! effects the driver must perform (open/close the socket, arm/disarm the
//! single reconnect timer).

use std::time::Duration;

use serde::Serialize;
use strum_macros::Display;

use crate::config::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Reconnecting,
    /// Reconnect budget spent. Only a manual `connect`/`reconnect` leaves it.
    Failed,
    /// Deliberately disconnected.
    Closed,
}

impl ConnectionState {
    /// True when the UI should show a persistent "disconnected" indicator.
    pub fn is_down(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    ConnectRequested,
    ReconnectRequested,
    DisconnectRequested,
    Opened,
    /// Socket closed, errored, or failed to open.
    Lost,
    ReconnectTimerFired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEffect {
    OpenSocket,
    CloseSocket,
    ScheduleReconnect(Duration),
    CancelReconnect,
}

/// One logical connection; survives any number of physical sockets.
#[derive(Debug, Clone)]
pub struct Connection {
    state: ConnectionState,
    reconnect_attempts: u32,
    policy: ReconnectPolicy,
}

impl Connection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            reconnect_attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn apply(&mut self, event: ChannelEvent) -> Vec<ChannelEffect> {
        use ChannelEffect::*;
        use ChannelEvent::*;
        use ConnectionState::*;

        match (self.state, event) {
            (Open | Connecting, ConnectRequested) => vec![],
            (Reconnecting, ConnectRequested) => {
                self.state = Connecting;
                vec![CancelReconnect, OpenSocket]
            }
            (Idle | Closed | Failed, ConnectRequested) => {
                self.reconnect_attempts = 0;
                self.state = Connecting;
                vec![OpenSocket]
            }

            (_, ReconnectRequested) => {
                self.reconnect_attempts = 0;
                self.state = Connecting;
                vec![CancelReconnect, CloseSocket, OpenSocket]
            }

            (_, DisconnectRequested) => {
                self.state = Closed;
                vec![CancelReconnect, CloseSocket]
            }

            (Connecting, Opened) => {
                self.state = Open;
                self.reconnect_attempts = 0;
                vec![]
            }
            // An open that nobody is waiting for anymore.
            (_, Opened) => vec![CloseSocket],

            (Open | Connecting, Lost) => {
                self.state = Reconnecting;
                self.schedule_or_fail()
            }
            (_, Lost) => vec![],

            (Reconnecting, ReconnectTimerFired) => {
                self.state = Connecting;
                vec![OpenSocket]
            }
            (_, ReconnectTimerFired) => vec![],
        }
    }

    fn schedule_or_fail(&mut self) -> Vec<ChannelEffect> {
        if self.reconnect_attempts < self.policy.max_attempts {
            self.reconnect_attempts += 1;
            vec![
                ChannelEffect::CloseSocket,
                ChannelEffect::CancelReconnect,
                ChannelEffect::ScheduleReconnect(self.policy.interval),
            ]
        } else {
            self.state = ConnectionState::Failed;
            vec![ChannelEffect::CloseSocket]
        }
    }
}
