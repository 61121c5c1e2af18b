use std::time::Duration;

/// Fixed-delay reconnect policy for the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Upper bounds for the client-held collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCaps {
    pub alerts: usize,
    pub logs: usize,
}

pub struct ChannelConfig {
    pub url: &'static str,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub buffers: BufferCaps,
}

pub const CHANNEL: ChannelConfig = ChannelConfig {
    url: "ws://localhost:8000/ws",
    connect_timeout: Duration::from_secs(10),
    reconnect: ReconnectPolicy {
        interval: Duration::from_millis(5000),
        max_attempts: 10,
    },
    buffers: BufferCaps {
        alerts: 100,
        logs: 500,
    },
};

impl Default for ReconnectPolicy {
    fn default() -> Self {
        CHANNEL.reconnect
    }
}

impl Default for BufferCaps {
    fn default() -> Self {
        CHANNEL.buffers
    }
}

/// Runtime view of the channel configuration (URL may come from the CLI).
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub buffers: BufferCaps,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            url: CHANNEL.url.to_string(),
            connect_timeout: CHANNEL.connect_timeout,
            reconnect: ReconnectPolicy::default(),
            buffers: BufferCaps::default(),
        }
    }
}
