use std::time::Duration;

use crate::Cli;
use crate::config::{API, ChannelSettings, PollPolicy, ReconnectPolicy, TRACKER};

/// Everything the core needs at runtime, after CLI overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub channel: ChannelSettings,
    pub api_base_url: String,
    pub poll: PollPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel: ChannelSettings::default(),
            api_base_url: API.base_url.to_string(),
            poll: TRACKER,
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            channel: ChannelSettings {
                url: cli.ws_url.clone(),
                reconnect: ReconnectPolicy {
                    interval: Duration::from_millis(cli.reconnect_interval_ms),
                    max_attempts: cli.max_reconnect_attempts,
                },
                ..defaults.channel
            },
            api_base_url: cli.api_url.trim_end_matches('/').to_string(),
            poll: defaults.poll,
        }
    }
}
