//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Emit every raw push-channel frame.
    pub log_channel_frames: bool,

    /// Emit liveness topics (`connection_established`, `heartbeat`).
    pub log_heartbeats: bool,

    /// Emit one line per status poll.
    pub log_poll_ticks: bool,

    /// Arm `SlowScope` timers
    pub log_performance: bool,

    pub log_commands: bool,
}

pub const DF: LogFlags = LogFlags {
    log_channel_frames: false,
    log_heartbeats: false,
    log_poll_ticks: false,
    log_performance: false,
    log_commands: true,
};
