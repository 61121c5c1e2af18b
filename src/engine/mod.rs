mod connection;
mod dispatch;
mod launcher;
mod session;
mod tracker;

pub use connection::{ChannelEffect, ChannelEvent, Connection, ConnectionState};
pub use dispatch::{DispatchOutcome, apply_envelope, apply_frame};
pub use launcher::{JobLauncher, LaunchError, LaunchReceipt};
pub use session::{JobOutcome, PollSession, TickVerdict, TrackerError};
pub use tracker::{
    JobProgressTracker, SessionCallbacks, SessionResult, TrackerPhase, TrackerSnapshot,
};
