//! Configuration module for the dashboard.

// Can all be private now because we have a public re-export.
mod api;
mod channel;
mod debug;
mod settings;
mod tracker;

// Re-export commonly used items
pub use api::{API, ApiConfig, EndpointPaths};
pub use channel::{BufferCaps, CHANNEL, ChannelConfig, ChannelSettings, ReconnectPolicy};
pub use debug::DF;
pub use settings::Settings;
pub use tracker::{PollPolicy, TRACKER};
