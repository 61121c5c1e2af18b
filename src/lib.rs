#![allow(clippy::type_complexity)]

pub mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod models;
pub mod ui;
pub mod utils;

pub use app::DashboardApp;
pub use data::{BacktestApi, ConnectionSnapshot, PushChannelClient};
pub use engine::{JobLauncher, JobProgressTracker, SessionCallbacks};

use clap::Parser;

use crate::config::{API, CHANNEL};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Push channel endpoint
    #[arg(long, default_value_t = CHANNEL.url.to_string())]
    pub ws_url: String,

    /// Base URL of the backtest / trading HTTP API
    #[arg(long, default_value_t = API.base_url.to_string())]
    pub api_url: String,

    /// Fixed delay between automatic reconnect attempts
    #[arg(long, default_value_t = CHANNEL.reconnect.interval.as_millis() as u64)]
    pub reconnect_interval_ms: u64,

    /// Automatic reconnects before the channel is marked failed
    #[arg(long, default_value_t = CHANNEL.reconnect.max_attempts)]
    pub max_reconnect_attempts: u32,
}

/// Main application entry point - creates the GUI app
pub fn run_app(cc: &eframe::CreationContext<'_>, args: Cli) -> anyhow::Result<DashboardApp> {
    DashboardApp::new(cc, args)
}
