mod panels;
mod styles;
mod ui_config;
mod ui_text;

pub(crate) use panels::{
    PanelAction, render_alerts, render_backtest_panel, render_connection_bar, render_logs,
    render_positions, render_stats_panel,
};
pub(crate) use styles::setup_custom_visuals;
pub(crate) use ui_config::{UI_CONFIG, UI_TEXT};
