use std::sync::LazyLock;

pub const ICON_PULSE: &str = "\u{e234}";
pub const ICON_WARNING: &str = "\u{ea6c}";
pub const ICON_CLOSE: &str = "\u{f00d}";
pub const ICON_CHECK: &str = "\u{f00c}";
pub const ICON_SEARCH: &str = "\u{f0978}";
pub const ICON_COG: &str = "\u{f013}"; // "working"
pub const ICON_CLOCK: &str = "\u{f0954}";
pub const ICON_DOLLAR_BAG: &str = "\u{ef8d}";
pub const ICON_PLUG: &str = "\u{f1e6}";

pub struct UiText {
    pub app_title: String,

    // --- Connection bar ---
    pub conn_connect: String,
    pub conn_reconnect: String,
    pub conn_disconnect: String,
    pub conn_attempts: String,
    pub conn_disconnected_banner: String,

    // --- Trading ---
    pub trading_start: String,
    pub trading_stop: String,

    // --- Stats ---
    pub stats_heading: String,
    pub stats_system: String,
    pub stats_trading: String,
    pub stats_broker: String,
    pub stats_database: String,
    pub stats_performance: String,
    pub stats_risk: String,
    pub stats_waiting: String,

    // --- Positions ---
    pub positions_heading: String,
    pub positions_empty: String,
    pub positions_total: String,
    pub positions_headers: &'static [&'static str],

    // --- Alerts ---
    pub alerts_heading: String,
    pub alerts_empty: String,
    pub alerts_clear: String,
    pub alerts_ack: String,
    pub alerts_dismiss: String,

    // --- Logs ---
    pub logs_heading: String,
    pub logs_request: String,
    pub logs_search: String,
    pub logs_empty: String,

    // --- Backtest ---
    pub bt_heading: String,
    pub bt_symbols: String,
    pub bt_timeframes: String,
    pub bt_start: String,
    pub bt_end: String,
    pub bt_balance: String,
    pub bt_run: String,
    pub bt_stop: String,
    pub bt_submitting: String,
    pub bt_eta: String,
    pub bt_configs: String,
    pub bt_fetch_results: String,
}

pub static UI_TEXT: LazyLock<UiText> = LazyLock::new(|| UiText {
    app_title: "Trade Deck".to_string(),

    conn_connect: format!("{} Connect", ICON_PLUG),
    conn_reconnect: "Reconnect".to_string(),
    conn_disconnect: "Disconnect".to_string(),
    conn_attempts: "attempts".to_string(),
    conn_disconnected_banner: format!(
        "{} Live feed disconnected. Reconnect to resume updates.",
        ICON_WARNING
    ),

    trading_start: format!("{} Start trading", ICON_DOLLAR_BAG),
    trading_stop: "Stop trading".to_string(),

    stats_heading: format!("{} Live", ICON_PULSE),
    stats_system: "System".to_string(),
    stats_trading: "Trading".to_string(),
    stats_broker: "Broker".to_string(),
    stats_database: "Database".to_string(),
    stats_performance: "Performance".to_string(),
    stats_risk: "Risk".to_string(),
    stats_waiting: "waiting for data".to_string(),

    positions_heading: "Open positions".to_string(),
    positions_empty: "No open positions".to_string(),
    positions_total: "Total P/L".to_string(),
    positions_headers: &[
        "Ticket", "Symbol", "Side", "Volume", "Open", "Current", "SL", "TP", "Profit",
    ],

    alerts_heading: format!("{} Alerts", ICON_WARNING),
    alerts_empty: "No alerts".to_string(),
    alerts_clear: "Clear all".to_string(),
    alerts_ack: ICON_CHECK.to_string(),
    alerts_dismiss: ICON_CLOSE.to_string(),

    logs_heading: "Logs".to_string(),
    logs_request: "Load".to_string(),
    logs_search: format!("{} Search", ICON_SEARCH),
    logs_empty: "No log lines loaded".to_string(),

    bt_heading: format!("{} Backtest sweep", ICON_COG),
    bt_symbols: "Symbols".to_string(),
    bt_timeframes: "Timeframes".to_string(),
    bt_start: "From".to_string(),
    bt_end: "To".to_string(),
    bt_balance: "Balance".to_string(),
    bt_run: "Run sweep".to_string(),
    bt_stop: "Stop watching".to_string(),
    bt_submitting: "Submitting...".to_string(),
    bt_eta: format!("{} ETA", ICON_CLOCK),
    bt_configs: "configurations".to_string(),
    bt_fetch_results: "Load results".to_string(),
});
