use std::time::Duration;

pub struct EndpointPaths {
    pub submit_sweep: &'static str,
    /// Followed by `/{test_id}`
    pub progress: &'static str,
    /// Followed by `/{test_id}`
    pub results: &'static str,
    pub trading_start: &'static str,
    pub trading_stop: &'static str,
}

pub struct ApiConfig {
    pub base_url: &'static str,
    /// The submission endpoint must answer well before the job finishes.
    pub submit_timeout: Duration,
    pub status_timeout: Duration,
    pub request_timeout: Duration,
    pub paths: EndpointPaths,
}

pub const API: ApiConfig = ApiConfig {
    base_url: "http://localhost:8000",
    submit_timeout: Duration::from_secs(10),
    status_timeout: Duration::from_secs(5),
    request_timeout: Duration::from_secs(15),
    paths: EndpointPaths {
        submit_sweep: "/api/backtest/multi-run",
        progress: "/api/backtest/progress",
        results: "/api/backtest/results",
        trading_start: "/api/trading/start",
        trading_stop: "/api/trading/stop",
    },
};
