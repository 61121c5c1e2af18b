use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::API;
use crate::models::{ProgressState, SubmitResponse, SweepRequest};

/// Failure of a single status request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// The job is not registered yet.
    #[error("job not found")]
    NotFound,

    /// Client-side timeout or a timeout-class response (server busy).
    #[error("status request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode status: {0}")]
    Decode(String),
}

impl StatusError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StatusError::NotFound | StatusError::Timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("submission rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("submission failed: {0}")]
    Transport(String),

    #[error("could not decode submission response: {0}")]
    Decode(String),
}

/// Pull side of job observation.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn fetch_status(&self, test_id: &str) -> Result<ProgressState, StatusError>;
}

/// Fire side: must return as soon as the server has accepted the job.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit_sweep(&self, request: &SweepRequest) -> Result<SubmitResponse, SubmitError>;
}

/// Map a non-success status code onto the retry taxonomy.
pub fn classify_status(status: StatusCode, body: String) -> StatusError {
    match status {
        StatusCode::NOT_FOUND => StatusError::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StatusError::Timeout,
        other => StatusError::Http {
            status: other.as_u16(),
            message: body,
        },
    }
}

fn classify_transport(e: reqwest::Error) -> StatusError {
    if e.is_timeout() {
        StatusError::Timeout
    } else if e.is_decode() {
        StatusError::Decode(e.to_string())
    } else {
        StatusError::Transport(e.to_string())
    }
}

/// HTTP client for the backtest / trading-control endpoints.
#[derive(Clone)]
pub struct BacktestApi {
    base_url: String,
    http: Client,
}

impl BacktestApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(API.request_timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Full results of a finished sweep. Schema is owned by the backend.
    pub async fn fetch_results(&self, test_id: &str) -> Result<Value> {
        let url = self.url(&format!("{}/{}", API.paths.results, test_id));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching results for {}", test_id))?
            .error_for_status()
            .with_context(|| format!("results for {} unavailable", test_id))?;
        resp.json().await.context("parsing results")
    }

    pub async fn start_trading(&self) -> Result<Value> {
        self.post_control(API.paths.trading_start).await
    }

    pub async fn stop_trading(&self) -> Result<Value> {
        self.post_control(API.paths.trading_stop).await
    }

    async fn post_control(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(path))
            .send()
            .await
            .with_context(|| format!("POST {}", path))?
            .error_for_status()
            .with_context(|| format!("POST {} rejected", path))?;
        resp.json().await.context("parsing control response")
    }
}

#[async_trait]
impl JobStatusSource for BacktestApi {
    async fn fetch_status(&self, test_id: &str) -> Result<ProgressState, StatusError> {
        let url = self.url(&format!("{}/{}", API.paths.progress, test_id));
        let resp = self
            .http
            .get(&url)
            .timeout(API.status_timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }
        resp.json::<ProgressState>().await.map_err(classify_transport)
    }
}

#[async_trait]
impl JobSubmitter for BacktestApi {
    async fn submit_sweep(&self, request: &SweepRequest) -> Result<SubmitResponse, SubmitError> {
        let resp = self
            .http
            .post(self.url(API.paths.submit_sweep))
            .timeout(API.submit_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<SubmitResponse>()
            .await
            .map_err(|e| SubmitError::Decode(e.to_string()))
    }
}
