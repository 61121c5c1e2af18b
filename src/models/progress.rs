use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Snapshot returned by the job status endpoint. Replaced wholesale on every
/// successful poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub test_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub progress_percent: f64,
    #[serde(default)]
    pub total_configurations: u32,
    #[serde(default)]
    pub completed_configurations: u32,
    #[serde(default)]
    pub current_symbol: Option<String>,
    #[serde(default)]
    pub current_timeframe: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub estimated_time_remaining: Option<f64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, alias = "error")]
    pub error_message: Option<String>,
}

impl ProgressState {
    pub fn running(test_id: &str, progress_percent: f64) -> Self {
        Self {
            test_id: test_id.to_string(),
            status: JobStatus::Running,
            current_step: String::new(),
            progress_percent,
            total_configurations: 0,
            completed_configurations: 0,
            current_symbol: None,
            current_timeframe: None,
            estimated_time_remaining: None,
            start_time: None,
            logs: Vec::new(),
            error_message: None,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Clamp the server's percentage into `[0, 100]`; NaN becomes 0.
    pub fn normalized(mut self) -> Self {
        self.progress_percent = if self.progress_percent.is_nan() {
            0.0
        } else {
            self.progress_percent.clamp(0.0, 100.0)
        };
        self
    }

    pub fn fraction(&self) -> f32 {
        (self.progress_percent / 100.0) as f32
    }

    /// The job's own explanation for an `error` status.
    pub fn failure_reason(&self) -> String {
        match &self.error_message {
            Some(msg) if !msg.is_empty() => msg.clone(),
            _ if !self.current_step.is_empty() => self.current_step.clone(),
            _ => "job reported an error without a reason".to_string(),
        }
    }
}

/// A sweep over every symbol x timeframe combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub symbols: Vec<String>,
    pub timeframes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl SweepRequest {
    pub fn configuration_count(&self) -> usize {
        self.symbols.len() * self.timeframes.len()
    }
}

/// Answer of the submission endpoint. `test_id` is optional on the wire so a
/// missing id can be reported instead of failing to decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitResponse {
    pub test_id: Option<String>,
    pub message: String,
    pub total_configurations: u32,
}
