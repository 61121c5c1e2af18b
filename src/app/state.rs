use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{LaunchError, LaunchReceipt, SessionResult};
use crate::models::SweepRequest;

/// Messages from runtime tasks back to the UI thread.
pub(crate) enum AppEvent {
    Launched(Result<LaunchReceipt, LaunchError>),
    SessionFinished(SessionResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("at least one symbol is required")]
    NoSymbols,
    #[error("at least one timeframe is required")]
    NoTimeframes,
    #[error("'{0}' is not a YYYY-MM-DD date")]
    BadDate(String),
    #[error("end date is before start date")]
    EmptyRange,
    #[error("initial balance must be positive")]
    BadBalance,
}

/// Backtest form as typed by the operator. Persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepForm {
    pub symbols: String,
    pub timeframes: String,
    pub start_date: String,
    pub end_date: String,
    pub initial_balance: f64,
}

impl Default for SweepForm {
    fn default() -> Self {
        Self {
            symbols: "EURUSD, GBPUSD, USDJPY".to_string(),
            timeframes: "M15, H1, H4".to_string(),
            start_date: "2025-01-01".to_string(),
            end_date: "2025-06-30".to_string(),
            initial_balance: 10_000.0,
        }
    }
}

impl SweepForm {
    pub fn to_request(&self) -> Result<SweepRequest, FormError> {
        let symbols = split_list(&self.symbols);
        if symbols.is_empty() {
            return Err(FormError::NoSymbols);
        }
        let timeframes = split_list(&self.timeframes);
        if timeframes.is_empty() {
            return Err(FormError::NoTimeframes);
        }
        let start_date = parse_date(&self.start_date)?;
        let end_date = parse_date(&self.end_date)?;
        if end_date < start_date {
            return Err(FormError::EmptyRange);
        }
        if self.initial_balance.is_nan() || self.initial_balance <= 0.0 {
            return Err(FormError::BadBalance);
        }
        Ok(SweepRequest {
            symbols,
            timeframes,
            start_date,
            end_date,
            initial_balance: self.initial_balance,
            strategy: None,
        })
    }
}

/// Comma/space separated, upper-cased, first occurrence wins.
fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let item = item.trim().to_ascii_uppercase();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn parse_date(raw: &str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FormError::BadDate(raw.trim().to_string()))
}

/// Everything the dashboard remembers between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct UiPrefs {
    pub(crate) form: SweepForm,
    pub(crate) log_type: String,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self {
            form: SweepForm::default(),
            log_type: "trading".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_is_a_valid_sweep() {
        let req = SweepForm::default().to_request().unwrap();
        assert_eq!(req.configuration_count(), 9);
        assert_eq!(req.symbols[0], "EURUSD");
    }

    #[test]
    fn lists_are_normalised() {
        let form = SweepForm {
            symbols: " eurusd,,EURUSD  xauusd ".into(),
            timeframes: "h1".into(),
            ..SweepForm::default()
        };
        let req = form.to_request().unwrap();
        assert_eq!(req.symbols, vec!["EURUSD", "XAUUSD"]);
        assert_eq!(req.timeframes, vec!["H1"]);
    }

    #[test]
    fn rejects_bad_input() {
        let base = SweepForm::default();
        let cases = [
            (SweepForm { symbols: " , ".into(), ..base.clone() }, FormError::NoSymbols),
            (SweepForm { timeframes: "".into(), ..base.clone() }, FormError::NoTimeframes),
            (
                SweepForm { start_date: "01/02/2025".into(), ..base.clone() },
                FormError::BadDate("01/02/2025".into()),
            ),
            (
                SweepForm { end_date: "2024-12-31".into(), ..base.clone() },
                FormError::EmptyRange,
            ),
            (SweepForm { initial_balance: 0.0, ..base.clone() }, FormError::BadBalance),
        ];
        for (form, expected) in cases {
            assert_eq!(form.to_request().unwrap_err(), expected);
        }
    }
}
