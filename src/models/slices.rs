use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BufferCaps;
use crate::models::{AlertLedger, LogBuffer};

/// One open broker position as pushed by `positions_update`.
/// Unknown fields are kept in `extra` so the view can still show them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub ticket: Option<Value>,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: Option<String>,
    pub volume: Option<f64>,
    pub price_open: Option<f64>,
    pub price_current: Option<f64>,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub profit: Option<f64>,
    pub swap: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The client-held state, one field per slice.
///
/// Stats slices are opaque JSON: their schema belongs to the backend and the
/// view, and this layer only swaps them.
#[derive(Debug, Clone)]
pub struct LiveState {
    pub system_stats: Option<Value>,
    pub trading_stats: Option<Value>,
    pub broker_status: Option<Value>,
    pub database_status: Option<Value>,
    pub performance: Option<Value>,
    pub risk_metrics: Option<Value>,
    pub positions: Vec<Position>,
    pub alerts: AlertLedger,
    pub logs: LogBuffer,
}

impl LiveState {
    pub fn new(caps: BufferCaps) -> Self {
        Self {
            system_stats: None,
            trading_stats: None,
            broker_status: None,
            database_status: None,
            performance: None,
            risk_metrics: None,
            positions: Vec::new(),
            alerts: AlertLedger::new(caps.alerts),
            logs: LogBuffer::new(caps.logs),
        }
    }

    pub fn total_profit(&self) -> f64 {
        self.positions.iter().filter_map(|p| p.profit).sum()
    }
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new(BufferCaps::default())
    }
}
