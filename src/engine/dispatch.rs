//! Envelope demultiplexer: one inbound frame updates at most one slice.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::{Alert, Envelope, LiveState, LogEntry, Position, Topic};

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied(Topic),
    /// Liveness topic; no state touched.
    Control(Topic),
    /// Known topic whose payload could not be used; no state touched.
    Rejected { topic: Topic, reason: String },
    Unknown(String),
    Malformed(String),
}

/// Parse one raw frame and apply it. Never panics, whatever the input.
pub fn apply_frame(state: &mut LiveState, raw: &str) -> DispatchOutcome {
    match serde_json::from_str::<Envelope>(raw) {
        Ok(envelope) => apply_envelope(state, envelope),
        Err(e) => {
            log::warn!("Dropping malformed push frame: {}", e);
            DispatchOutcome::Malformed(e.to_string())
        }
    }
}

pub fn apply_envelope(state: &mut LiveState, envelope: Envelope) -> DispatchOutcome {
    let Ok(topic) = Topic::from_str(&envelope.kind) else {
        log::debug!("Ignoring unknown push topic '{}'", envelope.kind);
        return DispatchOutcome::Unknown(envelope.kind);
    };

    if topic.is_control() {
        #[cfg(debug_assertions)]
        if DF.log_heartbeats {
            log::debug!(
                "[{}] at {}",
                topic,
                envelope.timestamp.as_deref().unwrap_or("-")
            );
        }
        return DispatchOutcome::Control(topic);
    }

    match update_slice(state, topic, envelope) {
        Ok(()) => DispatchOutcome::Applied(topic),
        Err(reason) => {
            log::warn!("Rejected '{}' envelope: {}", topic, reason);
            DispatchOutcome::Rejected { topic, reason }
        }
    }
}

fn update_slice(state: &mut LiveState, topic: Topic, envelope: Envelope) -> Result<(), String> {
    match topic {
        Topic::SystemStats => state.system_stats = envelope.data,
        Topic::TradingStats => state.trading_stats = envelope.data,
        Topic::Mt5Status => state.broker_status = envelope.data,
        Topic::DatabaseStatus => state.database_status = envelope.data,
        Topic::PerformanceStats | Topic::PerformanceMetrics => state.performance = envelope.data,
        Topic::RiskMetrics => state.risk_metrics = envelope.data,

        Topic::PositionsUpdate => {
            state.positions = decode_list::<Position>(envelope.data_field("positions"))?;
        }

        Topic::SystemAlert | Topic::TradingAlert | Topic::NewAlert => {
            let raw = envelope.alert.ok_or("missing 'alert'")?;
            state.alerts.push(decode::<Alert>(raw)?);
        }
        Topic::SystemAlerts | Topic::TradingAlerts => {
            let batch = envelope
                .alerts
                .unwrap_or_default()
                .into_iter()
                .map(decode::<Alert>)
                .collect::<Result<Vec<_>, _>>()?;
            state.alerts.push_batch(batch);
        }
        Topic::AlertAcknowledged => {
            let id = envelope.data_str("alert_id").ok_or("missing 'alert_id'")?;
            let by = envelope.data_str("acknowledged_by");
            let at = envelope
                .data_str("acknowledged_at")
                .or_else(|| envelope.timestamp.clone());
            if !state.alerts.acknowledge(&id, by, at) {
                log::debug!("Acknowledgement for unknown alert {}", id);
            }
        }
        Topic::AlertDismissed => {
            let id = envelope.data_str("alert_id").ok_or("missing 'alert_id'")?;
            state.alerts.dismiss(&id);
        }
        Topic::AlertsCleared => state.alerts.clear(),

        Topic::LogData => {
            state
                .logs
                .replace(decode_list::<LogEntry>(envelope.data_field("logs"))?);
        }
        Topic::LogUpdate => {
            state
                .logs
                .prepend(decode_list::<LogEntry>(envelope.data_field("new_entries"))?);
        }

        Topic::ConnectionEstablished | Topic::Heartbeat => {}
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// A missing or null list counts as empty.
fn decode_list<T: DeserializeOwned>(value: Option<&Value>) -> Result<Vec<T>, String> {
    match value {
        None => Ok(Vec::new()),
        Some(v) => decode(v.clone()),
    }
}
