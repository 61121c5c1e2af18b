use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// One inbound push-channel message. Consumed by the dispatcher and discarded.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<String>,
    pub data: Option<Value>,
    pub alert: Option<Value>,
    pub alerts: Option<Vec<Value>>,
}

impl Envelope {
    /// `data.<key>`, if present and not null.
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .filter(|v| !v.is_null())
    }

    pub fn data_str(&self, key: &str) -> Option<String> {
        match self.data_field(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Every topic the dispatcher understands. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    // Full-replace slices
    SystemStats,
    TradingStats,
    #[strum(to_string = "mt5_status")]
    Mt5Status,
    DatabaseStatus,
    PerformanceStats,
    PerformanceMetrics,
    RiskMetrics,
    // Incremental slices
    PositionsUpdate,
    SystemAlert,
    TradingAlert,
    NewAlert,
    SystemAlerts,
    TradingAlerts,
    AlertAcknowledged,
    AlertDismissed,
    AlertsCleared,
    LogData,
    LogUpdate,
    // Liveness only
    ConnectionEstablished,
    Heartbeat,
}

impl Topic {
    pub fn is_control(self) -> bool {
        matches!(self, Topic::ConnectionEstablished | Topic::Heartbeat)
    }
}

/// Outbound requests. Local state never changes on send; it changes when the
/// server's confirming envelope arrives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    AcknowledgeAlert {
        alert_id: String,
    },
    DismissAlert {
        alert_id: String,
    },
    ClearAlerts,
    RequestLogs {
        log_type: String,
        lines: u32,
    },
    SearchLogs {
        search_term: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        log_type: Option<String>,
    },
}
