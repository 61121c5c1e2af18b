// src/models/alert.rs

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub level: AlertLevel,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<String>,
}

impl Alert {
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "alert id must be a string or number, got {}",
            other
        ))),
    }
}

/// Capped, newest-first alert collection. Eviction is strictly by arrival
/// order: when the cap is hit the oldest entry goes, whatever its level.
#[derive(Debug, Clone)]
pub struct AlertLedger {
    alerts: VecDeque<Alert>,
    cap: usize,
}

impl AlertLedger {
    pub fn new(cap: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(cap.min(128)),
            cap,
        }
    }

    /// Insert one alert at the front. A repeated id replaces the old entry;
    /// an acknowledged entry stays acknowledged.
    pub fn push(&mut self, alert: Alert) {
        let alert = self.absorb_existing(alert);
        self.alerts.push_front(alert);
        self.alerts.truncate(self.cap);
    }

    /// Insert a batch so that `batch[0]` ends up first.
    pub fn push_batch(&mut self, batch: Vec<Alert>) {
        for alert in batch.into_iter().rev() {
            let alert = self.absorb_existing(alert);
            self.alerts.push_front(alert);
        }
        self.alerts.truncate(self.cap);
    }

    /// Returns false if the id is unknown.
    pub fn acknowledge(&mut self, id: &str, by: Option<String>, at: Option<String>) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                if by.is_some() {
                    alert.acknowledged_by = by;
                }
                if at.is_some() {
                    alert.acknowledged_at = at;
                }
                true
            }
            None => false,
        }
    }

    pub fn dismiss(&mut self, id: &str) -> Option<Alert> {
        let idx = self.alerts.iter().position(|a| a.id == id)?;
        self.alerts.remove(idx)
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn to_vec(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn unacknowledged(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    fn absorb_existing(&mut self, mut incoming: Alert) -> Alert {
        if let Some(previous) = self.dismiss(&incoming.id) {
            if previous.acknowledged {
                incoming.acknowledged = true;
                incoming.acknowledged_by = incoming.acknowledged_by.or(previous.acknowledged_by);
                incoming.acknowledged_at = incoming.acknowledged_at.or(previous.acknowledged_at);
            }
        }
        incoming
    }
}

#[cfg(test)]
pub(crate) fn sample_alert(id: &str, level: AlertLevel) -> Alert {
    Alert {
        id: id.to_string(),
        level,
        kind: "drawdown".to_string(),
        message: format!("alert {}", id),
        details: None,
        value: Some(4.2),
        threshold: Some(4.0),
        source: Some("risk".to_string()),
        timestamp: "2026-03-01T12:00:00Z".to_string(),
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
    }
}
