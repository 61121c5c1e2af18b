use eframe::egui::{
    Align, Button, Color32, Grid, Layout, ProgressBar, RichText, ScrollArea, TextEdit, Ui,
};
use serde_json::Value;

use crate::app::SweepForm;
use crate::data::ConnectionSnapshot;
use crate::engine::{TrackerPhase, TrackerSnapshot};
use crate::models::{Alert, LiveState, LogEntry, Position};
use crate::ui::styles::{LevelColor, UiStyleExt, get_outcome_color, log_level_color};
use crate::ui::{UI_CONFIG, UI_TEXT};
use crate::utils::{format_eta, format_timestamp};

/// Something the operator clicked. The app turns these into client calls.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PanelAction {
    Connect,
    Reconnect,
    Disconnect,
    StartTrading,
    StopTrading,
    AcknowledgeAlert(String),
    DismissAlert(String),
    ClearAlerts,
    RequestLogs,
    SearchLogs,
    RunSweep,
    StopTracking,
    FetchResults(String),
}

pub(crate) fn render_connection_bar(
    ui: &mut Ui,
    conn: &ConnectionSnapshot,
    max_attempts: u32,
) -> Option<PanelAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        ui.heading(&UI_TEXT.app_title);
        ui.separator();
        ui.label(
            RichText::new(conn.state.to_string())
                .strong()
                .color(conn.state.color()),
        );
        if conn.reconnect_attempts > 0 {
            ui.label_subdued(format!(
                "{}/{} {}",
                conn.reconnect_attempts, max_attempts, UI_TEXT.conn_attempts
            ));
        }
        if let Some(err) = &conn.last_error {
            ui.label_subdued(err.as_str());
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.button(&UI_TEXT.trading_stop).clicked() {
                action = Some(PanelAction::StopTrading);
            }
            if ui.button(&UI_TEXT.trading_start).clicked() {
                action = Some(PanelAction::StartTrading);
            }
            ui.separator();
            if conn.state.is_down() {
                if ui.button(&UI_TEXT.conn_connect).clicked() {
                    action = Some(PanelAction::Connect);
                }
            } else {
                if ui.button(&UI_TEXT.conn_disconnect).clicked() {
                    action = Some(PanelAction::Disconnect);
                }
                if ui.button(&UI_TEXT.conn_reconnect).clicked() {
                    action = Some(PanelAction::Reconnect);
                }
            }
        });
    });

    if conn.state.is_down() && conn.scheduled_reconnects > 0 {
        ui.label(RichText::new(&UI_TEXT.conn_disconnected_banner).color(UI_CONFIG.colors.error));
    }
    action
}

pub(crate) fn render_stats_panel(ui: &mut Ui, live: &LiveState) {
    ui.heading(&UI_TEXT.stats_heading);
    ui.separator();
    ScrollArea::vertical()
        .id_salt("stats_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (title, slice) in [
                (&UI_TEXT.stats_system, &live.system_stats),
                (&UI_TEXT.stats_trading, &live.trading_stats),
                (&UI_TEXT.stats_broker, &live.broker_status),
                (&UI_TEXT.stats_database, &live.database_status),
                (&UI_TEXT.stats_performance, &live.performance),
                (&UI_TEXT.stats_risk, &live.risk_metrics),
            ] {
                ui.label_subheader(title.as_str());
                match slice {
                    Some(Value::Object(map)) => {
                        for (key, value) in map {
                            ui.metric(key, &compact_value(value), UI_CONFIG.colors.label);
                        }
                    }
                    Some(other) => ui.label_subdued(compact_value(other)),
                    None => ui.label_subdued(UI_TEXT.stats_waiting.as_str()),
                }
                ui.add_space(6.0);
            }
        });
}

/// One-line rendering of a stats value.
fn compact_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() != 0.0 => format!("{:.2}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{:.*}", decimals, x))
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn render_positions(ui: &mut Ui, positions: &[Position], total_profit: f64) {
    ui.horizontal(|ui| {
        ui.label_subheader(UI_TEXT.positions_heading.as_str());
        ui.metric(
            &UI_TEXT.positions_total,
            &format!("{:.2}", total_profit),
            get_outcome_color(total_profit),
        );
    });
    if positions.is_empty() {
        ui.label_subdued(UI_TEXT.positions_empty.as_str());
        return;
    }

    Grid::new("positions_grid")
        .striped(true)
        .num_columns(UI_TEXT.positions_headers.len())
        .show(ui, |ui| {
            for header in UI_TEXT.positions_headers {
                ui.label(RichText::new(*header).strong());
            }
            ui.end_row();

            for p in positions {
                ui.label(p.ticket.as_ref().map(compact_value).unwrap_or_default());
                ui.label(&p.symbol);
                ui.label(p.side.as_deref().unwrap_or("-"));
                ui.label(fmt_opt(p.volume, 2));
                ui.label(fmt_opt(p.price_open, 5));
                ui.label(fmt_opt(p.price_current, 5));
                ui.label(fmt_opt(p.sl, 5));
                ui.label(fmt_opt(p.tp, 5));
                let profit = p.profit.unwrap_or(0.0);
                ui.label(RichText::new(format!("{:.2}", profit)).color(get_outcome_color(profit)));
                ui.end_row();
            }
        });
}

pub(crate) fn render_alerts(
    ui: &mut Ui,
    alerts: &[Alert],
    unacknowledged: usize,
) -> Option<PanelAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        ui.label_subheader(format!("{} ({})", UI_TEXT.alerts_heading, unacknowledged));
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let label = ui.button_text_secondary(UI_TEXT.alerts_clear.as_str());
            let clear = Button::new(label);
            if ui.add_enabled(!alerts.is_empty(), clear).clicked() {
                action = Some(PanelAction::ClearAlerts);
            }
        });
    });

    if alerts.is_empty() {
        ui.label_subdued(UI_TEXT.alerts_empty.as_str());
        return action;
    }

    ScrollArea::vertical()
        .id_salt("alerts_scroll")
        .max_height(220.0)
        .show(ui, |ui| {
            for alert in alerts {
                ui.horizontal(|ui| {
                    let color = if alert.acknowledged {
                        UI_CONFIG.colors.subdued
                    } else {
                        alert.level.color()
                    };
                    ui.label(RichText::new(alert.level.to_string()).small().color(color));
                    let when = alert
                        .timestamp_utc()
                        .map(|ts| format_timestamp(&ts))
                        .unwrap_or_else(|| alert.timestamp.clone());
                    ui.label_subdued(when);
                    ui.label(RichText::new(&alert.message).color(color));
                    if let Some(by) = &alert.acknowledged_by {
                        ui.label_subdued(format!("ack: {}", by));
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.small_button(&UI_TEXT.alerts_dismiss).clicked() {
                            action = Some(PanelAction::DismissAlert(alert.id.clone()));
                        }
                        if !alert.acknowledged && ui.small_button(&UI_TEXT.alerts_ack).clicked() {
                            action = Some(PanelAction::AcknowledgeAlert(alert.id.clone()));
                        }
                    });
                });
            }
        });
    action
}

pub(crate) fn render_logs(
    ui: &mut Ui,
    logs: &[LogEntry],
    log_type: &mut String,
    search: &mut String,
) -> Option<PanelAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        ui.label_subheader(UI_TEXT.logs_heading.as_str());
        ui.add(TextEdit::singleline(log_type).desired_width(80.0));
        if ui.button(&UI_TEXT.logs_request).clicked() {
            action = Some(PanelAction::RequestLogs);
        }
        ui.separator();
        let resp = ui.add(TextEdit::singleline(search).desired_width(160.0));
        let submitted = resp.lost_focus() && ui.input(|i| i.key_pressed(eframe::egui::Key::Enter));
        if (ui.button(&UI_TEXT.logs_search).clicked() || submitted) && !search.trim().is_empty() {
            action = Some(PanelAction::SearchLogs);
        }
    });

    if logs.is_empty() {
        ui.label_subdued(UI_TEXT.logs_empty.as_str());
        return action;
    }

    ScrollArea::vertical()
        .id_salt("logs_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for entry in logs {
                let line = if entry.parsed {
                    format!("{} [{}] {}", entry.timestamp, entry.level, entry.message)
                } else {
                    entry.raw_line.clone()
                };
                ui.label(
                    RichText::new(line)
                        .monospace()
                        .small()
                        .color(log_level_color(&entry.level)),
                );
            }
        });
    action
}

pub(crate) fn render_backtest_panel(
    ui: &mut Ui,
    form: &mut SweepForm,
    form_error: Option<&str>,
    tracker: &TrackerSnapshot,
    submitting: bool,
    results: Option<&Result<Value, String>>,
) -> Option<PanelAction> {
    let mut action = None;
    ui.heading(&UI_TEXT.bt_heading);
    ui.separator();

    let editable = !submitting && !tracker.phase.is_active();
    ui.add_enabled_ui(editable, |ui| {
        Grid::new("sweep_form").num_columns(2).show(ui, |ui| {
            ui.label(&UI_TEXT.bt_symbols);
            ui.text_edit_singleline(&mut form.symbols);
            ui.end_row();
            ui.label(&UI_TEXT.bt_timeframes);
            ui.text_edit_singleline(&mut form.timeframes);
            ui.end_row();
            ui.label(&UI_TEXT.bt_start);
            ui.text_edit_singleline(&mut form.start_date);
            ui.end_row();
            ui.label(&UI_TEXT.bt_end);
            ui.text_edit_singleline(&mut form.end_date);
            ui.end_row();
            ui.label(&UI_TEXT.bt_balance);
            ui.add(eframe::egui::DragValue::new(&mut form.initial_balance).speed(100.0));
            ui.end_row();
        });
    });
    if let Some(err) = form_error {
        ui.label(RichText::new(err).small().color(UI_CONFIG.colors.error));
    }

    ui.horizontal(|ui| {
        if submitting {
            ui.spinner();
            ui.label_subdued(UI_TEXT.bt_submitting.as_str());
        } else if tracker.phase.is_active() {
            if ui.button(&UI_TEXT.bt_stop).clicked() {
                action = Some(PanelAction::StopTracking);
            }
        } else {
            let label = ui.button_text_primary(UI_TEXT.bt_run.as_str());
            if ui.button(label).clicked() {
                action = Some(PanelAction::RunSweep);
            }
        }
    });

    ui.add_space(8.0);
    if tracker.phase != TrackerPhase::Idle {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(tracker.phase.to_string())
                    .strong()
                    .color(tracker.phase.color()),
            );
            if let Some(id) = &tracker.test_id {
                ui.label_subdued(id.as_str());
            }
        });
    }

    if let Some(p) = &tracker.progress {
        ui.add(
            ProgressBar::new(p.fraction())
                .show_percentage()
                .animate(tracker.phase.is_active()),
        );
        ui.label_subdued(format!(
            "{}/{} {}",
            p.completed_configurations, p.total_configurations, UI_TEXT.bt_configs
        ));
        if let (Some(sym), Some(tf)) = (&p.current_symbol, &p.current_timeframe) {
            ui.metric("now", &format!("{} {}", sym, tf), Color32::WHITE);
        }
        if !p.current_step.is_empty() {
            ui.label_subdued(p.current_step.as_str());
        }
        ui.metric(
            &UI_TEXT.bt_eta,
            &format_eta(p.estimated_time_remaining),
            UI_CONFIG.colors.label,
        );
    }

    if let Some(err) = &tracker.last_error {
        ui.label(RichText::new(err.to_string()).color(UI_CONFIG.colors.error));
    }

    if tracker.phase == TrackerPhase::Completed {
        if let Some(id) = &tracker.test_id {
            if ui.button(&UI_TEXT.bt_fetch_results).clicked() {
                action = Some(PanelAction::FetchResults(id.clone()));
            }
        }
    }

    match results {
        Some(Ok(value)) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
            ScrollArea::vertical()
                .id_salt("results_scroll")
                .max_height(300.0)
                .show(ui, |ui| {
                    ui.label(RichText::new(pretty).monospace().small());
                });
        }
        Some(Err(err)) => {
            ui.label(RichText::new(err).small().color(UI_CONFIG.colors.error));
        }
        None => {}
    }
    action
}
