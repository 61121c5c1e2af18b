use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use anyhow::{Context as _, Result};
use eframe::{
    Frame, Storage,
    egui::{CentralPanel, Context, RichText, SidePanel, TopBottomPanel},
};
use poll_promise::Promise;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use crate::{
    Cli,
    app::{AppEvent, UiPrefs},
    config::Settings,
    data::{BacktestApi, PushChannelClient, WsTransport},
    engine::{JobLauncher, JobProgressTracker, SessionCallbacks},
    ui::{
        PanelAction, UI_CONFIG, render_alerts, render_backtest_panel, render_connection_bar,
        render_logs, render_positions, render_stats_panel, setup_custom_visuals,
    },
};

#[cfg(debug_assertions)]
use crate::config::DF;

type Fetch = Promise<Result<Value, String>>;

pub struct DashboardApp {
    prefs: UiPrefs,
    settings: Settings,
    /// Hosts the channel driver, the tracker timer and one-off requests.
    runtime: Runtime,
    client: PushChannelClient,
    tracker: Arc<JobProgressTracker>,
    launcher: Arc<JobLauncher>,
    api: BacktestApi,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    submitting: bool,
    form_error: Option<String>,
    notice: Option<(String, bool)>,
    results: Option<Fetch>,
    trading: Option<Fetch>,
    log_search: String,
}

impl DashboardApp {
    pub(crate) fn new(cc: &eframe::CreationContext<'_>, args: Cli) -> Result<Self> {
        let prefs: UiPrefs = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        let settings = Settings::from_cli(&args);
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("trade-deck-io")
            .build()
            .context("Failed to create runtime")?;

        let api = BacktestApi::new(settings.api_base_url.clone())?;
        let transport = Arc::new(WsTransport::new(settings.channel.connect_timeout));
        let client = PushChannelClient::new(settings.channel.clone(), transport, runtime.handle());
        client.connect();

        let tracker = Arc::new(JobProgressTracker::new(
            Arc::new(api.clone()),
            settings.poll,
            runtime.handle().clone(),
        ));
        let launcher = Arc::new(JobLauncher::new(Arc::new(api.clone())));
        let (events_tx, events_rx) = mpsc::channel();

        log::info!(
            "Dashboard up: channel {} / api {}",
            settings.channel.url,
            settings.api_base_url
        );

        Ok(Self {
            prefs,
            settings,
            runtime,
            client,
            tracker,
            launcher,
            api,
            events_tx,
            events_rx,
            submitting: false,
            form_error: None,
            notice: None,
            results: None,
            trading: None,
            log_search: String::new(),
        })
    }

    fn handle_action(&mut self, action: PanelAction, ctx: &Context) {
        #[cfg(debug_assertions)]
        if DF.log_commands {
            log::info!("[ui] {:?}", action);
        }

        match action {
            PanelAction::Connect => self.client.connect(),
            PanelAction::Reconnect => self.client.reconnect(),
            PanelAction::Disconnect => self.client.disconnect(),
            PanelAction::AcknowledgeAlert(id) => self.expect_sent(self.client.acknowledge_alert(&id)),
            PanelAction::DismissAlert(id) => self.expect_sent(self.client.dismiss_alert(&id)),
            PanelAction::ClearAlerts => self.expect_sent(self.client.clear_alerts()),
            PanelAction::RequestLogs => {
                let sent = self
                    .client
                    .request_logs(&self.prefs.log_type, UI_CONFIG.log_lines_per_request);
                self.expect_sent(sent)
            }
            PanelAction::SearchLogs => {
                let log_type = Some(self.prefs.log_type.as_str()).filter(|t| !t.is_empty());
                let sent = self.client.search_logs(self.log_search.trim(), log_type);
                self.expect_sent(sent)
            }
            PanelAction::StartTrading => self.toggle_trading(true, ctx),
            PanelAction::StopTrading => self.toggle_trading(false, ctx),
            PanelAction::RunSweep => self.run_sweep(ctx),
            PanelAction::StopTracking => self.tracker.stop_session(),
            PanelAction::FetchResults(id) => self.fetch_results(id, ctx),
        }
    }

    fn expect_sent(&mut self, sent: bool) {
        if !sent {
            self.notice = Some(("Not connected; command not sent".to_string(), true));
        }
    }

    fn run_sweep(&mut self, ctx: &Context) {
        let request = match self.prefs.form.to_request() {
            Ok(request) => request,
            Err(e) => {
                self.form_error = Some(e.to_string());
                return;
            }
        };
        self.form_error = None;
        self.results = None;
        self.submitting = true;

        let done_tx = self.events_tx.clone();
        let err_tx = self.events_tx.clone();
        let done_ctx = ctx.clone();
        let err_ctx = ctx.clone();
        let callbacks = SessionCallbacks::new(
            move |state| {
                let _ = done_tx.send(AppEvent::SessionFinished(Ok(state)));
                done_ctx.request_repaint();
            },
            move |error| {
                let _ = err_tx.send(AppEvent::SessionFinished(Err(error)));
                err_ctx.request_repaint();
            },
        );

        let launcher = self.launcher.clone();
        let tracker = self.tracker.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = launcher.launch(&tracker, &request, callbacks).await;
            let _ = tx.send(AppEvent::Launched(result));
            ctx.request_repaint();
        });
    }

    fn fetch_results(&mut self, test_id: String, ctx: &Context) {
        let (sender, promise) = Promise::new();
        let api = self.api.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = api.fetch_results(&test_id).await;
            sender.send(result.map_err(|e| format!("{:#}", e)));
            ctx.request_repaint();
        });
        self.results = Some(promise);
    }

    fn toggle_trading(&mut self, start: bool, ctx: &Context) {
        if self.trading.is_some() {
            return;
        }
        let (sender, promise) = Promise::new();
        let api = self.api.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = if start {
                api.start_trading().await
            } else {
                api.stop_trading().await
            };
            sender.send(result.map_err(|e| format!("{:#}", e)));
            ctx.request_repaint();
        });
        self.trading = Some(promise);
    }

    fn drain_events(&mut self, ctx: &Context) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Launched(Ok(receipt)) => {
                    self.submitting = false;
                    self.notice = Some((
                        format!(
                            "Sweep {} started ({} configurations)",
                            receipt.test_id, receipt.total_configurations
                        ),
                        false,
                    ));
                }
                AppEvent::Launched(Err(e)) => {
                    self.submitting = false;
                    self.notice = Some((e.to_string(), true));
                }
                AppEvent::SessionFinished(Ok(state)) => {
                    self.notice = Some((format!("Sweep {} completed", state.test_id), false));
                    self.fetch_results(state.test_id, ctx);
                }
                AppEvent::SessionFinished(Err(e)) => {
                    self.notice = Some((e.to_string(), true));
                }
            }
        }

        if let Some(promise) = self.trading.take() {
            match promise.try_take() {
                Ok(Ok(reply)) => {
                    let message = reply
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("Trading request accepted")
                        .to_string();
                    self.notice = Some((message, false));
                }
                Ok(Err(e)) => self.notice = Some((e, true)),
                Err(pending) => self.trading = Some(pending),
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        setup_custom_visuals(ctx);
        self.drain_events(ctx);

        let conn = self.client.connection();
        let live = self.client.snapshot();
        let tracker = self.tracker.snapshot();
        let mut actions = Vec::new();

        TopBottomPanel::top("connection_bar")
            .frame(UI_CONFIG.top_panel_frame())
            .show(ctx, |ui| {
                actions.extend(render_connection_bar(
                    ui,
                    &conn,
                    self.settings.channel.reconnect.max_attempts,
                ));
            });

        TopBottomPanel::bottom("status_bar")
            .frame(UI_CONFIG.bottom_panel_frame())
            .show(ctx, |ui| match &self.notice {
                Some((text, true)) => {
                    ui.label(RichText::new(text).small().color(UI_CONFIG.colors.error));
                }
                Some((text, false)) => {
                    ui.label(RichText::new(text).small());
                }
                None => {
                    ui.label(RichText::new(" ").small());
                }
            });

        SidePanel::left("stats_panel")
            .frame(UI_CONFIG.side_panel_frame())
            .default_width(240.0)
            .show(ctx, |ui| render_stats_panel(ui, &live));

        SidePanel::right("backtest_panel")
            .frame(UI_CONFIG.side_panel_frame())
            .default_width(340.0)
            .show(ctx, |ui| {
                let results = self.results.as_ref().and_then(|p| p.ready());
                actions.extend(render_backtest_panel(
                    ui,
                    &mut self.prefs.form,
                    self.form_error.as_deref(),
                    &tracker,
                    self.submitting,
                    results,
                ));
            });

        CentralPanel::default()
            .frame(UI_CONFIG.central_panel_frame())
            .show(ctx, |ui| {
                render_positions(ui, &live.positions, live.total_profit());
                ui.separator();
                let alerts = live.alerts.to_vec();
                actions.extend(render_alerts(ui, &alerts, live.alerts.unacknowledged()));
                ui.separator();
                let logs = live.logs.to_vec();
                actions.extend(render_logs(
                    ui,
                    &logs,
                    &mut self.prefs.log_type,
                    &mut self.log_search,
                ));
            });

        for action in actions {
            self.handle_action(action, ctx);
        }

        // Background state has no repaint hook of its own.
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    fn save(&mut self, storage: &mut dyn Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.prefs);
    }
}
