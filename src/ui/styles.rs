use eframe::egui::{Color32, Context, RichText, Ui, Visuals};

use crate::engine::{ConnectionState, TrackerPhase};
use crate::models::AlertLevel;
use crate::ui::UI_CONFIG;

pub(crate) fn colored_subsection_heading(text: impl Into<String>) -> RichText {
    RichText::new(text.into()).color(UI_CONFIG.colors.subsection_heading)
}

pub trait LevelColor {
    fn color(&self) -> Color32;
}

impl LevelColor for AlertLevel {
    fn color(&self) -> Color32 {
        match self {
            Self::Info => UI_CONFIG.colors.info,
            Self::Warning => UI_CONFIG.colors.warning,
            Self::Error => UI_CONFIG.colors.error,
            Self::Critical => UI_CONFIG.colors.critical,
        }
    }
}

impl LevelColor for ConnectionState {
    fn color(&self) -> Color32 {
        match self {
            Self::Open => UI_CONFIG.colors.profit,
            Self::Connecting | Self::Reconnecting => UI_CONFIG.colors.warning,
            Self::Failed => UI_CONFIG.colors.error,
            Self::Idle | Self::Closed => UI_CONFIG.colors.subdued,
        }
    }
}

impl LevelColor for TrackerPhase {
    fn color(&self) -> Color32 {
        match self {
            Self::Completed => UI_CONFIG.colors.profit,
            Self::Errored | Self::TimedOut => UI_CONFIG.colors.error,
            Self::Polling | Self::Finalizing => UI_CONFIG.colors.info,
            Self::Idle | Self::Cancelled => UI_CONFIG.colors.subdued,
        }
    }
}

/// Log line colour from the server's free-form level string.
pub fn log_level_color(level: &str) -> Color32 {
    match level.to_ascii_uppercase().as_str() {
        "CRITICAL" => UI_CONFIG.colors.critical,
        "ERROR" => UI_CONFIG.colors.error,
        "WARNING" | "WARN" => UI_CONFIG.colors.warning,
        "DEBUG" => UI_CONFIG.colors.subdued,
        _ => UI_CONFIG.colors.label,
    }
}

pub fn get_outcome_color(value: f64) -> Color32 {
    if value >= 0.0 {
        UI_CONFIG.colors.profit
    } else {
        UI_CONFIG.colors.loss
    }
}

pub(crate) trait UiStyleExt {
    fn label_subdued(&mut self, text: impl Into<String>);
    fn metric(&mut self, label: &str, value: &str, color: Color32);
    fn label_subheader(&mut self, text: impl Into<String>);
    fn button_text_primary(&self, text: impl Into<String>) -> RichText;
    fn button_text_secondary(&self, text: impl Into<String>) -> RichText;
}

impl UiStyleExt for Ui {
    fn label_subdued(&mut self, text: impl Into<String>) {
        self.label(RichText::new(text).small().color(Color32::GRAY));
    }

    fn metric(&mut self, label: &str, value: &str, color: Color32) {
        self.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 2.0; // Tight spacing
            ui.label_subdued(format!("{}:", label));
            ui.label(RichText::new(value).small().color(color));
        });
    }

    fn label_subheader(&mut self, text: impl Into<String>) {
        self.label(colored_subsection_heading(text));
    }

    fn button_text_primary(&self, text: impl Into<String>) -> RichText {
        RichText::new(text).strong().color(Color32::GREEN).small()
    }

    fn button_text_secondary(&self, text: impl Into<String>) -> RichText {
        RichText::new(text).strong().color(Color32::WHITE).small()
    }
}

pub fn setup_custom_visuals(ctx: &Context) {
    let mut visuals = Visuals::dark();
    visuals.window_fill = UI_CONFIG.colors.central_panel;
    visuals.panel_fill = UI_CONFIG.colors.side_panel;
    visuals.widgets.noninteractive.fg_stroke.color = UI_CONFIG.colors.label;
    visuals.widgets.inactive.fg_stroke.color = UI_CONFIG.colors.label;
    visuals.widgets.hovered.fg_stroke.color = UI_CONFIG.colors.heading;
    visuals.widgets.active.fg_stroke.color = UI_CONFIG.colors.heading;
    ctx.set_visuals(visuals);
    ctx.style_mut(|s| s.interaction.selectable_labels = false);
}
