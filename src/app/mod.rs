mod root;
mod state;

pub(crate) use state::{AppEvent, UiPrefs};
pub use state::{FormError, SweepForm};

pub use root::DashboardApp;
