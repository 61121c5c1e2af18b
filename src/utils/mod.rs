mod perf;
mod time_utils;

pub use perf::SlowScope;
pub use time_utils::{format_duration, format_eta, format_timestamp};
