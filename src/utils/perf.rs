use std::time::{Duration, Instant};

use crate::config::DF;

/// Warns on drop when the enclosing scope ran past `budget`.
/// Inert unless `DF.log_performance` is on.
pub struct SlowScope {
    label: &'static str,
    budget: Duration,
    started: Option<Instant>,
}

impl SlowScope {
    pub fn start(label: &'static str, budget: Duration) -> Self {
        Self {
            label,
            budget,
            started: DF.log_performance.then(Instant::now),
        }
    }
}

impl Drop for SlowScope {
    fn drop(&mut self) {
        if let Some(started) = self.started {
            report_slow(self.label, started.elapsed(), self.budget);
        }
    }
}

fn report_slow(label: &str, elapsed: Duration, budget: Duration) -> bool {
    if elapsed <= budget {
        return false;
    }
    let build = if cfg!(debug_assertions) { "debug" } else { "release" };
    log::warn!(
        "Slow {} ({} build): {:.3}ms against a {:.3}ms budget",
        label,
        build,
        elapsed.as_secs_f64() * 1000.0,
        budget.as_secs_f64() * 1000.0
    );
    true
}
