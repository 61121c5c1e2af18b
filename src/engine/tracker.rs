//! Job Progress Tracker: drives one `PollSession` at a time.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use strum_macros::Display;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep};

use crate::config::PollPolicy;
use crate::data::JobStatusSource;
use crate::engine::session::{JobOutcome, PollSession, TickVerdict, TrackerError};
use crate::models::ProgressState;

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    #[default]
    Idle,
    Polling,
    /// Job is done server-side; waiting out the minimum display time.
    Finalizing,
    Completed,
    Errored,
    TimedOut,
    /// `stop_session` ended a live session.
    Cancelled,
}

impl TrackerPhase {
    pub fn is_active(self) -> bool {
        matches!(self, TrackerPhase::Polling | TrackerPhase::Finalizing)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSnapshot {
    pub phase: TrackerPhase,
    pub test_id: Option<String>,
    pub progress: Option<ProgressState>,
    pub last_error: Option<TrackerError>,
}

type CompleteFn = Box<dyn FnOnce(ProgressState) + Send>;
type ErrorFn = Box<dyn FnOnce(TrackerError) + Send>;

/// The pair of handlers for one session. At most one of them runs.
///
/// They run on the tracker's task while its state is locked, so they must
/// hand the outcome off (a channel, a repaint request) rather than call back
/// into the tracker.
pub struct SessionCallbacks {
    on_complete: CompleteFn,
    on_error: ErrorFn,
}

impl SessionCallbacks {
    pub fn new(
        on_complete: impl FnOnce(ProgressState) + Send + 'static,
        on_error: impl FnOnce(TrackerError) + Send + 'static,
    ) -> Self {
        Self {
            on_complete: Box::new(on_complete),
            on_error: Box::new(on_error),
        }
    }

    /// Callbacks that forward the outcome into a oneshot channel.
    pub fn oneshot() -> (Self, oneshot::Receiver<SessionResult>) {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let tx_err = tx.clone();
        let callbacks = Self::new(
            move |state| deliver(&tx, Ok(state)),
            move |error| deliver(&tx_err, Err(error)),
        );
        (callbacks, rx)
    }
}

pub type SessionResult = Result<ProgressState, TrackerError>;

fn deliver(slot: &Mutex<Option<oneshot::Sender<SessionResult>>>, outcome: SessionResult) {
    let sender = slot.lock().unwrap_or_else(|p| p.into_inner()).take();
    if let Some(sender) = sender {
        // Receiver may already be gone.
        let _ = sender.send(outcome);
    }
}

struct TrackerShared {
    /// Bumped on every start/stop; a task only writes while it still matches.
    generation: u64,
    phase: TrackerPhase,
    test_id: Option<String>,
    progress: Option<ProgressState>,
    last_error: Option<TrackerError>,
    task: Option<JoinHandle<()>>,
}

pub struct JobProgressTracker {
    source: Arc<dyn JobStatusSource>,
    policy: PollPolicy,
    runtime: Handle,
    shared: Arc<Mutex<TrackerShared>>,
}

impl JobProgressTracker {
    pub fn new(source: Arc<dyn JobStatusSource>, policy: PollPolicy, runtime: Handle) -> Self {
        Self {
            source,
            policy,
            runtime,
            shared: Arc::new(Mutex::new(TrackerShared {
                generation: 0,
                phase: TrackerPhase::Idle,
                test_id: None,
                progress: None,
                last_error: None,
                task: None,
            })),
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Replace whatever session is live with a new one for `test_id`.
    /// The first status request goes out immediately.
    pub fn start_session(&self, test_id: impl Into<String>, callbacks: SessionCallbacks) {
        let test_id = test_id.into();
        let started_at = Instant::now();
        let mut shared = lock(&self.shared);

        // Old timer dies before the new session exists.
        if let Some(old) = shared.task.take() {
            old.abort();
            if let Some(old_id) = shared.test_id.as_deref() {
                log::info!("Job {} superseded by {}", old_id, test_id);
            }
        }
        shared.generation += 1;
        shared.phase = TrackerPhase::Polling;
        shared.test_id = Some(test_id.clone());
        shared.progress = None;
        shared.last_error = None;

        let task = SessionTask {
            generation: shared.generation,
            session: PollSession::new(test_id.clone(), started_at, self.policy),
            source: self.source.clone(),
            shared: self.shared.clone(),
            callbacks,
        };
        shared.task = Some(self.runtime.spawn(task.run()));
        log::info!("Tracking job {}", test_id);
    }

    /// Cancel the live session, if any. Its callbacks never run.
    pub fn stop_session(&self) {
        let mut shared = lock(&self.shared);
        if let Some(task) = shared.task.take() {
            task.abort();
        }
        shared.generation += 1;
        if shared.phase.is_active() {
            shared.phase = TrackerPhase::Cancelled;
            if let Some(id) = shared.test_id.as_deref() {
                log::info!("Stopped tracking job {}", id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared).phase.is_active()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let shared = lock(&self.shared);
        TrackerSnapshot {
            phase: shared.phase,
            test_id: shared.test_id.clone(),
            progress: shared.progress.clone(),
            last_error: shared.last_error.clone(),
        }
    }
}

impl Drop for JobProgressTracker {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.shared).task.take() {
            task.abort();
        }
    }
}

fn lock(shared: &Mutex<TrackerShared>) -> MutexGuard<'_, TrackerShared> {
    shared.lock().unwrap_or_else(|p| p.into_inner())
}

enum Ending {
    Completed(ProgressState),
    Failed(TrackerError, TrackerPhase),
}

struct SessionTask {
    generation: u64,
    session: PollSession,
    source: Arc<dyn JobStatusSource>,
    shared: Arc<Mutex<TrackerShared>>,
    callbacks: SessionCallbacks,
}

impl SessionTask {
    async fn run(mut self) {
        let mut ticker = interval(self.session.policy().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ending = loop {
            ticker.tick().await;

            if let Some(error) = self.session.check_deadline(Instant::now()) {
                break Ending::Failed(error, TrackerPhase::TimedOut);
            }

            let result = self.source.fetch_status(self.session.test_id()).await;
            let verdict = self.session.on_status(result, Instant::now());

            #[cfg(debug_assertions)]
            if DF.log_poll_ticks {
                log::info!("[poll] {} -> {:?}", self.session.test_id(), verdict);
            }

            match verdict {
                TickVerdict::Progress(state) => {
                    if !self.write(|s| s.progress = Some(state)) {
                        return;
                    }
                }
                TickVerdict::Retry { attempt, error } => {
                    log::warn!(
                        "Job {} status attempt failed ({}/{}): {}",
                        self.session.test_id(),
                        attempt,
                        self.session.policy().max_retries,
                        error
                    );
                }
                TickVerdict::Finalize { outcome, after } => {
                    // Hold the final snapshot on screen for the rest of the display time.
                    let snapshot = outcome.snapshot().clone();
                    if !self.write(|s| {
                        s.phase = TrackerPhase::Finalizing;
                        s.progress = Some(snapshot);
                    }) {
                        return;
                    }
                    if !after.is_zero() {
                        sleep(after).await;
                    }
                    break self.ending_for(outcome);
                }
                TickVerdict::Abort(error) => break Ending::Failed(error, TrackerPhase::Errored),
            }
        };
        self.finish(ending);
    }

    fn ending_for(&self, outcome: JobOutcome) -> Ending {
        match outcome {
            JobOutcome::Completed(state) => Ending::Completed(state),
            JobOutcome::Failed(state) => Ending::Failed(
                TrackerError::JobFailed {
                    test_id: self.session.test_id().to_string(),
                    reason: state.failure_reason(),
                },
                TrackerPhase::Errored,
            ),
        }
    }

    fn write(&self, f: impl FnOnce(&mut TrackerShared)) -> bool {
        let mut shared = lock(&self.shared);
        if shared.generation != self.generation {
            return false;
        }
        f(&mut shared);
        true
    }

    /// Publishes the ending and runs the matching callback, both under the
    /// state lock so a concurrent start/stop either wins outright or waits.
    fn finish(self, ending: Ending) {
        let mut shared = lock(&self.shared);
        if shared.generation != self.generation {
            return;
        }
        // Finished on its own; nothing left to abort.
        shared.task = None;
        match ending {
            Ending::Completed(state) => {
                shared.phase = TrackerPhase::Completed;
                shared.progress = Some(state.clone());
                log::info!("Job {} completed", state.test_id);
                (self.callbacks.on_complete)(state);
            }
            Ending::Failed(error, phase) => {
                shared.phase = phase;
                shared.last_error = Some(error.clone());
                log::error!("{}", error);
                (self.callbacks.on_error)(error);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TRACKER;
    use crate::data::StatusError;
    use crate::models::JobStatus;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};

    type Reply = Result<ProgressState, StatusError>;

    /// Replays a per-job script; the last reply repeats forever.
    #[derive(Default)]
    pub(crate) struct ScriptedStatus {
        scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
        pub calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedStatus {
        pub fn script(self: &Arc<Self>, test_id: &str, replies: Vec<Reply>) -> Arc<Self> {
            self.scripts
                .lock()
                .unwrap()
                .insert(test_id.to_string(), replies.into());
            self.clone()
        }

        pub fn calls_for(&self, test_id: &str) -> Vec<Instant> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == test_id)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    #[async_trait]
    impl JobStatusSource for ScriptedStatus {
        async fn fetch_status(&self, test_id: &str) -> Result<ProgressState, StatusError> {
            self.calls
                .lock()
                .unwrap()
                .push((test_id.to_string(), Instant::now()));
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts
                .get_mut(test_id)
                .ok_or(StatusError::NotFound)?;
            if queue.len() > 1 {
                queue.pop_front().unwrap_or(Err(StatusError::NotFound))
            } else {
                queue.front().cloned().unwrap_or(Err(StatusError::NotFound))
            }
        }
    }

    fn running(id: &str, pct: f64) -> Reply {
        Ok(ProgressState::running(id, pct))
    }

    fn completed(id: &str) -> Reply {
        Ok(ProgressState::running(id, 100.0).with_status(JobStatus::Completed))
    }

    fn tracker(source: Arc<ScriptedStatus>) -> JobProgressTracker {
        JobProgressTracker::new(source, TRACKER, Handle::current())
    }

    #[tokio::test(start_paused = true)]
    async fn instant_completion_still_waits_min_display_time() {
        let source = Arc::new(ScriptedStatus::default()).script("abc", vec![completed("abc")]);
        let tracker = tracker(source.clone());
        let t0 = Instant::now();
        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("abc", callbacks);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Finalizing);

        let state = rx.await.unwrap().unwrap();
        assert!(t0.elapsed() >= Duration::from_secs(5));
        assert_eq!(state.progress_percent, 100.0);
        assert_eq!(source.calls_for("abc").len(), 1);
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_job_completes_without_extra_delay() {
        let mut script = vec![running("j", 10.0); 7];
        script.push(completed("j"));
        let source = Arc::new(ScriptedStatus::default()).script("j", script);
        let tracker = tracker(source);
        let t0 = Instant::now();
        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("j", callbacks);

        rx.await.unwrap().unwrap();
        // Completed on the tick at 7s, already past the display floor.
        assert_eq!(t0.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_decides_outcome() {
        for k in 0..=5usize {
            let mut script = vec![Err(StatusError::NotFound); k];
            script.push(completed("r"));
            let source = Arc::new(ScriptedStatus::default()).script("r", script);
            let tracker = tracker(source);
            let (callbacks, rx) = SessionCallbacks::oneshot();
            tracker.start_session("r", callbacks);

            match rx.await.unwrap() {
                Ok(_) => assert!(k <= 3, "k = {}", k),
                Err(TrackerError::RetriesExhausted { attempts, .. }) => {
                    assert!(k > 3, "k = {}", k);
                    assert_eq!(attempts, 4);
                    assert_eq!(tracker.snapshot().phase, TrackerPhase::Errored);
                }
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_not_retried() {
        let source = Arc::new(ScriptedStatus::default()).script(
            "x",
            vec![Err(StatusError::Http {
                status: 500,
                message: "db down".into(),
            })],
        );
        let tracker = tracker(source.clone());
        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("x", callbacks);

        assert!(matches!(
            rx.await.unwrap(),
            Err(TrackerError::Status { .. })
        ));
        assert_eq!(source.calls_for("x").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn job_reported_error_uses_its_reason() {
        let mut failed = ProgressState::running("e", 30.0).with_status(JobStatus::Error);
        failed.error_message = Some("no data for XAUUSD".into());
        let source = Arc::new(ScriptedStatus::default()).script("e", vec![Ok(failed)]);
        let tracker = tracker(source);
        let t0 = Instant::now();
        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("e", callbacks);

        match rx.await.unwrap() {
            Err(TrackerError::JobFailed { reason, .. }) => {
                assert_eq!(reason, "no data for XAUUSD")
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(t0.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn never_finishing_job_times_out() {
        let source = Arc::new(ScriptedStatus::default()).script("slow", vec![running("slow", 1.0)]);
        let tracker = tracker(source);
        let t0 = Instant::now();
        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("slow", callbacks);

        match rx.await.unwrap() {
            Err(TrackerError::TimedOut { elapsed, .. }) => {
                assert!(elapsed > Duration::from_secs(120))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(t0.elapsed() <= Duration::from_secs(122));
        assert_eq!(tracker.snapshot().phase, TrackerPhase::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_supersedes_old_one() {
        let source = Arc::new(ScriptedStatus::default())
            .script("a", vec![running("a", 20.0)])
            .script("b", vec![running("b", 60.0)]);
        let tracker = tracker(source.clone());
        let (cb_a, mut rx_a) = SessionCallbacks::oneshot();
        tracker.start_session("a", cb_a);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let (cb_b, _rx_b) = SessionCallbacks::oneshot();
        let switched = Instant::now();
        tracker.start_session("b", cb_b);
        tokio::time::sleep(Duration::from_millis(4200)).await;

        assert!(source.calls_for("a").iter().all(|at| *at < switched));
        assert_eq!(source.calls_for("b").len(), 5);
        let snap = tracker.snapshot();
        assert_eq!(snap.test_id.as_deref(), Some("b"));
        assert_eq!(snap.progress.map(|p| p.test_id), Some("b".to_string()));
        // A's callbacks were dropped with its task.
        assert!(rx_a.try_recv().is_err());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn session_task_can_move_across_worker_threads() {
        let source = Arc::new(ScriptedStatus::default());
        let (callbacks, _rx) = SessionCallbacks::oneshot();
        let task = SessionTask {
            generation: 1,
            session: PollSession::new("m", Instant::now(), TRACKER),
            source,
            shared: Arc::new(Mutex::new(TrackerShared {
                generation: 1,
                phase: TrackerPhase::Polling,
                test_id: Some("m".into()),
                progress: None,
                last_error: None,
                task: None,
            })),
            callbacks,
        };
        assert_send(&task.run());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_display_hold_suppresses_callbacks() {
        let source = Arc::new(ScriptedStatus::default()).script("f", vec![completed("f")]);
        let tracker = tracker(source);
        let fired = Arc::new(Mutex::new(Vec::new()));
        let (done, failed) = (fired.clone(), fired.clone());
        tracker.start_session(
            "f",
            SessionCallbacks::new(
                move |_| done.lock().unwrap().push("complete"),
                move |_| failed.lock().unwrap().push("error"),
            ),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Finalizing);

        tracker.stop_session();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completion_on_worker_thread_fires_once() {
        let source = Arc::new(ScriptedStatus::default()).script("w", vec![completed("w")]);
        let policy = PollPolicy {
            min_display_time: Duration::ZERO,
            ..TRACKER
        };
        let tracker = JobProgressTracker::new(source, policy, Handle::current());
        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("w", callbacks);

        let state = rx.await.unwrap().unwrap();
        assert_eq!(state.test_id, "w");
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_and_is_safe_when_idle() {
        let source = Arc::new(ScriptedStatus::default()).script("s", vec![running("s", 5.0)]);
        let tracker = tracker(source.clone());
        tracker.stop_session();
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Idle);

        let (callbacks, rx) = SessionCallbacks::oneshot();
        tracker.start_session("s", callbacks);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tracker.stop_session();
        let calls = source.calls_for("s").len();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls_for("s").len(), calls);
        assert_eq!(tracker.snapshot().phase, TrackerPhase::Cancelled);
        assert!(!tracker.is_active());
        assert!(rx.await.is_err());
    }
}
