mod alert;
mod envelope;
mod logs;
mod progress;
mod slices;

pub use alert::{Alert, AlertLedger, AlertLevel};
pub use envelope::{ClientCommand, Envelope, Topic};
pub use logs::{LogBuffer, LogEntry};
pub use progress::{JobStatus, ProgressState, SubmitResponse, SweepRequest};
pub use slices::{LiveState, Position};
