//! Asynchronous task observation.
//!
//! Commands spawn long-running operations on the server and get back a
//! UPID. The only window into such an operation is its append-only log,
//! which has to be polled. This module turns that into a stream: a
//! background poll loop ([`log_source`]) feeds lines over a channel to a
//! consumer ([`observer`]) that renders them through a progress sink and
//! races an optional timeout watchdog, then classifies how the task ended.

pub mod handle;
pub mod log_source;
pub mod observer;
pub mod sink;

#[cfg(test)]
pub mod testing;

use std::future::Future;
use std::time::Duration;

pub use handle::{TaskHandle, TaskStatus, Upid};
pub use observer::{Outcome, observe};
pub use sink::{ProgressSink, TermSink};

use crate::error::PmxError;

/// One log line, numbered as the server numbers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub n: u64,
    pub text: String,
}

/// The slice of the API the observation engine needs.
///
/// `PveClient` implements this over HTTP; tests drive the engine with
/// scripted fakes that count calls.
pub trait TaskApi: Send + Sync {
    /// Re-fetch status fields into the handle in place.
    fn refresh(
        &self,
        handle: &mut TaskHandle,
    ) -> impl Future<Output = Result<(), PmxError>> + Send;

    /// Fetch up to `limit` log lines at or after `start` (0-based offset).
    fn fetch_log(
        &self,
        handle: &TaskHandle,
        start: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<LogLine>, PmxError>> + Send;

    /// Best-effort cancellation of the remote task.
    fn request_cancel(
        &self,
        handle: &TaskHandle,
    ) -> impl Future<Output = Result<(), PmxError>> + Send;
}

/// How an observation run behaves. Resolved once per call; no partially
/// applied option chains.
#[derive(Debug, Clone)]
pub struct ObserveConfig {
    /// Suppress line-by-line echo; only the final status is reported.
    pub quiet: bool,
    /// Render an animated spinner instead of plain appended lines.
    pub spinner: bool,
    /// Spinner animation interval.
    pub tick: Duration,
    /// Delay between log polls.
    pub poll_interval: Duration,
    /// Zero means wait forever; otherwise the watchdog fires after this.
    pub timeout: Duration,
    /// Whether a firing watchdog also requests remote cancellation.
    pub stop_on_timeout: bool,
}

impl Default for ObserveConfig {
    fn default() -> Self {
        ObserveConfig {
            quiet: false,
            spinner: true,
            tick: Duration::from_millis(100),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::ZERO,
            stop_on_timeout: false,
        }
    }
}

impl ObserveConfig {
    pub fn validate(&self) -> Result<(), PmxError> {
        if self.poll_interval.is_zero() {
            return Err(PmxError::Validation {
                message: "poll interval must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn has_timeout(&self) -> bool {
        !self.timeout.is_zero()
    }
}
