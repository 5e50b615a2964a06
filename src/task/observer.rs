//! Observation state machine: stream task log output to a sink, race an
//! optional timeout watchdog, and classify how the task ended.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PmxError;

use super::sink::ProgressSink;
use super::{ObserveConfig, TaskApi, TaskHandle, log_source};

/// Final disposition of an observed task.
///
/// A remote task failing is a normal return value, not an error; the
/// caller must check it explicitly. Only failures to *observe* surface
/// as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// The task stopped with the contained exit status.
    Failed(String),
    /// The watchdog fired before the task left the running state.
    TimedOut,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded => f.write_str("succeeded"),
            Outcome::Failed(exit) => write!(f, "failed: {exit}"),
            Outcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Tracks the most recently rendered line so unchanged status text is
/// never redrawn.
#[derive(Default)]
struct ChangeGate {
    last: Option<String>,
}

impl ChangeGate {
    fn admit(&mut self, line: &str) -> bool {
        if self.last.as_deref() == Some(line) {
            return false;
        }
        self.last = Some(line.to_string());
        true
    }
}

/// Observe `handle` until it leaves the running state or the watchdog
/// fires, forwarding log lines to `sink`.
///
/// The handle is rewritten in place as the poll loop refreshes it; on
/// normal closure it holds the task's final status. On timeout the
/// classification is `TimedOut` regardless of the handle, and, when
/// configured, one best-effort cancellation request is issued. Its
/// failure is logged rather than returned: the observation outcome is
/// already determined.
pub async fn observe<A, S>(
    api: Arc<A>,
    handle: &mut TaskHandle,
    sink: &mut S,
    cfg: &ObserveConfig,
) -> Result<Outcome, PmxError>
where
    A: TaskApi + 'static,
    S: ProgressSink,
{
    cfg.validate()?;

    let mut stream = log_source::open(Arc::clone(&api), handle.clone(), cfg.poll_interval).await?;
    let mut gate = ChangeGate::default();

    let watchdog = tokio::time::sleep(if cfg.has_timeout() {
        cfg.timeout
    } else {
        Duration::ZERO
    });
    tokio::pin!(watchdog);

    let timed_out = loop {
        tokio::select! {
            line = stream.next_line() => match line {
                Some(line) => {
                    let msg = format!("({}) {}", handle.kind(), line.text);
                    if !cfg.quiet && gate.admit(&msg) {
                        sink.update(&msg);
                    }
                }
                None => break false,
            },
            _ = &mut watchdog, if cfg.has_timeout() => break true,
        }
    };

    if timed_out {
        if cfg.stop_on_timeout
            && let Err(e) = api.request_cancel(handle).await
        {
            tracing::warn!("failed to cancel task {}: {e}", handle.upid);
        }
        stream.abort();
        sink.finish();
        return Ok(Outcome::TimedOut);
    }

    *handle = stream.into_handle().await?;
    sink.finish();

    if handle.succeeded() {
        Ok(Outcome::Succeeded)
    } else {
        Ok(Outcome::Failed(
            handle
                .exit_status
                .clone()
                .unwrap_or_else(|| "unknown".into()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::{FakeApi, RecordingSink, test_handle};

    fn fast_config() -> ObserveConfig {
        ObserveConfig {
            spinner: false,
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lines_are_rendered_in_order_with_kind_prefix() {
        let api = Arc::new(FakeApi::new(
            vec![vec!["one", "two"], vec!["three"], vec![], vec!["four"]],
            3,
            "OK",
        ));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(
            sink.updates,
            vec![
                "(qmclone) one",
                "(qmclone) two",
                "(qmclone) three",
                "(qmclone) four",
            ]
        );
        assert_eq!(sink.finishes, 1);
        assert!(handle.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_three_polls_means_bootstrap_plus_three_fetches() {
        let api = Arc::new(FakeApi::new(
            vec![vec!["boot"], vec!["a"], vec!["b"], vec!["c"]],
            2,
            "OK",
        ));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(api.fetch_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_exhaustion_surfaces_no_log_available() {
        let api = Arc::new(FakeApi::new(vec![], usize::MAX, "OK"));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        let err = observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap_err();

        assert!(matches!(err, PmxError::NoLogAvailable { attempts: 3 }));
        assert_eq!(api.refresh_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_never_updates_the_sink() {
        let api = Arc::new(FakeApi::new(vec![vec!["boot"], vec!["a"]], 1, "OK"));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();
        let cfg = ObserveConfig {
            quiet: true,
            ..fast_config()
        };

        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &cfg)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Succeeded);
        assert!(sink.updates.is_empty());
        assert_eq!(sink.finishes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_identical_lines_render_once() {
        let api = Arc::new(FakeApi::new(
            vec![vec!["copying disk"], vec!["copying disk"]],
            1,
            "OK",
        ));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap();

        assert_eq!(sink.updates, vec!["(qmclone) copying disk"]);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_beats_a_slow_poll_and_cancels_once() {
        let api = Arc::new(FakeApi::new(vec![vec!["still going"]], usize::MAX, "OK"));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();
        let cfg = ObserveConfig {
            timeout: Duration::from_millis(100),
            stop_on_timeout: true,
            ..fast_config()
        };

        let before = tokio::time::Instant::now();
        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &cfg)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::TimedOut);
        // Fires at the timeout, not at the next 1s poll boundary.
        assert!(before.elapsed() < Duration::from_millis(500));
        assert_eq!(api.cancel_count(), 1);
        assert_eq!(sink.finishes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_without_stop_flag_does_not_cancel() {
        let api = Arc::new(FakeApi::new(vec![vec!["still going"]], usize::MAX, "OK"));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();
        let cfg = ObserveConfig {
            timeout: Duration::from_millis(100),
            ..fast_config()
        };

        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &cfg)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(api.cancel_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_stream_fetch_error_stops_observation() {
        let api = Arc::new(
            FakeApi::new(vec![vec!["one"], vec!["two"]], usize::MAX, "OK").fail_fetch_at(3),
        );
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        let err = observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap_err();

        assert!(matches!(err, PmxError::Observation { .. }));
        assert_eq!(api.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_task_with_only_the_bootstrap_line_succeeds() {
        let api = Arc::new(FakeApi::new(vec![vec!["done already"]], 0, "OK"));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(sink.updates.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_exit_status_is_domain_data_not_an_error() {
        let api = Arc::new(FakeApi::new(
            vec![vec!["boot"], vec!["TASK ERROR: it broke"]],
            1,
            "some disk error",
        ));
        let mut handle = test_handle();
        let mut sink = RecordingSink::default();

        let outcome = observe(Arc::clone(&api), &mut handle, &mut sink, &fast_config())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Failed("some disk error".into()));
    }

    #[test]
    fn change_gate_admits_only_changes() {
        let mut gate = ChangeGate::default();
        assert!(gate.admit("a"));
        assert!(!gate.admit("a"));
        assert!(gate.admit("b"));
        assert!(gate.admit("a"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let cfg = ObserveConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
