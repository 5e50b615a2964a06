//! One module per subcommand. Each command validates its inputs, builds
//! an authenticated client, makes its API call, and hands any spawned
//! task to the shared wait helpers below.

pub mod clone;
pub mod config;
pub mod destroy;
pub mod list;
pub mod pause;
pub mod set;
pub mod start;
pub mod status;
pub mod stop;
pub mod version;

use std::sync::Arc;
use std::time::Duration;

use console::style;

use crate::api::PveClient;
use crate::cli::WaitArgs;
use crate::error::PmxError;
use crate::task::{self, ObserveConfig, Outcome, TaskHandle, TermSink, Upid};

/// Observation settings resolved from the CLI wait flags.
pub fn observe_config(wait: &WaitArgs, quiet: bool) -> ObserveConfig {
    ObserveConfig {
        quiet,
        spinner: !quiet,
        poll_interval: Duration::from_secs(wait.interval),
        timeout: Duration::from_secs(wait.timeout),
        stop_on_timeout: wait.stop_on_timeout,
        ..Default::default()
    }
}

/// Wait on a freshly spawned task per the wait flags, or print how to
/// follow it later.
pub async fn finish_task(
    client: &Arc<PveClient>,
    upid: Upid,
    wait: &WaitArgs,
    quiet: bool,
) -> Result<(), PmxError> {
    if !wait.should_wait() {
        println!("{}", follow_hint(&upid));
        return Ok(());
    }

    let cfg = observe_config(wait, quiet);
    let mut handle = TaskHandle::new(upid);
    let mut sink = TermSink::new(&cfg);
    let outcome = task::observe(Arc::clone(client), &mut handle, &mut sink, &cfg).await?;
    report_outcome(&handle, &outcome)
}

/// Block on a task without any rendering — for internal gates like
/// "stop before destroy" where the next call must not race the task.
pub async fn wait_for_task_quietly(
    client: &Arc<PveClient>,
    upid: Upid,
    poll_interval: Duration,
) -> Result<(), PmxError> {
    let cfg = ObserveConfig {
        quiet: true,
        spinner: false,
        poll_interval,
        ..Default::default()
    };
    let mut handle = TaskHandle::new(upid);
    let mut sink = TermSink::new(&cfg);
    match task::observe(Arc::clone(client), &mut handle, &mut sink, &cfg).await? {
        Outcome::Succeeded => Ok(()),
        outcome => Err(PmxError::TaskFailed {
            upid: handle.upid.to_string(),
            exit_status: outcome.to_string(),
        }),
    }
}

pub fn follow_hint(upid: &Upid) -> String {
    format!("To watch the running operation, run:\n    pmx status -w \"{upid}\"")
}

/// A failed task is domain data from the observer's point of view, but
/// for the CLI it decides the exit code.
pub fn report_outcome(handle: &TaskHandle, outcome: &Outcome) -> Result<(), PmxError> {
    match outcome {
        Outcome::Succeeded => {
            println!("{} task {} {}", style("✓").green(), handle.kind(), outcome);
            Ok(())
        }
        Outcome::TimedOut => {
            println!("{} task {} {}", style("!").yellow(), handle.kind(), outcome);
            Ok(())
        }
        Outcome::Failed(exit) => Err(PmxError::TaskFailed {
            upid: handle.upid.to_string(),
            exit_status: exit.clone(),
        }),
    }
}
