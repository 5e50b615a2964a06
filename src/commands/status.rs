use std::sync::Arc;

use crate::api::PveClient;
use crate::cli::WaitArgs;
use crate::config::Connection;
use crate::error::PmxError;
use crate::task::{self, TaskApi, TaskHandle, TaskStatus, TermSink, Upid};

use super::{follow_hint, observe_config, report_outcome};

pub async fn run(
    conn: &Connection,
    upid: &str,
    wait: &WaitArgs,
    quiet: bool,
) -> Result<(), PmxError> {
    // Reject garbage before touching the network.
    let upid: Upid = upid.parse()?;

    let client = Arc::new(PveClient::connect(conn).await?);
    let mut handle = TaskHandle::new(upid);
    client.refresh(&mut handle).await?;

    match handle.status {
        TaskStatus::Running => {
            println!("task {} ({}) is running", handle.upid, handle.kind());
            if !wait.should_wait() {
                println!("{}", follow_hint(&handle.upid));
                return Ok(());
            }
            let cfg = observe_config(wait, quiet);
            let mut sink = TermSink::new(&cfg);
            let outcome =
                task::observe(Arc::clone(&client), &mut handle, &mut sink, &cfg).await?;
            report_outcome(&handle, &outcome)
        }
        TaskStatus::Stopped => {
            if handle.succeeded() {
                println!("task {} ({}) stopped: OK", handle.upid, handle.kind());
                Ok(())
            } else {
                Err(PmxError::TaskFailed {
                    upid: handle.upid.to_string(),
                    exit_status: handle
                        .exit_status
                        .clone()
                        .unwrap_or_else(|| "unknown".into()),
                })
            }
        }
    }
}
