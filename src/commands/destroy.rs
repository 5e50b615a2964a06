use std::sync::Arc;
use std::time::Duration;

use crate::api::PveClient;
use crate::cli::WaitArgs;
use crate::config::Connection;
use crate::error::PmxError;
use crate::vm::{self, RequestableState};

use super::{finish_task, wait_for_task_quietly};

pub async fn run(
    conn: &Connection,
    vmid: u64,
    force: bool,
    idempotent: bool,
    wait: &WaitArgs,
    quiet: bool,
) -> Result<(), PmxError> {
    let client = Arc::new(PveClient::connect(conn).await?);

    let target = match vm::try_find_vm(&client, vmid).await? {
        Some(vm) => vm,
        None if idempotent => {
            tracing::warn!("vm {vmid} does not exist; nothing to destroy");
            return Ok(());
        }
        None => return Err(PmxError::VmNotFound { vmid }),
    };

    if target.is_running() {
        if !force {
            return Err(PmxError::StateConflict {
                vmid,
                status: target.status.clone(),
            });
        }
        tracing::warn!("vm {vmid} is currently {}; requesting stop", target.status);
        // The delete below is rejected while the VM runs, so the stop
        // task must be fully observed before proceeding.
        if let Some(upid) =
            vm::request_state(&client, &target, RequestableState::Stopped, true).await?
        {
            wait_for_task_quietly(&client, upid, Duration::from_secs(wait.interval.max(1))).await?;
        }
    }

    let upid = client.delete_vm(&target.node, target.vmid).await?;
    tracing::info!("deletion requested for vm {vmid} (task {upid})");
    finish_task(&client, upid, wait, quiet).await
}
