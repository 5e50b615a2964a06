use std::sync::Arc;

use crate::api::PveClient;
use crate::cli::WaitArgs;
use crate::config::Connection;
use crate::error::PmxError;
use crate::vm::{self, RequestableState};

use super::finish_task;

pub async fn run(
    conn: &Connection,
    vmid: u64,
    wait: &WaitArgs,
    quiet: bool,
) -> Result<(), PmxError> {
    let client = Arc::new(PveClient::connect(conn).await?);
    let target = vm::find_vm(&client, vmid).await?;
    match vm::request_state(&client, &target, RequestableState::Paused, false).await? {
        Some(upid) => finish_task(&client, upid, wait, quiet).await,
        None => Ok(()),
    }
}
