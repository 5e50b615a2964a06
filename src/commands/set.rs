use std::sync::Arc;

use crate::api::PveClient;
use crate::cli::WaitArgs;
use crate::config::Connection;
use crate::error::PmxError;
use crate::vm;

use super::finish_task;

pub async fn run(
    conn: &Connection,
    vmid: u64,
    options: &[String],
    wait: &WaitArgs,
    quiet: bool,
) -> Result<(), PmxError> {
    if options.len() % 2 != 0 {
        return Err(PmxError::Validation {
            message: "options must be given as <key> <value> pairs".into(),
        });
    }
    let form: Vec<(&str, String)> = options
        .chunks_exact(2)
        .map(|pair| {
            // Tolerate `--cores 4` style keys and quoted values.
            let key = pair[0].trim_start_matches('-');
            let value = pair[1].trim_matches('"').to_string();
            (key, value)
        })
        .collect();

    let client = Arc::new(PveClient::connect(conn).await?);
    let target = vm::find_vm(&client, vmid).await?;
    let upid = client.set_vm_options(&target.node, target.vmid, &form).await?;
    tracing::info!("config change requested for vm {vmid} (task {upid})");
    finish_task(&client, upid, wait, quiet).await
}
