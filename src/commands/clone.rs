use std::sync::Arc;
use std::time::Duration;

use crate::api::PveClient;
use crate::cli::CloneArgs;
use crate::config::Connection;
use crate::error::PmxError;
use crate::vm;

use super::{finish_task, wait_for_task_quietly};

pub async fn run(conn: &Connection, args: &CloneArgs, quiet: bool) -> Result<(), PmxError> {
    let client = Arc::new(PveClient::connect(conn).await?);
    let source = vm::find_vm(&client, args.vmid).await?;

    let newid = match args.newid {
        Some(newid) => {
            // Manually assigned target VMID — it may already be taken.
            if let Some(existing) = vm::try_find_vm(&client, newid).await? {
                if !args.overwrite {
                    return Err(PmxError::Validation {
                        message: format!(
                            "vm with target id {newid} already exists; use --overwrite to replace it"
                        ),
                    });
                }
                tracing::warn!("overwrite requested; destroying existing vm {newid}");
                let upid = client.delete_vm(&existing.node, existing.vmid).await?;
                wait_for_task_quietly(
                    &client,
                    upid,
                    Duration::from_secs(args.wait.interval.max(1)),
                )
                .await?;
            }
            newid
        }
        None => client.next_id().await?,
    };

    let mut form: Vec<(&str, String)> = vec![("newid", newid.to_string())];
    if args.full {
        form.push(("full", "1".to_string()));
    }
    let optional = [
        ("name", &args.name),
        ("description", &args.description),
        ("pool", &args.pool),
        ("snapname", &args.snapname),
        ("storage", &args.storage),
        ("format", &args.format),
        ("target", &args.target),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            form.push((key, value.clone()));
        }
    }
    if let Some(bwlimit) = args.bwlimit {
        form.push(("bwlimit", bwlimit.to_string()));
    }

    let upid = client.clone_vm(&source.node, source.vmid, &form).await?;
    tracing::info!("clone of vm {} requested, new id {newid} (task {upid})", args.vmid);
    println!("clone requested: vm {} -> {newid}", args.vmid);
    finish_task(&client, upid, &args.wait, quiet).await
}
