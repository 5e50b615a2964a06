use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;

use crate::api::PveClient;
use crate::config::Connection;
use crate::error::PmxError;
use crate::vm;

pub async fn run(conn: &Connection, vmid: u64) -> Result<(), PmxError> {
    let client = PveClient::connect(conn).await?;
    let target = vm::find_vm(&client, vmid).await?;
    let config = client.vm_config(&target.node, target.vmid).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![format!("vm: {vmid}"), format!("node: {}", target.node)]);
    for (key, value) in config.rows() {
        table.add_row(vec![key.to_string(), value]);
    }
    println!("{table}");
    Ok(())
}
