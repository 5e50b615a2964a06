use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;

use crate::api::PveClient;
use crate::cli::KindFilter;
use crate::config::Connection;
use crate::error::PmxError;

const MEBIBYTE: u64 = 1024 * 1024;
const GIBIBYTE: u64 = 1024 * MEBIBYTE;

pub async fn run(conn: &Connection, kind: KindFilter) -> Result<(), PmxError> {
    let client = PveClient::connect(conn).await?;
    let mut guests = client.cluster_resources("vm").await?;
    guests.retain(|rs| kind.matches(&rs.kind));
    guests.sort_by_key(|rs| rs.vmid);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        "VMID",
        "Name",
        "Type",
        "Status",
        "Mem (MB)",
        "BootDisk (GB)",
        "Uptime",
    ]);
    for rs in &guests {
        table.add_row(vec![
            rs.vmid.to_string(),
            rs.name.clone(),
            rs.kind.clone(),
            rs.status.clone(),
            (rs.maxmem / MEBIBYTE).to_string(),
            format!("{:.1}", rs.maxdisk as f64 / GIBIBYTE as f64),
            format_uptime(rs.uptime),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn format_uptime(secs: u64) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
