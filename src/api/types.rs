//! Typed views of Proxmox VE API responses.
//!
//! The API wraps every payload in `{"data": ...}`; each endpoint decodes
//! its envelope exactly once, here, into named fields.

use facet::Facet;

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct TicketEnvelope {
    #[facet(default)]
    pub data: TicketData,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct TicketData {
    #[facet(default)]
    pub ticket: String,
    #[facet(rename = "CSRFPreventionToken")]
    pub csrf_token: String,
}

/// Envelope for endpoints whose payload is a bare string, such as the
/// UPID returned by every task-spawning POST and `/cluster/nextid`.
#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct StringEnvelope {
    #[facet(default)]
    pub data: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct VersionEnvelope {
    #[facet(default)]
    pub data: VersionData,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct VersionData {
    #[facet(default)]
    pub version: String,
    #[facet(default)]
    pub release: String,
    #[facet(default)]
    pub repoid: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct ResourceEnvelope {
    #[facet(default)]
    pub data: Vec<ClusterResource>,
}

/// One row of `/cluster/resources?type=vm`.
#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct ClusterResource {
    #[facet(default)]
    pub id: String,
    #[facet(rename = "type")]
    pub kind: String,
    #[facet(default)]
    pub node: String,
    #[facet(default)]
    pub vmid: u64,
    #[facet(default)]
    pub name: String,
    #[facet(default)]
    pub status: String,
    #[facet(default)]
    pub maxmem: u64,
    #[facet(default)]
    pub maxdisk: u64,
    #[facet(default)]
    pub uptime: u64,
    #[facet(default)]
    pub template: u64,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct TaskStatusEnvelope {
    #[facet(default)]
    pub data: TaskStatusData,
}

/// `/nodes/{node}/tasks/{upid}/status` — the polled view of a task.
#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct TaskStatusData {
    #[facet(default)]
    pub upid: String,
    #[facet(default)]
    pub node: String,
    #[facet(rename = "type")]
    pub kind: String,
    #[facet(default)]
    pub id: String,
    #[facet(default)]
    pub user: String,
    #[facet(default)]
    pub pid: u64,
    #[facet(default)]
    pub pstart: u64,
    #[facet(default)]
    pub starttime: u64,
    #[facet(default)]
    pub status: String,
    #[facet(default)]
    pub exitstatus: Option<String>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct TaskLogEnvelope {
    #[facet(default)]
    pub data: Vec<TaskLogEntry>,
}

/// One numbered line of a task log page.
#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct TaskLogEntry {
    #[facet(default)]
    pub n: u64,
    #[facet(default)]
    pub t: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
pub struct VmConfigEnvelope {
    #[facet(default)]
    pub data: VmConfig,
}

/// The subset of `/nodes/{node}/qemu/{vmid}/config` pmx knows how to
/// display. Unset keys stay `None` and are skipped when rendering.
#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct VmConfig {
    #[facet(default)]
    pub name: Option<String>,
    #[facet(default)]
    pub cores: Option<u64>,
    #[facet(default)]
    pub sockets: Option<u64>,
    #[facet(default)]
    pub memory: Option<u64>,
    #[facet(default)]
    pub balloon: Option<u64>,
    #[facet(default)]
    pub onboot: Option<u64>,
    #[facet(default)]
    pub ostype: Option<String>,
    #[facet(default)]
    pub agent: Option<String>,
    #[facet(default)]
    pub boot: Option<String>,
    #[facet(default)]
    pub bootdisk: Option<String>,
    #[facet(default)]
    pub scsihw: Option<String>,
    #[facet(default)]
    pub machine: Option<String>,
    #[facet(default)]
    pub cpu: Option<String>,
    #[facet(default)]
    pub bios: Option<String>,
    #[facet(default)]
    pub vga: Option<String>,
    #[facet(default)]
    pub description: Option<String>,
    #[facet(default)]
    pub tags: Option<String>,
    #[facet(default)]
    pub digest: Option<String>,
    #[facet(default)]
    pub net0: Option<String>,
    #[facet(default)]
    pub net1: Option<String>,
    #[facet(default)]
    pub net2: Option<String>,
    #[facet(default)]
    pub net3: Option<String>,
    #[facet(default)]
    pub scsi0: Option<String>,
    #[facet(default)]
    pub scsi1: Option<String>,
    #[facet(default)]
    pub scsi2: Option<String>,
    #[facet(default)]
    pub scsi3: Option<String>,
    #[facet(default)]
    pub virtio0: Option<String>,
    #[facet(default)]
    pub virtio1: Option<String>,
    #[facet(default)]
    pub ide0: Option<String>,
    #[facet(default)]
    pub ide2: Option<String>,
    #[facet(default)]
    pub sata0: Option<String>,
    #[facet(default)]
    pub efidisk0: Option<String>,
}

impl VmConfig {
    /// Set keys only, in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();

        fn push_str(rows: &mut Vec<(&'static str, String)>, key: &'static str, v: &Option<String>) {
            if let Some(v) = v {
                rows.push((key, v.clone()));
            }
        }
        fn push_num(rows: &mut Vec<(&'static str, String)>, key: &'static str, v: &Option<u64>) {
            if let Some(v) = v {
                rows.push((key, v.to_string()));
            }
        }

        push_str(&mut rows, "name", &self.name);
        push_num(&mut rows, "cores", &self.cores);
        push_num(&mut rows, "sockets", &self.sockets);
        push_num(&mut rows, "memory", &self.memory);
        push_num(&mut rows, "balloon", &self.balloon);
        push_num(&mut rows, "onboot", &self.onboot);
        push_str(&mut rows, "ostype", &self.ostype);
        push_str(&mut rows, "agent", &self.agent);
        push_str(&mut rows, "boot", &self.boot);
        push_str(&mut rows, "bootdisk", &self.bootdisk);
        push_str(&mut rows, "scsihw", &self.scsihw);
        push_str(&mut rows, "machine", &self.machine);
        push_str(&mut rows, "cpu", &self.cpu);
        push_str(&mut rows, "bios", &self.bios);
        push_str(&mut rows, "vga", &self.vga);
        push_str(&mut rows, "description", &self.description);
        push_str(&mut rows, "tags", &self.tags);
        push_str(&mut rows, "net0", &self.net0);
        push_str(&mut rows, "net1", &self.net1);
        push_str(&mut rows, "net2", &self.net2);
        push_str(&mut rows, "net3", &self.net3);
        push_str(&mut rows, "scsi0", &self.scsi0);
        push_str(&mut rows, "scsi1", &self.scsi1);
        push_str(&mut rows, "scsi2", &self.scsi2);
        push_str(&mut rows, "scsi3", &self.scsi3);
        push_str(&mut rows, "virtio0", &self.virtio0);
        push_str(&mut rows, "virtio1", &self.virtio1);
        push_str(&mut rows, "ide0", &self.ide0);
        push_str(&mut rows, "ide2", &self.ide2);
        push_str(&mut rows, "sata0", &self.sata0);
        push_str(&mut rows, "efidisk0", &self.efidisk0);
        push_str(&mut rows, "digest", &self.digest);
        rows
    }
}
