//! VM lookup and the generic state-request helper shared by the
//! lifecycle commands.

use std::fmt;

use crate::api::PveClient;
use crate::api::types::ClusterResource;
use crate::error::PmxError;
use crate::task::Upid;

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_STOPPED: &str = "stopped";

/// Cluster-resources view of one guest — enough to address the per-node
/// endpoints and gate state requests.
#[derive(Debug, Clone)]
pub struct VmRef {
    pub vmid: u64,
    pub node: String,
    pub name: String,
    pub status: String,
    pub template: bool,
}

impl VmRef {
    fn from_resource(rs: &ClusterResource) -> Self {
        VmRef {
            vmid: rs.vmid,
            node: rs.node.clone(),
            name: rs.name.clone(),
            status: rs.status.clone(),
            template: rs.template != 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == STATUS_RUNNING
    }

    pub fn is_stopped(&self) -> bool {
        self.status == STATUS_STOPPED
    }
}

/// Find a VM by VMID anywhere in the cluster.
pub async fn find_vm(client: &PveClient, vmid: u64) -> Result<VmRef, PmxError> {
    try_find_vm(client, vmid)
        .await?
        .ok_or(PmxError::VmNotFound { vmid })
}

/// Like [`find_vm`], but absence is `None` rather than an error.
pub async fn try_find_vm(client: &PveClient, vmid: u64) -> Result<Option<VmRef>, PmxError> {
    let resources = client.cluster_resources("vm").await?;
    Ok(resources
        .iter()
        .find(|rs| rs.vmid == vmid)
        .map(VmRef::from_resource))
}

/// States a caller can ask the hypervisor to move a guest into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestableState {
    Running,
    Stopped,
    Paused,
}

impl fmt::Display for RequestableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestableState::Running => f.write_str(STATUS_RUNNING),
            RequestableState::Stopped => f.write_str(STATUS_STOPPED),
            RequestableState::Paused => f.write_str("paused"),
        }
    }
}

/// Ask the hypervisor to move `vm` into `desired`.
///
/// A VM already in the requested state is a conflict unless `idempotent`,
/// in which case nothing is requested and `None` comes back. Pausing is
/// never short-circuited; the resources view cannot distinguish a
/// paused guest from a running one.
pub async fn request_state(
    client: &PveClient,
    vm: &VmRef,
    desired: RequestableState,
    idempotent: bool,
) -> Result<Option<Upid>, PmxError> {
    let already = match desired {
        RequestableState::Running => vm.is_running(),
        RequestableState::Stopped => vm.is_stopped(),
        RequestableState::Paused => false,
    };
    if already {
        if idempotent {
            tracing::warn!(
                "vm {} already in requested state ({})",
                vm.vmid,
                vm.status
            );
            return Ok(None);
        }
        return Err(PmxError::StateConflict {
            vmid: vm.vmid,
            status: vm.status.clone(),
        });
    }

    let upid = match desired {
        RequestableState::Running => client.start_vm(&vm.node, vm.vmid).await?,
        RequestableState::Stopped => client.stop_vm(&vm.node, vm.vmid).await?,
        RequestableState::Paused => client.suspend_vm(&vm.node, vm.vmid).await?,
    };
    tracing::info!("state {desired} requested for vm {} (task {upid})", vm.vmid);
    Ok(Some(upid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_ref_reads_resource_fields() {
        let rs = ClusterResource {
            vmid: 100,
            node: "pve1".into(),
            name: "web01".into(),
            status: "running".into(),
            template: 0,
            ..Default::default()
        };
        let vm = VmRef::from_resource(&rs);
        assert!(vm.is_running());
        assert!(!vm.is_stopped());
        assert!(!vm.template);
    }
}
