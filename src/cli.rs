use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, value_parser};

/// Proxmox assigns VMIDs in this range; anything else is a typo.
pub const VMID_RANGE: std::ops::RangeInclusive<u64> = 100..=999_999_999;

#[derive(Parser, Debug)]
#[command(name = "pmx", about = "Proxmox VE virtual machine management")]
pub struct Cli {
    /// Path to config file (default: ~/.config/pmx/pmx.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Turn on verbose debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors and final status
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,

    #[command(subcommand)]
    pub command: Command,
}

// Connection settings for the Proxmox VE API.
//
// Either a full API URL, or scheme/host/port from which
// `{scheme}://{host}:{port}/api2/json` is built.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Proxmox VE API URL (overrides scheme/host/port)
    #[arg(long, env = "PVE_URL", global = true)]
    pub url: Option<String>,

    /// Proxmox VE hostname/IP address
    #[arg(short = 'a', long, env = "PVE_HOST", global = true)]
    pub host: Option<String>,

    /// Proxmox VE API port
    #[arg(long, env = "PVE_PORT", global = true)]
    pub port: Option<u16>,

    /// API connection scheme (http or https)
    #[arg(long, global = true)]
    pub scheme: Option<String>,

    /// Proxmox VE username
    #[arg(short = 'u', long, env = "PVE_USER", global = true)]
    pub user: Option<String>,

    /// Proxmox VE password
    #[arg(short = 'p', long, env = "PVE_PASSWORD", global = true)]
    pub password: Option<String>,

    /// Proxmox VE authentication realm
    #[arg(short = 'r', long, env = "PVE_REALM", global = true)]
    pub realm: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(short = 'k', long, global = true)]
    pub insecure: bool,
}

/// Shared flags for commands that spawn a server-side task.
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Wait for the spawned task to complete
    #[arg(short = 'w', long, overrides_with = "no_wait")]
    pub wait: bool,

    /// Return as soon as the task is spawned (default)
    #[arg(long)]
    pub no_wait: bool,

    /// Seconds between task status polls
    #[arg(short = 'i', long, default_value_t = 1)]
    pub interval: u64,

    /// Give up waiting after this many seconds (0 = wait forever)
    #[arg(short = 's', long, default_value_t = 0)]
    pub timeout: u64,

    /// Request cancellation of the task if the timeout fires
    #[arg(long, requires = "timeout")]
    pub stop_on_timeout: bool,
}

impl WaitArgs {
    pub fn should_wait(&self) -> bool {
        self.wait && !self.no_wait
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report the Proxmox VE version
    Version,

    /// List virtual machines
    List {
        /// Restrict to a guest kind
        #[arg(long, value_enum, default_value_t = KindFilter::Both)]
        kind: KindFilter,
    },

    /// Start a virtual machine
    Start {
        /// VMID to start
        #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
        vmid: u64,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Stop a virtual machine
    Stop {
        /// VMID to stop
        #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
        vmid: u64,

        /// Don't fail if the VM is already stopped
        #[arg(long)]
        idempotent: bool,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Suspend a virtual machine
    Pause {
        /// VMID to suspend
        #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
        vmid: u64,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Clone a virtual machine
    Clone(CloneArgs),

    /// Delete a virtual machine
    Destroy {
        /// VMID to delete
        #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
        vmid: u64,

        /// If the VM is not stopped, stop it before attempting removal
        #[arg(short = 'f', long)]
        force: bool,

        /// Don't fail if the VM does not exist
        #[arg(long)]
        idempotent: bool,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Set virtual machine options as <key> <value> pairs
    Set {
        /// VMID to reconfigure
        #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
        vmid: u64,

        /// Alternating option names and values, e.g. `cores 4 memory 8192`
        #[arg(required = true, num_args = 2..)]
        options: Vec<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Show the configuration of a virtual machine
    Config {
        /// VMID to inspect
        #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
        vmid: u64,
    },

    /// Get the status of a task by UPID
    Status {
        /// Task UPID, e.g. `UPID:pve1:0003C4D1:...`
        upid: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Qemu,
    Lxc,
    Both,
}

impl KindFilter {
    pub fn matches(self, kind: &str) -> bool {
        match self {
            KindFilter::Qemu => kind == "qemu",
            KindFilter::Lxc => kind == "lxc",
            KindFilter::Both => kind == "qemu" || kind == "lxc",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CloneArgs {
    /// VMID to clone from
    #[arg(short = 'v', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
    pub vmid: u64,

    /// VMID for the clone (default: next available)
    #[arg(short = 'n', long, value_parser = value_parser!(u64).range(VMID_RANGE))]
    pub newid: Option<u64>,

    /// Name for the new VM
    #[arg(long)]
    pub name: Option<String>,

    /// Description for the new VM
    #[arg(long)]
    pub description: Option<String>,

    /// Create a full copy of all disks instead of a linked clone
    #[arg(long)]
    pub full: bool,

    /// Add the new VM to the specified pool
    #[arg(long)]
    pub pool: Option<String>,

    /// Name of the snapshot to clone from
    #[arg(long)]
    pub snapname: Option<String>,

    /// Target storage for full clone
    #[arg(long)]
    pub storage: Option<String>,

    /// Target format for file storage (raw, qcow2, vmdk); full clone only
    #[arg(long)]
    pub format: Option<String>,

    /// Target node; only allowed if the VM is on shared storage
    #[arg(long)]
    pub target: Option<String>,

    /// Override I/O bandwidth limit (KiB/s)
    #[arg(long)]
    pub bwlimit: Option<u64>,

    /// Destroy an existing VM with the target VMID first
    #[arg(long, requires = "newid")]
    pub overwrite: bool,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vmid_range_enforced() {
        let err = Cli::try_parse_from(["pmx", "start", "--vmid", "99"]);
        assert!(err.is_err());

        let ok = Cli::try_parse_from(["pmx", "start", "--vmid", "100"]);
        assert!(ok.is_ok());
    }

    #[test]
    fn no_wait_overrides_wait() {
        let cli = Cli::try_parse_from(["pmx", "start", "--vmid", "100", "-w", "--no-wait"])
            .expect("parse");
        match cli.command {
            Command::Start { wait, .. } => assert!(!wait.should_wait()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn set_requires_key_value_pairs() {
        let cli = Cli::try_parse_from(["pmx", "set", "--vmid", "100", "cores", "4"]).expect("parse");
        match cli.command {
            Command::Set { options, .. } => assert_eq!(options, vec!["cores", "4"]),
            _ => unreachable!(),
        }
    }
}
