//! Opaque reference to a remote, asynchronous Proxmox task.

use std::fmt;
use std::str::FromStr;

use crate::error::PmxError;

/// Parsed task identifier.
///
/// Wire form: `UPID:node:pid:pstart:starttime:type:id:user:` — the hex
/// fields are opaque to pmx, but the node is needed to address the
/// per-node task endpoints and the type tag prefixes log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upid {
    raw: String,
    pub node: String,
    pub kind: String,
    pub id: String,
    pub user: String,
}

impl Upid {
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Upid {
    type Err = PmxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 8 || parts[0] != "UPID" || parts[1].is_empty() || parts[5].is_empty() {
            return Err(PmxError::MalformedUpid { upid: s.to_string() });
        }
        Ok(Upid {
            raw: s.to_string(),
            node: parts[1].to_string(),
            kind: parts[5].to_string(),
            id: parts[6].to_string(),
            user: parts[7].to_string(),
        })
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Stopped,
}

/// Last-known view of a remote task.
///
/// Created by callers from a task-spawning response or a user-supplied
/// UPID; the fields are rewritten in place by each `TaskApi::refresh`.
/// The exit status only carries meaning once the task has stopped.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub upid: Upid,
    pub status: TaskStatus,
    pub exit_status: Option<String>,
}

impl TaskHandle {
    /// A fresh handle is assumed running until the first refresh says
    /// otherwise.
    pub fn new(upid: Upid) -> Self {
        TaskHandle {
            upid,
            status: TaskStatus::Running,
            exit_status: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    /// Proxmox reports success as the literal exit status `OK`.
    pub fn succeeded(&self) -> bool {
        !self.is_running() && self.exit_status.as_deref() == Some("OK")
    }

    pub fn node(&self) -> &str {
        &self.upid.node
    }

    /// Operation kind, e.g. `qmclone` — used to prefix rendered log lines.
    pub fn kind(&self) -> &str {
        &self.upid.kind
    }
}
