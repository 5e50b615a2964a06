//! Authenticated reqwest client for a Proxmox VE node.

use std::time::Duration;

use crate::config::Connection;
use crate::error::PmxError;
use crate::task::{LogLine, TaskApi, TaskHandle, TaskStatus, Upid};

use super::types::{
    ClusterResource, ResourceEnvelope, StringEnvelope, TaskLogEnvelope, TaskStatusData,
    TaskStatusEnvelope, TicketEnvelope, VersionData, VersionEnvelope, VmConfig, VmConfigEnvelope,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PveClient {
    http: reqwest::Client,
    base: String,
    ticket: String,
    csrf_token: String,
}

impl PveClient {
    /// Build a client and authenticate against the ticket endpoint.
    ///
    /// Construction is authentication: a `PveClient` always carries a
    /// valid ticket and CSRF token.
    pub async fn connect(conn: &Connection) -> Result<Self, PmxError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(conn.insecure)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| transport("/access/ticket", e))?;

        let path = "/access/ticket";
        let resp = http
            .post(format!("{}{}", conn.api_url, path))
            .form(&[
                ("username", conn.login_name()),
                ("password", conn.password.clone()),
            ])
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        let body = check(path, resp).await?;
        let env: TicketEnvelope = decode_body(path, &body)?;
        if env.data.ticket.is_empty() {
            return Err(PmxError::Api {
                status: 401,
                path: path.to_string(),
                message: "authentication succeeded but no ticket was returned".into(),
            });
        }

        tracing::debug!(url = %conn.api_url, user = %conn.login_name(), "authenticated");
        Ok(PveClient {
            http,
            base: conn.api_url.clone(),
            ticket: env.data.ticket,
            csrf_token: env.data.csrf_token,
        })
    }

    // ── Request plumbing ─────────────────────────────────

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, PmxError> {
        let mut req = self
            .http
            .get(format!("{}{}", self.base, path))
            .header("Cookie", format!("PVEAuthCookie={}", self.ticket));
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = req.send().await.map_err(|e| transport(path, e))?;
        check(path, resp).await
    }

    async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<String, PmxError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base, path))
            .header("Cookie", format!("PVEAuthCookie={}", self.ticket))
            .header("CSRFPreventionToken", &self.csrf_token)
            .form(form)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        check(path, resp).await
    }

    async fn delete(&self, path: &str) -> Result<String, PmxError> {
        let resp = self
            .http
            .delete(format!("{}{}", self.base, path))
            .header("Cookie", format!("PVEAuthCookie={}", self.ticket))
            .header("CSRFPreventionToken", &self.csrf_token)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        check(path, resp).await
    }

    // ── Cluster ──────────────────────────────────────────

    pub async fn version(&self) -> Result<VersionData, PmxError> {
        let path = "/version";
        let body = self.get(path, &[]).await?;
        let env: VersionEnvelope = decode_body(path, &body)?;
        Ok(env.data)
    }

    pub async fn cluster_resources(&self, kind: &str) -> Result<Vec<ClusterResource>, PmxError> {
        let path = "/cluster/resources";
        let body = self.get(path, &[("type", kind.to_string())]).await?;
        let env: ResourceEnvelope = decode_body(path, &body)?;
        Ok(env.data)
    }

    /// Next free VMID, as suggested by the cluster.
    pub async fn next_id(&self) -> Result<u64, PmxError> {
        let path = "/cluster/nextid";
        let body = self.get(path, &[]).await?;
        let env: StringEnvelope = decode_body(path, &body)?;
        env.data.parse().map_err(|_| PmxError::Decode {
            path: path.to_string(),
            message: format!("nextid '{}' is not a number", env.data),
        })
    }

    // ── VM lifecycle (each spawns a task and returns its UPID) ──

    pub async fn start_vm(&self, node: &str, vmid: u64) -> Result<Upid, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}/status/start");
        let body = self.post(&path, &[]).await?;
        decode_upid(&path, &body)
    }

    pub async fn stop_vm(&self, node: &str, vmid: u64) -> Result<Upid, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}/status/stop");
        let body = self.post(&path, &[]).await?;
        decode_upid(&path, &body)
    }

    pub async fn suspend_vm(&self, node: &str, vmid: u64) -> Result<Upid, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}/status/suspend");
        let body = self.post(&path, &[]).await?;
        decode_upid(&path, &body)
    }

    pub async fn clone_vm(
        &self,
        node: &str,
        vmid: u64,
        form: &[(&str, String)],
    ) -> Result<Upid, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}/clone");
        let body = self.post(&path, form).await?;
        decode_upid(&path, &body)
    }

    pub async fn delete_vm(&self, node: &str, vmid: u64) -> Result<Upid, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}");
        let body = self.delete(&path).await?;
        decode_upid(&path, &body)
    }

    pub async fn vm_config(&self, node: &str, vmid: u64) -> Result<VmConfig, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}/config");
        let body = self.get(&path, &[]).await?;
        let env: VmConfigEnvelope = decode_body(&path, &body)?;
        Ok(env.data)
    }

    pub async fn set_vm_options(
        &self,
        node: &str,
        vmid: u64,
        form: &[(&str, String)],
    ) -> Result<Upid, PmxError> {
        let path = format!("/nodes/{node}/qemu/{vmid}/config");
        let body = self.post(&path, form).await?;
        decode_upid(&path, &body)
    }

    // ── Tasks ────────────────────────────────────────────

    pub async fn task_status(&self, upid: &Upid) -> Result<TaskStatusData, PmxError> {
        let path = format!("/nodes/{}/tasks/{}/status", upid.node, upid);
        let body = self.get(&path, &[]).await?;
        let env: TaskStatusEnvelope = decode_body(&path, &body)?;
        Ok(env.data)
    }

    pub async fn task_log(
        &self,
        upid: &Upid,
        start: u64,
        limit: u64,
    ) -> Result<Vec<super::types::TaskLogEntry>, PmxError> {
        let path = format!("/nodes/{}/tasks/{}/log", upid.node, upid);
        let body = self
            .get(
                &path,
                &[("start", start.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        let env: TaskLogEnvelope = decode_body(&path, &body)?;
        Ok(env.data)
    }

    pub async fn stop_task(&self, upid: &Upid) -> Result<(), PmxError> {
        let path = format!("/nodes/{}/tasks/{}", upid.node, upid);
        self.delete(&path).await?;
        Ok(())
    }
}

impl TaskApi for PveClient {
    async fn refresh(&self, handle: &mut TaskHandle) -> Result<(), PmxError> {
        let status = self.task_status(&handle.upid).await?;
        handle.status = if status.status == "running" {
            TaskStatus::Running
        } else {
            TaskStatus::Stopped
        };
        handle.exit_status = status.exitstatus.filter(|s| !s.is_empty());
        Ok(())
    }

    async fn fetch_log(
        &self,
        handle: &TaskHandle,
        start: u64,
        limit: u64,
    ) -> Result<Vec<LogLine>, PmxError> {
        let entries = self.task_log(&handle.upid, start, limit).await?;
        Ok(entries
            .into_iter()
            .map(|e| LogLine { n: e.n, text: e.t })
            .collect())
    }

    async fn request_cancel(&self, handle: &TaskHandle) -> Result<(), PmxError> {
        self.stop_task(&handle.upid).await
    }
}

// ── Helpers ──────────────────────────────────────────────

fn transport(path: &str, source: reqwest::Error) -> PmxError {
    PmxError::Transport {
        path: path.to_string(),
        source,
    }
}

/// Read the body, turning non-2xx statuses into `Api` errors carrying
/// whatever diagnostic text the server sent.
async fn check(path: &str, resp: reqwest::Response) -> Result<String, PmxError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| transport(path, e))?;
    if !status.is_success() {
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().to_string()
        };
        return Err(PmxError::Api {
            status: status.as_u16(),
            path: path.to_string(),
            message,
        });
    }
    Ok(body)
}

fn decode_body<'a, T: facet::Facet<'a>>(path: &str, body: &'a str) -> Result<T, PmxError> {
    facet_json::from_str_borrowed(body).map_err(|e| PmxError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn decode_upid(path: &str, body: &str) -> Result<Upid, PmxError> {
    let env: StringEnvelope = decode_body(path, body)?;
    env.data.parse()
}
