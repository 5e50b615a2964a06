use std::path::{Path, PathBuf};

use facet::Facet;

use crate::cli::ConnectArgs;
use crate::error::PmxError;

pub const API_URL_SUFFIX: &str = "/api2/json";

const DEFAULT_SCHEME: &str = "https";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8006;
const DEFAULT_REALM: &str = "pam";

/// Connection defaults read from `pmx.toml`. Every field is optional;
/// CLI flags and `PVE_*` environment variables take precedence.
#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct FileConfig {
    #[facet(default)]
    pub url: String,
    #[facet(default)]
    pub host: String,
    #[facet(default)]
    pub port: u16,
    #[facet(default)]
    pub scheme: String,
    #[facet(default)]
    pub user: String,
    #[facet(default)]
    pub password: String,
    #[facet(default)]
    pub realm: String,
    #[facet(default)]
    pub insecure: bool,
}

/// Load `pmx.toml` from an explicit path or the default location.
///
/// An explicit `--config` path must exist; the default path is allowed to
/// be absent (all defaults then come from flags/env).
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, PmxError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path(), false),
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(e) => {
            return Err(PmxError::ConfigLoad {
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    facet_toml::from_str(&content).map_err(|e| PmxError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pmx")
        .join("pmx.toml")
}

// ── Connection ───────────────────────────────────────────

/// Fully resolved connection settings, built once before any API call.
#[derive(Debug, Clone)]
pub struct Connection {
    pub api_url: String,
    pub user: String,
    pub password: String,
    pub realm: String,
    pub insecure: bool,
}

impl Connection {
    /// Merge CLI flags over file config over built-in defaults.
    pub fn resolve(args: &ConnectArgs, file: &FileConfig) -> Result<Self, PmxError> {
        let user = pick(args.user.as_deref(), &file.user).ok_or_else(|| PmxError::Validation {
            message: "no username given (use --user or PVE_USER)".into(),
        })?;
        let password =
            pick(args.password.as_deref(), &file.password).ok_or_else(|| PmxError::Validation {
                message: "no password given (use --password or PVE_PASSWORD)".into(),
            })?;
        let realm = pick(args.realm.as_deref(), &file.realm).unwrap_or_else(|| DEFAULT_REALM.into());

        let api_url = match pick(args.url.as_deref(), &file.url) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let scheme =
                    pick(args.scheme.as_deref(), &file.scheme).unwrap_or_else(|| DEFAULT_SCHEME.into());
                if scheme != "http" && scheme != "https" {
                    return Err(PmxError::Validation {
                        message: format!("scheme must be http or https, got '{scheme}'"),
                    });
                }
                let host = pick(args.host.as_deref(), &file.host).unwrap_or_else(|| DEFAULT_HOST.into());
                let port = args
                    .port
                    .or_else(|| (file.port != 0).then_some(file.port))
                    .unwrap_or(DEFAULT_PORT);
                format!("{scheme}://{host}:{port}{API_URL_SUFFIX}")
            }
        };

        Ok(Connection {
            api_url,
            user,
            password,
            realm,
            insecure: args.insecure || file.insecure,
        })
    }

    /// Username in the `user@realm` form the ticket endpoint expects.
    pub fn login_name(&self) -> String {
        format!("{}@{}", self.user, self.realm)
    }
}

/// First non-empty value wins: CLI flag, then file entry.
fn pick(flag: Option<&str>, file: &str) -> Option<String> {
    match flag {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ if !file.is_empty() => Some(file.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConnectArgs {
        ConnectArgs {
            url: None,
            host: None,
            port: None,
            scheme: None,
            user: Some("root".into()),
            password: Some("secret".into()),
            realm: None,
            insecure: false,
        }
    }

    #[test]
    fn url_built_from_parts() {
        let mut a = args();
        a.host = Some("pve1.example.net".into());
        a.port = Some(8006);
        let conn = Connection::resolve(&a, &FileConfig::default()).unwrap();
        assert_eq!(conn.api_url, "https://pve1.example.net:8006/api2/json");
        assert_eq!(conn.login_name(), "root@pam");
    }

    #[test]
    fn explicit_url_wins_over_parts() {
        let mut a = args();
        a.url = Some("https://10.0.0.1:8006/api2/json".into());
        a.host = Some("ignored".into());
        let conn = Connection::resolve(&a, &FileConfig::default()).unwrap();
        assert_eq!(conn.api_url, "https://10.0.0.1:8006/api2/json");
    }

    #[test]
    fn file_fills_in_missing_flags() {
        let file: FileConfig = facet_toml::from_str(
            r#"
host = "pve2"
realm = "pve"
insecure = true
"#,
        )
        .unwrap();
        let conn = Connection::resolve(&args(), &file).unwrap();
        assert_eq!(conn.api_url, "https://pve2:8006/api2/json");
        assert_eq!(conn.realm, "pve");
        assert!(conn.insecure);
    }

    #[test]
    fn missing_user_is_rejected() {
        let mut a = args();
        a.user = None;
        let err = Connection::resolve(&a, &FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn bad_scheme_is_rejected() {
        let mut a = args();
        a.scheme = Some("ftp".into());
        assert!(Connection::resolve(&a, &FileConfig::default()).is_err());
    }
}
