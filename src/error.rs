use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PmxError {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("api returned {status} for {path}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    #[error("failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("malformed UPID '{upid}'")]
    MalformedUpid { upid: String },

    #[error("no vm with id found: {vmid}")]
    VmNotFound { vmid: u64 },

    #[error("vm {vmid} is currently {status}")]
    StateConflict { vmid: u64, status: String },

    #[error("task has no log output after {attempts} attempts")]
    NoLogAvailable { attempts: u32 },

    #[error("task observation failed")]
    Observation {
        #[source]
        source: Box<PmxError>,
    },

    #[error("task {upid} failed: {exit_status}")]
    TaskFailed { upid: String, exit_status: String },
}

impl PmxError {
    /// Wrap a transport-layer failure that interrupted task observation.
    pub fn observation(source: PmxError) -> Self {
        PmxError::Observation {
            source: Box::new(source),
        }
    }
}
