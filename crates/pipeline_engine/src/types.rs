use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Body of a successful `POST /token`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &pipeline_logging::redact(&self.access_token))
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Body of a successful `POST /run-plugin`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RunPluginResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// Fields of the multipart job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRequest {
    pub plugin_type: String,
    pub repo_url: Option<String>,
    pub file: Option<UploadFile>,
}

/// An artifact saved under the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    LoginCompleted(Result<TokenResponse, ApiError>),
    PluginCompleted(Result<RunPluginResponse, ApiError>),
    DownloadCompleted(Result<DownloadedArtifact, ApiError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidRequest,
    HttpStatus(u16),
    Unauthorized,
    Timeout,
    Network,
    MalformedResponse,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
