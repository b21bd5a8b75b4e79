//! Pipeline engine: HTTP client for the pipeline API and effect execution.
mod client;
mod engine;
mod filename;
mod persist;
mod types;

pub use client::{ApiClient, ApiSettings, ReqwestApiClient};
pub use engine::{EngineEvents, EngineHandle};
pub use filename::{artifact_filename, content_disposition_filename};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{
    ApiError, DownloadedArtifact, EngineEvent, FailureKind, PluginRequest, RunPluginResponse,
    TokenResponse, UploadFile,
};
