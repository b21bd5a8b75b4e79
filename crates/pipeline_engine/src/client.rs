use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::filename::artifact_filename;
use crate::persist::AtomicFileWriter;
use crate::{
    ApiError, DownloadedArtifact, FailureKind, PluginRequest, RunPluginResponse, TokenResponse,
    UploadFile,
};

const TOKEN_PATH: &str = "/token";
const RUN_PLUGIN_PATH: &str = "/run-plugin";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base address, e.g. `http://localhost:8000`, without trailing slash.
    pub origin: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_download_bytes: u64,
    pub output_dir: PathBuf,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            origin: pipeline_core::DEFAULT_API_ORIGIN.to_string(),
            connect_timeout: Duration::from_secs(10),
            // Plugin runs convert files server-side before answering.
            request_timeout: Duration::from_secs(120),
            redirect_limit: 5,
            max_download_bytes: 256 * 1024 * 1024,
            output_dir: PathBuf::from("downloads"),
        }
    }
}

#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    async fn request_token(&self, username: &str, password: &str)
        -> Result<TokenResponse, ApiError>;

    async fn run_plugin(
        &self,
        token: &str,
        request: &PluginRequest,
    ) -> Result<RunPluginResponse, ApiError>;

    async fn download(&self, url: &str) -> Result<DownloadedArtifact, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.settings.origin.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ApiClient for ReqwestApiClient {
    async fn request_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError> {
        let url = self.endpoint(TOKEN_PATH)?;
        pipeline_info!("Requesting token from {} for user {}", url, username);

        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let token: TokenResponse = read_json(ensure_success(response).await?).await?;
        pipeline_debug!(
            "Token acquired: {}",
            pipeline_logging::redact(&token.access_token)
        );
        Ok(token)
    }

    async fn run_plugin(
        &self,
        token: &str,
        request: &PluginRequest,
    ) -> Result<RunPluginResponse, ApiError> {
        let url = self.endpoint(RUN_PLUGIN_PATH)?;
        pipeline_info!(
            "Submitting plugin_type={} repo_url={:?} file={:?} to {}",
            request.plugin_type,
            request.repo_url,
            request.file.as_ref().map(|file| &file.file_name),
            url
        );

        let mut form = Form::new().text("plugin_type", request.plugin_type.clone());
        if let Some(repo_url) = &request.repo_url {
            form = form.text("repo_url", repo_url.clone());
        }
        if let Some(file) = &request.file {
            form = form.part("file", file_part(file).await?);
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        read_json(ensure_success(response).await?).await
    }

    async fn download(&self, url: &str) -> Result<DownloadedArtifact, ApiError> {
        let parsed =
            Url::parse(url).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        pipeline_info!("Downloading artifact from {}", parsed);

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "artifact too large",
                ));
            }
        }

        let disposition = header_string(&response, CONTENT_DISPOSITION);
        let filename = artifact_filename(&parsed, disposition.as_deref());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "artifact too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let writer = AtomicFileWriter::new(self.settings.output_dir.clone());
        let path = writer
            .write(&filename, &bytes)
            .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?;
        pipeline_info!("Saved {} bytes to {:?}", bytes.len(), path);

        Ok(DownloadedArtifact {
            path,
            byte_len: bytes.len() as u64,
        })
    }
}

async fn file_part(file: &UploadFile) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(&file.path).await.map_err(|err| {
        ApiError::new(
            FailureKind::Io,
            format!("cannot read {}: {err}", file.path.display()),
        )
    })?;
    Part::bytes(bytes)
        .file_name(file.file_name.clone())
        .mime_str(guess_mime(&file.path))
        .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if extension.eq_ignore_ascii_case("csv") {
        "text/csv"
    } else {
        "application/octet-stream"
    }
}

fn header_string(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Turns a non-2xx response into an error, using the server's `detail` when present.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_detail(&body).unwrap_or_else(|| status.to_string());
    pipeline_warn!("Request failed with {}: {}", status, message);

    let kind = if status == StatusCode::UNAUTHORIZED {
        FailureKind::Unauthorized
    } else {
        FailureKind::HttpStatus(status.as_u16())
    };
    Err(ApiError::new(kind, message))
}

fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await.map_err(map_reqwest_error)?;
    serde_json::from_str(&body)
        .map_err(|err| ApiError::new(FailureKind::MalformedResponse, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
