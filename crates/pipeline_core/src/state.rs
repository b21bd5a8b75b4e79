use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::origin::ApiOrigin;
use crate::view_model::AppViewModel;

pub const DEFAULT_REPO_URL: &str = "https://github.com/BejaminNaibei/dataset";

/// Backend-interpreted tag selecting which server-side job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginType {
    /// Convert an uploaded CSV file.
    #[default]
    Csv,
    /// Ingest CSV files from a git repository.
    Github,
}

impl PluginType {
    pub const ALL: [PluginType; 2] = [PluginType::Csv, PluginType::Github];

    /// Wire value sent as the `plugin_type` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            PluginType::Csv => "csv",
            PluginType::Github => "github",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PluginType::Csv => "CSV to Excel",
            PluginType::Github => "GitHub Repo",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plugin type {0:?} (expected csv or github)")]
pub struct UnknownPluginType(pub String);

impl FromStr for PluginType {
    type Err = UnknownPluginType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PluginType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownPluginType(trimmed.to_string()))
    }
}

/// Username/password pair sent to the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl Default for LoginCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token held for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    token_type: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>, token_type: Option<String>) -> Self {
        Self {
            token: token.into(),
            token_type,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &format_args!("<redacted len={}>", self.token.len()))
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn(Credential),
}

impl SessionState {
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            SessionState::LoggedOut => None,
            SessionState::LoggedIn(credential) => Some(credential),
        }
    }
}

/// Outcome of the most recent attempt at a network action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationStatus {
    #[default]
    Idle,
    Pending,
    Failed(String),
    Succeeded,
}

impl OperationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, OperationStatus::Pending)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            OperationStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Name reported to the server in the multipart part.
    pub file_name: String,
    pub path: PathBuf,
}

impl FileAttachment {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = file_name_of(&path);
        Self { file_name, path }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "upload".to_string())
}

/// Current values of the submission form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    pub plugin_type: PluginType,
    pub repo_url: String,
    pub file: Option<FileAttachment>,
}

impl FormFields {
    pub fn new(default_repo_url: impl Into<String>) -> Self {
        Self {
            plugin_type: PluginType::default(),
            repo_url: default_repo_url.into(),
            file: None,
        }
    }

    /// Snapshot of the form taken at submit time.
    pub fn to_submission(&self) -> Submission {
        let repo_url = self.repo_url.trim();
        Submission {
            plugin_type: self.plugin_type,
            repo_url: (!repo_url.is_empty()).then(|| repo_url.to_string()),
            file: self.file.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub plugin_type: PluginType,
    pub repo_url: Option<String>,
    pub file: Option<FileAttachment>,
}

/// Response of the plugin endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultPayload {
    pub success: Option<bool>,
    /// Path relative to the API origin.
    pub download_url: Option<String>,
}

impl ResultPayload {
    pub fn download_path(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }
}

/// Values injected into the controller at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub origin: ApiOrigin,
    pub credentials: LoginCredentials,
    pub default_repo_url: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            origin: ApiOrigin::default(),
            credentials: LoginCredentials::default(),
            default_repo_url: DEFAULT_REPO_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    origin: ApiOrigin,
    credentials: LoginCredentials,
    session: SessionState,
    login: OperationStatus,
    form: FormFields,
    submit: OperationStatus,
    result: Option<ResultPayload>,
    download: OperationStatus,
    download_requested: Option<String>,
    saved_artifact: Option<PathBuf>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_config(ControllerConfig::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        Self {
            origin: config.origin,
            credentials: config.credentials,
            session: SessionState::LoggedOut,
            login: OperationStatus::Idle,
            form: FormFields::new(config.default_repo_url),
            submit: OperationStatus::Idle,
            result: None,
            download: OperationStatus::Idle,
            download_requested: None,
            saved_artifact: None,
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        let download_link = self.download_link();

        AppViewModel {
            origin: self.origin.to_string(),
            logged_in: self.session.credential().is_some(),
            token_type: self
                .session
                .credential()
                .and_then(Credential::token_type)
                .map(ToOwned::to_owned),
            login: self.login.clone(),
            submit_enabled: self.can_submit(),
            submit: self.submit.clone(),
            plugin_type: self.form.plugin_type,
            repo_url: self.form.repo_url.clone(),
            file_name: self.form.file.as_ref().map(|file| file.file_name.clone()),
            result: self.result.clone(),
            download_link,
            download: self.download.clone(),
            saved_artifact: self.saved_artifact.clone(),
            dirty: self.dirty,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn form(&self) -> &FormFields {
        &self.form
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.session, SessionState::LoggedIn(_))
    }

    /// Returns whether the state changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn credentials(&self) -> &LoginCredentials {
        &self.credentials
    }

    pub(crate) fn begin_login(&mut self) {
        self.login = OperationStatus::Pending;
        self.mark_dirty();
    }

    pub(crate) fn complete_login(&mut self, credential: Credential) {
        self.session = SessionState::LoggedIn(credential);
        self.login = OperationStatus::Succeeded;
        self.mark_dirty();
    }

    pub(crate) fn fail_login(&mut self, reason: String) {
        self.login = OperationStatus::Failed(reason);
        self.mark_dirty();
    }

    pub(crate) fn form_mut(&mut self) -> &mut FormFields {
        self.mark_dirty();
        &mut self.form
    }

    pub(crate) fn begin_submit(&mut self) {
        self.submit = OperationStatus::Pending;
        self.mark_dirty();
    }

    pub(crate) fn complete_submit(&mut self, payload: ResultPayload) {
        self.result = Some(payload);
        self.submit = OperationStatus::Succeeded;
        // A new result invalidates the previous artifact.
        self.download = OperationStatus::Idle;
        self.saved_artifact = None;
        self.mark_dirty();
    }

    pub(crate) fn fail_submit(&mut self, reason: String) {
        self.submit = OperationStatus::Failed(reason);
        self.mark_dirty();
    }

    pub(crate) fn download_link(&self) -> Option<String> {
        self.result
            .as_ref()
            .and_then(ResultPayload::download_path)
            .map(|path| self.origin.resolve(path))
    }

    pub(crate) fn begin_download(&mut self, url: &str) {
        self.download = OperationStatus::Pending;
        self.download_requested = Some(url.to_string());
        self.mark_dirty();
    }

    /// Ignored when the link has changed since the download was requested.
    pub(crate) fn finish_download(&mut self, outcome: Result<PathBuf, String>) {
        if self.download_requested.is_none() || self.download_requested != self.download_link() {
            return;
        }
        match outcome {
            Ok(path) => {
                self.saved_artifact = Some(path);
                self.download = OperationStatus::Succeeded;
            }
            Err(reason) => {
                self.download = OperationStatus::Failed(reason);
            }
        }
        self.mark_dirty();
    }
}
