use std::path::PathBuf;

use crate::{OperationStatus, PluginType, ResultPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub origin: String,
    pub logged_in: bool,
    pub token_type: Option<String>,
    pub login: OperationStatus,
    /// Submission is only offered with a credential present.
    pub submit_enabled: bool,
    pub submit: OperationStatus,
    pub plugin_type: PluginType,
    pub repo_url: String,
    pub file_name: Option<String>,
    pub result: Option<ResultPayload>,
    /// Absolute address of the generated artifact, if the last result named one.
    pub download_link: Option<String>,
    pub download: OperationStatus,
    pub saved_artifact: Option<PathBuf>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn is_busy(&self) -> bool {
        self.login.is_pending() || self.submit.is_pending() || self.download.is_pending()
    }
}
