use crate::{Credential, LoginCredentials, Submission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestToken { credentials: LoginCredentials },
    RunPlugin {
        credential: Credential,
        submission: Submission,
    },
    /// `url` is already resolved against the API origin.
    DownloadArtifact { url: String },
}
