use std::path::PathBuf;

use crate::{Credential, FileAttachment, PluginType, ResultPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User clicked Login.
    LoginClicked,
    /// Token endpoint answered with a credential.
    LoginSucceeded(Credential),
    /// Token request failed; carries a user-facing reason.
    LoginFailed(String),
    /// User picked a plugin in the selector.
    PluginTypeSelected(PluginType),
    /// User edited the repository URL field.
    RepoUrlChanged(String),
    /// User attached a file.
    FileSelected(FileAttachment),
    /// User removed the attached file.
    FileCleared,
    /// User submitted the form.
    SubmitClicked,
    /// Plugin endpoint answered.
    SubmitSucceeded(ResultPayload),
    SubmitFailed(String),
    /// User followed the download link.
    DownloadClicked,
    /// Artifact was saved to the given path, or failed.
    DownloadFinished(Result<PathBuf, String>),
}
