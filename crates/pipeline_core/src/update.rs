use crate::{AppState, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::LoginClicked => {
            // Overlapping logins are not deduplicated; whichever answer lands last wins.
            state.begin_login();
            vec![Effect::RequestToken {
                credentials: state.credentials().clone(),
            }]
        }
        Msg::LoginSucceeded(credential) => {
            state.complete_login(credential);
            Vec::new()
        }
        Msg::LoginFailed(reason) => {
            // Session is left as it was: a failed re-login keeps the old credential.
            state.fail_login(reason);
            Vec::new()
        }
        Msg::PluginTypeSelected(plugin_type) => {
            if state.form().plugin_type != plugin_type {
                state.form_mut().plugin_type = plugin_type;
            }
            Vec::new()
        }
        Msg::RepoUrlChanged(repo_url) => {
            if state.form().repo_url != repo_url {
                state.form_mut().repo_url = repo_url;
            }
            Vec::new()
        }
        Msg::FileSelected(attachment) => {
            state.form_mut().file = Some(attachment);
            Vec::new()
        }
        Msg::FileCleared => {
            if state.form().file.is_some() {
                state.form_mut().file = None;
            }
            Vec::new()
        }
        Msg::SubmitClicked => match state.session().clone() {
            SessionState::LoggedOut => Vec::new(),
            SessionState::LoggedIn(credential) => {
                let submission = state.form().to_submission();
                state.begin_submit();
                vec![Effect::RunPlugin {
                    credential,
                    submission,
                }]
            }
        },
        Msg::SubmitSucceeded(payload) => {
            state.complete_submit(payload);
            Vec::new()
        }
        Msg::SubmitFailed(reason) => {
            state.fail_submit(reason);
            Vec::new()
        }
        Msg::DownloadClicked => match state.download_link() {
            Some(url) => {
                state.begin_download(&url);
                vec![Effect::DownloadArtifact { url }]
            }
            None => Vec::new(),
        },
        Msg::DownloadFinished(outcome) => {
            state.finish_download(outcome);
            Vec::new()
        }
    };

    (state, effects)
}
