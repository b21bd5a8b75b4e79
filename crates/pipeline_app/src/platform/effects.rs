use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use pipeline_core::{Credential, Effect, Msg, ResultPayload, Submission};
use pipeline_engine::{ApiError, EngineEvent, EngineHandle, PluginRequest, UploadFile};
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};

/// Executes controller effects on the engine and feeds completions back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_loop(msg_tx);
        runner
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RequestToken { credentials } => {
                    pipeline_info!("RequestToken username={}", credentials.username);
                    self.engine
                        .request_token(credentials.username, credentials.password);
                }
                Effect::RunPlugin {
                    credential,
                    submission,
                } => {
                    pipeline_info!(
                        "RunPlugin plugin_type={} has_file={}",
                        submission.plugin_type,
                        submission.file.is_some()
                    );
                    self.engine
                        .run_plugin(credential.token(), map_submission(submission));
                }
                Effect::DownloadArtifact { url } => {
                    pipeline_info!("DownloadArtifact url={}", url);
                    self.engine.download(url);
                }
            }
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let events = self.engine.events();
        thread::spawn(move || loop {
            match events.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if msg_tx.send(map_event(event)).is_err() {
                        // App loop has exited.
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    pipeline_debug!("Engine stopped; event forwarder exiting");
                    break;
                }
            }
        });
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::LoginCompleted(Ok(token)) => {
            Msg::LoginSucceeded(Credential::new(token.access_token, token.token_type))
        }
        EngineEvent::LoginCompleted(Err(err)) => Msg::LoginFailed(failure_reason("Login", &err)),
        EngineEvent::PluginCompleted(Ok(response)) => Msg::SubmitSucceeded(ResultPayload {
            success: response.success,
            download_url: response.download_url,
        }),
        EngineEvent::PluginCompleted(Err(err)) => {
            Msg::SubmitFailed(failure_reason("Plugin run", &err))
        }
        EngineEvent::DownloadCompleted(Ok(artifact)) => {
            pipeline_info!("Artifact saved ({} bytes)", artifact.byte_len);
            Msg::DownloadFinished(Ok(artifact.path))
        }
        EngineEvent::DownloadCompleted(Err(err)) => {
            Msg::DownloadFinished(Err(failure_reason("Download", &err)))
        }
    }
}

fn failure_reason(action: &str, err: &ApiError) -> String {
    pipeline_warn!("{} failed: {}", action, err);
    err.to_string()
}

fn map_submission(submission: Submission) -> PluginRequest {
    PluginRequest {
        plugin_type: submission.plugin_type.as_str().to_string(),
        repo_url: submission.repo_url,
        file: submission.file.map(|file| UploadFile {
            file_name: file.file_name,
            path: file.path,
        }),
    }
}
