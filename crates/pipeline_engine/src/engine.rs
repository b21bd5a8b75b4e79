use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pipeline_logging::{pipeline_debug, pipeline_error};

use crate::client::{ApiClient, ApiSettings, ReqwestApiClient};
use crate::{ApiError, EngineEvent, FailureKind, PluginRequest};

enum EngineCommand {
    RequestToken { username: String, password: String },
    RunPlugin { token: String, request: PluginRequest },
    Download { url: String },
}

#[derive(Debug, Clone, Copy)]
enum CommandKind {
    Login,
    Plugin,
    Download,
}

impl EngineCommand {
    fn kind(&self) -> CommandKind {
        match self {
            EngineCommand::RequestToken { .. } => CommandKind::Login,
            EngineCommand::RunPlugin { .. } => CommandKind::Plugin,
            EngineCommand::Download { .. } => CommandKind::Download,
        }
    }
}

impl CommandKind {
    fn failed(self, err: ApiError) -> EngineEvent {
        match self {
            CommandKind::Login => EngineEvent::LoginCompleted(Err(err)),
            CommandKind::Plugin => EngineEvent::PluginCompleted(Err(err)),
            CommandKind::Download => EngineEvent::DownloadCompleted(Err(err)),
        }
    }
}

/// Handle to the background thread that performs API calls.
///
/// Commands are executed concurrently and never cancelled; completions are
/// delivered in the order they finish. The engine thread and its runtime
/// shut down once every handle is dropped.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    events: EngineEvents,
}

/// Receiving side of the engine's completions. Does not keep the engine alive.
#[derive(Clone)]
pub struct EngineEvents {
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineEvents {
    /// `Err(Disconnected)` once the engine has stopped and every event was received.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.event_rx
            .lock()
            .map_err(|_| RecvTimeoutError::Disconnected)?
            .recv_timeout(timeout)
    }
}

impl EngineHandle {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = ReqwestApiClient::new(settings)?;
        Self::with_client(Arc::new(client))
    }

    pub fn with_client(client: Arc<dyn ApiClient>) -> Result<Self, ApiError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("pipeline-engine")
            .build()
            .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?;

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let client = client.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let kind = command.kind();
                    let event = match tokio::spawn(execute(client, command)).await {
                        Ok(event) => event,
                        Err(err) => {
                            pipeline_error!("{:?} request aborted: {}", kind, err);
                            kind.failed(ApiError::new(
                                FailureKind::Network,
                                format!("request aborted: {err}"),
                            ))
                        }
                    };
                    let _ = event_tx.send(event);
                });
            }
            pipeline_debug!("Engine command channel closed");
        });

        Ok(Self {
            cmd_tx,
            events: EngineEvents {
                event_rx: Arc::new(Mutex::new(event_rx)),
            },
        })
    }

    pub fn request_token(&self, username: impl Into<String>, password: impl Into<String>) {
        self.send(EngineCommand::RequestToken {
            username: username.into(),
            password: password.into(),
        });
    }

    pub fn run_plugin(&self, token: impl Into<String>, request: PluginRequest) {
        self.send(EngineCommand::RunPlugin {
            token: token.into(),
            request,
        });
    }

    pub fn download(&self, url: impl Into<String>) {
        self.send(EngineCommand::Download { url: url.into() });
    }

    pub fn events(&self) -> EngineEvents {
        self.events.clone()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            pipeline_error!("Engine thread is gone; command dropped");
        }
    }
}

async fn execute(client: Arc<dyn ApiClient>, command: EngineCommand) -> EngineEvent {
    match command {
        EngineCommand::RequestToken { username, password } => {
            EngineEvent::LoginCompleted(client.request_token(&username, &password).await)
        }
        EngineCommand::RunPlugin { token, request } => {
            EngineEvent::PluginCompleted(client.run_plugin(&token, &request).await)
        }
        EngineCommand::Download { url } => {
            EngineEvent::DownloadCompleted(client.download(&url).await)
        }
    }
}
