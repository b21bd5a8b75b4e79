use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{anyhow, bail, Context, Result};
use pipeline_core::{
    update, AppState, ControllerConfig, FileAttachment, Msg, OperationStatus,
    PluginType,
};
use pipeline_engine::EngineHandle;
use pipeline_logging::pipeline_debug;

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::ui;
use super::ui::commands::Command;

/// Form values for a one-shot run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub plugin_type: PluginType,
    /// `None` keeps the configured default URL.
    pub repo_url: Option<String>,
    pub file: Option<PathBuf>,
    pub download: bool,
}

/// Owns the controller state and the single loop that updates it.
pub struct App<W: Write> {
    state: AppState,
    msg_rx: mpsc::Receiver<Msg>,
    effects: EffectRunner,
    out: W,
}

impl<W: Write> App<W> {
    pub fn new(config: &AppConfig, out: W) -> Result<Self> {
        let engine = EngineHandle::new(config.api_settings()?)
            .map_err(|err| anyhow!("failed to start engine: {err}"))?;
        Ok(Self::with_engine(config.controller_config()?, engine, out))
    }

    pub fn with_engine(config: ControllerConfig, engine: EngineHandle, out: W) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
        Self {
            state: AppState::with_config(config),
            msg_rx,
            effects: EffectRunner::new(engine, msg_tx),
            out,
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> pipeline_core::AppViewModel {
        self.state.view()
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    fn dispatch(&mut self, msg: Msg) {
        pipeline_debug!("dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.effects.enqueue(effects);
    }

    /// Blocks until no network action is pending.
    fn settle(&mut self) -> Result<()> {
        while self.state.view().is_busy() {
            let msg = self
                .msg_rx
                .recv()
                .context("engine stopped before answering")?;
            self.dispatch(msg);
        }
        Ok(())
    }

    fn render_if_dirty(&mut self) -> Result<()> {
        if self.state.consume_dirty() {
            self.render()?;
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let view = self.state.view();
        for line in ui::render::render(&view) {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// Reads commands line by line; each network action completes before the next prompt.
    pub fn run_interactive(&mut self, input: impl BufRead) -> Result<()> {
        writeln!(self.out, "Run Data Pipeline (type `help` for commands)")?;
        self.render()?;
        self.prompt()?;

        for line in input.lines() {
            let line = line.context("failed to read command")?;
            match ui::commands::parse_command(&line) {
                Ok(None) => {}
                Ok(Some(Command::Dispatch(msg))) => {
                    let hint = self.unavailable_hint(&msg);
                    self.dispatch(msg);
                    self.settle()?;
                    if let Some(hint) = hint {
                        writeln!(self.out, "{hint}")?;
                    }
                    self.render_if_dirty()?;
                }
                Ok(Some(Command::Show)) => self.render()?,
                Ok(Some(Command::Help)) => writeln!(self.out, "{}", ui::commands::HELP)?,
                Ok(Some(Command::Quit)) => break,
                Err(err) => writeln!(self.out, "error: {err}")?,
            }
            self.prompt()?;
        }
        Ok(())
    }

    /// Explains why an action the controller will ignore has no effect.
    fn unavailable_hint(&self, msg: &Msg) -> Option<&'static str> {
        match msg {
            Msg::SubmitClicked if !self.state.can_submit() => {
                Some("Run Plugin is disabled until you log in.")
            }
            Msg::DownloadClicked if self.state.view().download_link.is_none() => {
                Some("No download link yet; run a plugin that returns one first.")
            }
            _ => None,
        }
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }

    /// Login, submit, and optionally download; stops at the first failed step.
    pub fn run_batch(&mut self, plan: BatchPlan) -> Result<()> {
        self.dispatch(Msg::LoginClicked);
        self.settle()?;
        if let OperationStatus::Failed(reason) = self.state.view().login {
            bail!("login failed: {reason}");
        }

        self.dispatch(Msg::PluginTypeSelected(plan.plugin_type));
        if let Some(repo_url) = plan.repo_url {
            self.dispatch(Msg::RepoUrlChanged(repo_url));
        }
        if let Some(file) = plan.file {
            self.dispatch(Msg::FileSelected(FileAttachment::from_path(file)));
        }
        self.dispatch(Msg::SubmitClicked);
        self.settle()?;
        let view = self.state.view();
        if let OperationStatus::Failed(reason) = view.submit {
            bail!("plugin run failed: {reason}");
        }

        if plan.download {
            if view.download_link.is_none() {
                self.render()?;
                bail!("the server returned no download_url");
            }
            self.dispatch(Msg::DownloadClicked);
            self.settle()?;
            if let OperationStatus::Failed(reason) = self.state.view().download {
                bail!("download failed: {reason}");
            }
        }

        self.render()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use pipeline_engine::{
        ApiClient, ApiError, DownloadedArtifact, PluginRequest, RunPluginResponse, TokenResponse,
    };
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Client whose token call panics mid-request.
    struct BrokenTokenClient;

    #[async_trait::async_trait]
    impl ApiClient for BrokenTokenClient {
        async fn request_token(
            &self,
            _username: &str,
            _password: &str,
        ) -> Result<TokenResponse, ApiError> {
            panic!("token client crashed");
        }

        async fn run_plugin(
            &self,
            _token: &str,
            _request: &PluginRequest,
        ) -> Result<RunPluginResponse, ApiError> {
            Ok(RunPluginResponse::default())
        }

        async fn download(&self, _url: &str) -> Result<DownloadedArtifact, ApiError> {
            unreachable!("no link is ever produced")
        }
    }

    struct Harness {
        server: MockServer,
        temp: TempDir,
        runtime: tokio::runtime::Runtime,
    }

    impl Harness {
        fn start() -> Self {
            pipeline_logging::initialize_for_tests();
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let server = runtime.block_on(MockServer::start());
            Self {
                server,
                temp: TempDir::new().unwrap(),
                runtime,
            }
        }

        fn mount(&self, mock: Mock) {
            self.runtime.block_on(mock.mount(&self.server));
        }

        fn app(&self) -> App<Vec<u8>> {
            let config = AppConfig {
                api_origin: self.server.uri(),
                output_dir: self.temp.path().join("downloads"),
                ..AppConfig::default()
            };
            App::new(&config, Vec::new()).unwrap()
        }
    }

    fn token_mock() -> Mock {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc",
                "token_type": "bearer"
            })))
    }

    #[test]
    fn batch_run_logs_in_submits_and_downloads() {
        let harness = Harness::start();
        harness.mount(token_mock());
        harness.mount(
            Mock::given(method("POST"))
                .and(path("/run-plugin"))
                .and(header("authorization", "Bearer abc"))
                .and(body_string_contains("name,age"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "success": true,
                    "download_url": "/download/result.xlsx"
                }))),
        );
        harness.mount(
            Mock::given(method("GET"))
                .and(path("/download/result.xlsx"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"xlsx".to_vec())),
        );

        let csv = harness.temp.path().join("people.csv");
        fs::write(&csv, "name,age\nAlice,30").unwrap();

        let mut app = harness.app();
        app.run_batch(BatchPlan {
            plugin_type: PluginType::Csv,
            repo_url: None,
            file: Some(csv),
            download: true,
        })
        .unwrap();

        let view = app.view();
        assert_eq!(
            view.download_link,
            Some(format!("{}/download/result.xlsx", harness.server.uri()))
        );
        let saved = harness.temp.path().join("downloads").join("result.xlsx");
        assert_eq!(view.saved_artifact.as_deref(), Some(saved.as_path()));
        assert_eq!(fs::read(saved).unwrap(), b"xlsx");

        let output = String::from_utf8(app.into_output()).unwrap();
        assert!(output.contains("Download Result:"));
    }

    #[test]
    fn batch_run_stops_when_login_is_rejected() {
        let harness = Harness::start();
        harness.mount(
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "detail": "Incorrect username or password"
                }))),
        );
        harness.mount(
            Mock::given(method("POST"))
                .and(path("/run-plugin"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0),
        );

        let mut app = harness.app();
        let err = app
            .run_batch(BatchPlan {
                plugin_type: PluginType::Github,
                repo_url: Some("https://github.com/acme/data".to_string()),
                file: None,
                download: false,
            })
            .unwrap_err();

        assert!(err.to_string().contains("Incorrect username or password"));
        let view = app.view();
        assert!(!view.logged_in);
        assert!(!view.submit_enabled);
    }

    #[test]
    fn interactive_session_gates_submit_on_login() {
        let harness = Harness::start();
        harness.mount(token_mock());
        harness.mount(
            Mock::given(method("POST"))
                .and(path("/run-plugin"))
                .and(body_string_contains("https://github.com/acme/data"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "success": true
                })))
                .expect(1),
        );

        let script = "submit\nlogin\ntype github\nurl https://github.com/acme/data\nsubmit\nbogus\nquit\nsubmit\n";
        let mut app = harness.app();
        app.run_interactive(Cursor::new(script)).unwrap();

        let view = app.view();
        assert!(view.logged_in);
        assert_eq!(view.submit, OperationStatus::Succeeded);
        assert_eq!(view.download_link, None);

        let output = String::from_utf8(app.into_output()).unwrap();
        assert!(output.contains("Run Plugin is disabled until you log in."));
        assert!(output.contains("Session: logged in (bearer)"));
        assert!(output.contains("error: unknown command \"bogus\""));
    }

    #[test]
    fn crashed_login_is_reported_and_app_shutdown_releases_the_engine() {
        pipeline_logging::initialize_for_tests();
        let client = Arc::new(BrokenTokenClient);
        let engine = EngineHandle::with_client(client.clone()).unwrap();
        let mut app = App::with_engine(ControllerConfig::default(), engine, Vec::new());

        app.run_interactive(Cursor::new("login\nquit\n")).unwrap();

        let view = app.view();
        assert!(!view.logged_in);
        assert!(view.login.failure().is_some_and(|reason| reason.contains("aborted")));

        drop(app);
        let deadline = Instant::now() + Duration::from_secs(5);
        while Arc::strong_count(&client) > 1 {
            assert!(Instant::now() < deadline, "engine outlived the app");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn download_without_a_link_explains_itself() {
        let harness = Harness::start();
        let mut app = harness.app();

        app.run_interactive(Cursor::new("download\nquit\n")).unwrap();

        let output = String::from_utf8(app.into_output()).unwrap();
        assert!(output.contains("No download link yet"));
    }
}
