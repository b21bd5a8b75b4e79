//! Client configuration: an optional RON file, then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pipeline_core::{
    ApiOrigin, ControllerConfig, LoginCredentials, OriginError, DEFAULT_API_ORIGIN,
    DEFAULT_REPO_URL,
};
use pipeline_engine::ApiSettings;
use pipeline_logging::pipeline_info;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error(transparent)]
    Origin(#[from] OriginError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_origin: String,
    pub username: String,
    pub password: String,
    pub default_repo_url: String,
    pub output_dir: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let credentials = LoginCredentials::default();
        let api = ApiSettings::default();
        Self {
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            username: credentials.username,
            password: credentials.password,
            default_repo_url: DEFAULT_REPO_URL.to_string(),
            output_dir: api.output_dir,
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
            max_download_bytes: api.max_download_bytes,
        }
    }
}

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_origin: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        // Fail early on a bad origin rather than on the first click.
        config.origin()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        pipeline_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(origin) = overrides.api_origin {
            self.api_origin = origin;
        }
        if let Some(username) = overrides.username {
            self.username = username;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
    }

    pub fn origin(&self) -> Result<ApiOrigin, OriginError> {
        ApiOrigin::parse(&self.api_origin)
    }

    pub fn controller_config(&self) -> Result<ControllerConfig, OriginError> {
        Ok(ControllerConfig {
            origin: self.origin()?,
            credentials: LoginCredentials {
                username: self.username.clone(),
                password: self.password.clone(),
            },
            default_repo_url: self.default_repo_url.clone(),
        })
    }

    pub fn api_settings(&self) -> Result<ApiSettings, OriginError> {
        Ok(ApiSettings {
            origin: self.origin()?.to_string(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_download_bytes: self.max_download_bytes,
            output_dir: self.output_dir.clone(),
            ..ApiSettings::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_point_at_local_development_server() {
        let config = AppConfig::default();
        assert_eq!(config.api_origin, "http://localhost:8000");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert_eq!(config.default_repo_url, DEFAULT_REPO_URL);
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn partial_ron_file_fills_remaining_fields_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.ron");
        fs::write(
            &path,
            r#"(api_origin: "https://pipeline.example.com/", username: "ops")"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.username, "ops");
        assert_eq!(config.password, "secret");
        assert_eq!(
            config.api_settings().unwrap().origin,
            "https://pipeline.example.com"
        );
    }

    #[test]
    fn overrides_win_over_file_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.ron");
        fs::write(&path, r#"(username: "ops", password: "file")"#).unwrap();

        let config = AppConfig::load(
            Some(&path),
            ConfigOverrides {
                password: Some("cli".to_string()),
                api_origin: Some("http://127.0.0.1:9000".to_string()),
                ..ConfigOverrides::default()
            },
        )
        .unwrap();

        let controller = config.controller_config().unwrap();
        assert_eq!(controller.credentials.username, "ops");
        assert_eq!(controller.credentials.password, "cli");
        assert_eq!(controller.origin.as_str(), "http://127.0.0.1:9000");
    }

    #[test]
    fn invalid_origin_is_rejected_at_load() {
        let err = AppConfig::load(
            None,
            ConfigOverrides {
                api_origin: Some("localhost:8000".to_string()),
                ..ConfigOverrides::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Origin(_)));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.ron");
        fs::write(&path, "(username: ").unwrap();

        let err = AppConfig::load(Some(&path), ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
