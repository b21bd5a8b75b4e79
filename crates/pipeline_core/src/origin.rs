use std::fmt;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_ORIGIN: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("invalid api origin {input:?}: {reason}")]
    Parse { input: String, reason: String },
    #[error("api origin must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("api origin {0:?} has no host")]
    MissingHost(String),
}

/// Base address of the remote API, without a trailing slash.
///
/// Every endpoint and every download link is built by appending a
/// server-relative path to this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOrigin(String);

impl ApiOrigin {
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let trimmed = input.trim();
        let mut url = Url::parse(trimmed).map_err(|err| OriginError::Parse {
            input: trimmed.to_string(),
            reason: err.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(OriginError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none() {
            return Err(OriginError::MissingHost(trimmed.to_string()));
        }

        url.set_query(None);
        url.set_fragment(None);
        Ok(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a server-relative path to the origin.
    ///
    /// This is plain concatenation; a missing leading slash is supplied so
    /// `download/x.zip` and `/download/x.zip` resolve the same way.
    pub fn resolve(&self, relative: &str) -> String {
        if relative.starts_with('/') {
            format!("{}{}", self.0, relative)
        } else {
            format!("{}/{}", self.0, relative)
        }
    }
}

impl Default for ApiOrigin {
    fn default() -> Self {
        Self(DEFAULT_API_ORIGIN.to_string())
    }
}

impl fmt::Display for ApiOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_trailing_slash_and_query() {
        let origin = ApiOrigin::parse(" http://localhost:8000/?x=1 ").unwrap();
        assert_eq!(origin.as_str(), "http://localhost:8000");
    }

    #[test]
    fn parse_keeps_path_prefix() {
        let origin = ApiOrigin::parse("https://api.example.com/pipeline/").unwrap();
        assert_eq!(origin.resolve("/token"), "https://api.example.com/pipeline/token");
    }

    #[test]
    fn parse_rejects_non_http_schemes() {
        assert_eq!(
            ApiOrigin::parse("ftp://example.com"),
            Err(OriginError::UnsupportedScheme("ftp".to_string()))
        );
        assert!(matches!(
            ApiOrigin::parse("not a url"),
            Err(OriginError::Parse { .. })
        ));
    }

    #[test]
    fn resolve_supplies_missing_slash() {
        let origin = ApiOrigin::default();
        assert_eq!(
            origin.resolve("download/a.zip"),
            "http://localhost:8000/download/a.zip"
        );
    }
}
