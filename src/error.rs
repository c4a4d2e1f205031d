//! Error taxonomy for the resolution pipeline.
//!
//! Every variant is recoverable at the orchestration level: the current
//! strategy is abandoned and the next one is attempted. Only exhaustion of
//! every strategy leads to the fallback path, which cannot fail.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Request rejected before a response arrived, or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Response body was not the JSON we expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// Candidate year mismatch or historically implausible content.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Strategy produced zero candidates.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ResolveError {
    pub fn timeout(what: &str, after: Duration) -> Self {
        ResolveError::Network(format!("{what} timed out after {}ms", after.as_millis()))
    }

    /// Short label used for metrics and the call log.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Network(_) => "network",
            ResolveError::UpstreamStatus { .. } => "status",
            ResolveError::Parse(_) => "parse",
            ResolveError::Validation(_) => "validation",
            ResolveError::NotFound(_) => "not_found",
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ResolveError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            ResolveError::UpstreamStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            ResolveError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self {
        ResolveError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_a_network_error() {
        let e = ResolveError::timeout("summary", Duration::from_millis(1500));
        assert_eq!(e.kind(), "network");
        assert!(e.to_string().contains("1500ms"));
    }

    #[test]
    fn json_errors_map_to_parse() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let e: ResolveError = err.into();
        assert_eq!(e.kind(), "parse");
    }
}
