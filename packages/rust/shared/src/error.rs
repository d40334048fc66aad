//! Error types for LLMO Writer.
//!
//! Library crates use [`LlmoError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Longest slice of a non-JSON error body carried in the message.
const BODY_EXCERPT_CHARS: usize = 300;

/// Top-level error type for all LLMO operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmoError {
    /// Configuration loading or API key resolution failed. Fatal at startup.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required user-supplied field was empty or out of range.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Transport, HTTP, or timeout failure talking to the model provider.
    #[error("provider error: {message}{}", http_suffix(.status))]
    Provider {
        message: String,
        /// HTTP status when the server answered.
        status: Option<u16>,
        /// Raw response body, kept for diagnostics.
        body: Option<String>,
    },

    /// The provider answered successfully but produced no text.
    #[error("the model returned an empty response")]
    EmptyResponse,

    /// No line of a title-generation response had an ordinal marker.
    #[error("no numbered titles could be parsed from the model response")]
    NoTitlesParsed,

    /// The requested title is not among the current candidates.
    #[error("'{title}' is not one of the current title candidates")]
    InvalidSelection { title: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn rejection_reason(body: &str) -> Option<String> {
    let from_envelope = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string));
    if let Some(reason) = from_envelope.filter(|r| !r.trim().is_empty()) {
        return Some(reason.trim().to_string());
    }

    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }
    if flat.chars().count() > BODY_EXCERPT_CHARS {
        let cut: String = flat.chars().take(BODY_EXCERPT_CHARS).collect();
        return Some(format!("{cut}…"));
    }
    Some(flat)
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LlmoError>;

/// How a front end should surface an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// User mistake; shown as a warning, nothing changed.
    Warning,
    /// The request failed; shown as an error, nothing changed.
    Error,
    /// The session cannot continue.
    Fatal,
}

impl LlmoError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-input error from any displayable message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Create a provider error for failures without an HTTP response.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider {
            message: msg.into(),
            status: None,
            body: None,
        }
    }

    /// Create a provider error for a non-success HTTP response.
    ///
    /// The message carries the API's `error.message` when the body is a JSON
    /// error envelope, otherwise an excerpt of the raw body.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = match rejection_reason(&body) {
            Some(reason) => format!("request rejected: {reason}"),
            None => "request rejected".to_string(),
        };
        Self::Provider {
            message,
            status: Some(status),
            body: Some(body),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Config { .. } => Severity::Fatal,
            Self::InvalidInput { .. } | Self::InvalidSelection { .. } => Severity::Warning,
            Self::Provider { .. }
            | Self::EmptyResponse
            | Self::NoTitlesParsed
            | Self::Io { .. } => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LlmoError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = LlmoError::invalid_input("keywords are empty");
        assert!(err.to_string().contains("keywords are empty"));
    }

    #[test]
    fn provider_error_includes_status() {
        let err = LlmoError::http(503, "overloaded");
        assert_eq!(err.to_string(), "provider error: request rejected: overloaded (HTTP 503)");

        let err = LlmoError::http(502, "  ");
        assert_eq!(err.to_string(), "provider error: request rejected (HTTP 502)");

        let err = LlmoError::provider("timed out");
        assert_eq!(err.to_string(), "provider error: timed out");
    }

    #[test]
    fn http_error_surfaces_api_reason() {
        let body = r#"{"error":{
            "code":400,
            "message":"API key not valid. Please pass a valid API key.",
            "status":"INVALID_ARGUMENT"
        }}"#;
        let err = LlmoError::http(400, body);
        let shown = err.to_string();
        assert!(shown.contains("API key not valid"));
        assert!(shown.ends_with("(HTTP 400)"));
        assert!(!shown.contains("INVALID_ARGUMENT"));

        match err {
            LlmoError::Provider { body: Some(raw), .. } => assert_eq!(raw, body),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn long_plain_body_is_truncated() {
        let err = LlmoError::http(500, "x".repeat(1000));
        let shown = err.to_string();
        assert!(shown.contains('…'));
        assert!(shown.len() < 400);
    }

    #[test]
    fn severity_classification() {
        assert_eq!(LlmoError::config("x").severity(), Severity::Fatal);
        assert_eq!(LlmoError::invalid_input("x").severity(), Severity::Warning);
        assert_eq!(
            LlmoError::InvalidSelection { title: "x".into() }.severity(),
            Severity::Warning
        );
        assert_eq!(LlmoError::EmptyResponse.severity(), Severity::Error);
        assert_eq!(LlmoError::NoTitlesParsed.severity(), Severity::Error);
    }
}
