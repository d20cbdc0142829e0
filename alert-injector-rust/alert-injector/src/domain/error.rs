use std::fmt;
use std::time::Duration;

/// Main error type for the alert injector
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTestError {
    // Network errors talking to any endpoint
    Transport(String),

    // Endpoint answered, but not with 200/202
    UnexpectedStatus { url: String, status: u16 },

    // Bad input caught before any request is sent
    InvalidConfig(String),

    // Alert payload could not be parsed
    Decode(String),

    // Verification errors
    AlertNotFound(String),
    LabelMismatch {
        alert: String,
        key: String,
        expected: String,
        actual: Option<String>,
    },
    MissingAnnotation { alert: String, key: String },
    Timeout {
        alert: String,
        waited: Duration,
        last_query_error: Option<String>,
    },

    // Generic errors
    Generic(String),
}

impl fmt::Display for AlertTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertTestError::Transport(msg) => write!(f, "Transport error: {msg}"),
            AlertTestError::UnexpectedStatus { url, status } => {
                write!(f, "Unexpected status {status} from {url}")
            }
            AlertTestError::InvalidConfig(msg) => write!(f, "Configuration error: {msg}"),
            AlertTestError::Decode(msg) => write!(f, "Decode error: {msg}"),
            AlertTestError::AlertNotFound(alert) => write!(f, "Alert '{alert}' not found"),
            AlertTestError::LabelMismatch {
                alert,
                key,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(
                    f,
                    "Label mismatch on '{alert}': {key}={actual}, expected {expected}"
                ),
                None => write!(
                    f,
                    "Label mismatch on '{alert}': {key} missing, expected {expected}"
                ),
            },
            AlertTestError::MissingAnnotation { alert, key } => {
                write!(f, "Missing annotation on '{alert}': {key}")
            }
            AlertTestError::Timeout {
                alert,
                waited,
                last_query_error,
            } => {
                write!(
                    f,
                    "Alert '{alert}' did not fire within {}s",
                    waited.as_secs()
                )?;
                if let Some(err) = last_query_error {
                    write!(f, " (last query failed: {err})")?;
                }
                Ok(())
            }
            AlertTestError::Generic(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for AlertTestError {}

impl AlertTestError {
    /// True for failures that happened before the endpoint produced any answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, AlertTestError::Transport(_))
    }
}

impl From<reqwest::Error> for AlertTestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AlertTestError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return AlertTestError::UnexpectedStatus {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            };
        }
        AlertTestError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AlertTestError {
    fn from(err: serde_json::Error) -> Self {
        AlertTestError::Decode(err.to_string())
    }
}

impl From<anyhow::Error> for AlertTestError {
    fn from(err: anyhow::Error) -> Self {
        AlertTestError::Generic(err.to_string())
    }
}

impl From<std::io::Error> for AlertTestError {
    fn from(err: std::io::Error) -> Self {
        AlertTestError::Generic(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AlertTestError>;
