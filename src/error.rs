//! Crate error type and the connectivity classifier used by the fallback policy.

use serde_json::Value;

/// Words that mark a failure as "the origin never answered".
const CONNECTIVITY_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "network",
    "connection",
    "connect",
    "fetch",
    "failed",
    "refused",
    "reset",
    "dns",
    "unreachable",
];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timeout after {ms}ms")]
    Timeout { ms: u64 },
    #[error("network error: {message}")]
    Transport {
        message: String,
        /// Set when the request provably never produced a response.
        no_response: bool,
    },
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: Value,
    },
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status carried by the error, if the origin answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error body of an HTTP failure.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Error::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // A reqwest error out of `send()` never carries a response; `status()` is
        // only populated by `error_for_status`, which this crate does not use.
        Error::Transport {
            no_response: e.status().is_none(),
            message: e.to_string(),
        }
    }
}

/// True when `err` means the origin was unreachable rather than that it answered.
///
/// Conditions, all enumerated here so a transport can supply a sharper signal:
/// the error carries no HTTP status, and it is either a deadline expiry, a
/// transport error flagged `no_response`, or its message contains one of
/// [`CONNECTIVITY_MARKERS`].
pub fn is_connectivity_failure(err: &Error) -> bool {
    if err.status().is_some() {
        return false;
    }
    match err {
        Error::Timeout { .. } => true,
        Error::Transport { no_response: true, .. } => true,
        Error::Transport { message, .. } => {
            let msg = message.to_lowercase();
            CONNECTIVITY_MARKERS.iter().any(|m| msg.contains(m))
        }
        _ => false,
    }
}
