use serde_json::Value as JsonValue;

/// Status synthesized for failures that never produced an HTTP response.
pub const NETWORK_FAILURE_STATUS: u16 = 503;

/// Errors surfaced to callers of the gateway and the session client.
///
/// `Clone` because a single refresh outcome fans out to every caller parked
/// behind it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The request requires authentication but no access token is stored.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Transport-level failure; no HTTP status was received.
    #[error("Network failure ({status_code}): {message}")]
    Network { status_code: u16, message: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status_code}: {message}")]
    Http {
        status_code: u16,
        message: String,
        details: Option<JsonValue>,
    },

    /// A response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by the error, synthesized for network failures.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Network { status_code, .. } | Self::Http { status_code, .. } => {
                Some(*status_code)
            }
            Self::Unauthenticated | Self::Decode(_) | Self::Config(_) => None,
        }
    }

    /// `true` for an HTTP 401 answer from the server.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status_code: 401, .. })
    }
}

/// Raw failure reported by a [`RequestExecutor`](crate::RequestExecutor).
///
/// `status_code` is `None` when no HTTP response was received. Converting into
/// [`Error`] is the single place where that distinction becomes a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorFailure {
    pub status_code: Option<u16>,
    pub message: String,
    pub details: Option<JsonValue>,
}

impl ExecutorFailure {
    /// Failure for a request that got an HTTP answer.
    #[must_use]
    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
            details: None,
        }
    }

    /// Failure for a request that never got an HTTP answer.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<ExecutorFailure> for Error {
    fn from(failure: ExecutorFailure) -> Self {
        match failure.status_code {
            Some(status_code) => Self::Http {
                status_code,
                message: failure.message,
                details: failure.details,
            },
            None => Self::Network {
                status_code: NETWORK_FAILURE_STATUS,
                message: failure.message,
            },
        }
    }
}
