use protocol::{EnvelopeError, SseError};

/// Message shown when the backend rejects the stored credential.
pub const SESSION_EXPIRED_MESSAGE: &str = "session expired, please log in again";

const NETWORK_MESSAGE: &str = "network error, please check your connection";

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received.
    Network,
    /// HTTP 401; the session has been expired.
    Unauthorized,
    /// Any other 4xx.
    Client,
    /// 5xx, or a status the gateway does not recognise.
    Server,
    /// 2xx with a non-zero application code.
    Logical,
    /// A response or event stream that could not be decoded.
    Decode,
    /// The request could not be built.
    InvalidRequest,
    /// Local credential storage failed.
    Storage,
    Config,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("application error {code}: {message}")]
    Logical { code: i64, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("event stream error: {0}")]
    Stream(#[from] SseError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Network(_) => ErrorKind::Network,
            GatewayError::Unauthorized => ErrorKind::Unauthorized,
            GatewayError::Client { .. } => ErrorKind::Client,
            GatewayError::Server { .. } => ErrorKind::Server,
            GatewayError::Logical { .. } => ErrorKind::Logical,
            GatewayError::Decode(_) | GatewayError::Stream(_) => ErrorKind::Decode,
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GatewayError::Storage(_) => ErrorKind::Storage,
            GatewayError::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status behind the error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Unauthorized => Some(401),
            GatewayError::Client { status, .. } | GatewayError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Network failures, 429 and 5xx are retriable; everything else is
    /// fatal. The gateway itself never retries.
    pub fn is_retriable(&self) -> bool {
        match self {
            GatewayError::Network(_) | GatewayError::Server { .. } => true,
            GatewayError::Client { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// Human-readable text for the notification sink.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Network(_) => NETWORK_MESSAGE.to_string(),
            GatewayError::Unauthorized => SESSION_EXPIRED_MESSAGE.to_string(),
            GatewayError::Client { message, .. } | GatewayError::Server { message, .. } => {
                message.clone()
            }
            GatewayError::Logical { code, message } => {
                if message.trim().is_empty() {
                    format!("request failed (code {code})")
                } else {
                    message.clone()
                }
            }
            other => other.to_string(),
        }
    }
}

impl From<EnvelopeError> for GatewayError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Logical { code, message } => GatewayError::Logical { code, message },
            EnvelopeError::MissingData => GatewayError::Decode(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Generic text for a status code when the server sent no message.
pub fn status_message(status: u16) -> String {
    let text = match status {
        400 => "bad request",
        401 => SESSION_EXPIRED_MESSAGE,
        403 => "access denied",
        404 => "requested resource not found",
        405 => "method not allowed",
        408 => "request timed out",
        409 => "request conflicts with the current state",
        413 => "request payload too large",
        429 => "too many requests, please try again later",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service unavailable",
        504 => "gateway timeout",
        _ => {
            let reason = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unknown status");
            return format!("HTTP {status}: {reason}");
        }
    };
    text.to_string()
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(GatewayError::Network("reset".into()).is_retriable());
        assert!(GatewayError::Server {
            status: 503,
            message: String::new()
        }
        .is_retriable());
        assert!(GatewayError::Client {
            status: 429,
            message: String::new()
        }
        .is_retriable());
        assert!(!GatewayError::Client {
            status: 403,
            message: String::new()
        }
        .is_retriable());
        assert!(!GatewayError::Unauthorized.is_retriable());
    }

    #[test]
    fn test_logical_message_fallback() {
        let err = GatewayError::Logical {
            code: 42,
            message: " ".into(),
        };
        assert_eq!(err.user_message(), "request failed (code 42)");
        assert_eq!(err.kind(), ErrorKind::Logical);
    }

    #[test]
    fn test_status_message_fallback() {
        assert_eq!(status_message(404), "requested resource not found");
        assert_eq!(status_message(418), "HTTP 418: I'm a teapot");
        assert_eq!(status_message(599), "HTTP 599: unknown status");
    }

    #[test]
    fn test_envelope_error_conversion() {
        let err: GatewayError = EnvelopeError::Logical {
            code: 3,
            message: "denied".into(),
        }
        .into();
        assert!(matches!(err, GatewayError::Logical { code: 3, .. }));
    }
}
