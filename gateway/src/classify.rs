//! Status-code classification for plain calls and stream handshakes.

use protocol::{peek_error_message, peek_header};

use crate::error::{status_message, GatewayError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Unauthorized,
    ClientError,
    ServerError,
    /// 1xx or a redirect that was not followed.
    Unexpected,
}

pub fn status_class(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Unauthorized,
        400..=499 => StatusClass::ClientError,
        500..=599 => StatusClass::ServerError,
        _ => StatusClass::Unexpected,
    }
}

/// Outcome of opening an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Proceed,
    /// Abort, do not reconnect.
    Fatal,
    /// The caller's reconnect policy may try again.
    Retriable,
}

/// 2xx proceeds; 4xx other than 429 (401 included) is fatal; 429, 5xx and
/// anything unrecognised is retriable.
pub fn classify_handshake(status: u16) -> HandshakeOutcome {
    match status {
        200..=299 => HandshakeOutcome::Proceed,
        429 => HandshakeOutcome::Retriable,
        400..=499 => HandshakeOutcome::Fatal,
        _ => HandshakeOutcome::Retriable,
    }
}

/// Error for a non-success, non-401 status.
///
/// The message falls back from the server-provided text to a generic one
/// derived from the status code.
pub fn error_for_status(status: u16, body: &[u8]) -> GatewayError {
    let message = || peek_error_message(body).unwrap_or_else(|| status_message(status));

    match status_class(status) {
        StatusClass::Unauthorized => GatewayError::Unauthorized,
        StatusClass::ClientError => GatewayError::Client {
            status,
            message: message(),
        },
        StatusClass::ServerError => GatewayError::Server {
            status,
            message: message(),
        },
        StatusClass::Success | StatusClass::Unexpected => GatewayError::Server {
            status,
            message: format!("unexpected status {}", status),
        },
    }
}

/// Logical failure carried by a 2xx body, if any.
pub fn logical_failure(body: &[u8]) -> Option<GatewayError> {
    let header = peek_header(body)?;
    if header.is_success() {
        return None;
    }

    Some(GatewayError::Logical {
        code: header.code,
        message: header.message.unwrap_or_default(),
    })
}
