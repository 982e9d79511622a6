//! Wire formats shared by the gateway crates.
//!
//! `envelope` describes the `{ code, message, data }` wrapper the backend
//! puts around most payloads; `sse` decodes `text/event-stream` bodies for
//! the streaming calls.

pub mod envelope;
pub mod sse;

pub use envelope::{
    Envelope, EnvelopeError, EnvelopeHeader, Page, PageEnvelope, SUCCESS_CODE, peek_error_message,
    peek_header,
};
pub use sse::{DEFAULT_EVENT_TYPE, SseDecoder, SseError, SseEvent, SseLimits};

/// Returns the protocol crate version string.
pub fn protocol_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
