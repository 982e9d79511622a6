//! Application-level response envelopes.
//!
//! Most backend endpoints wrap their payload as `{ code, message, data }`.
//! A `code` of zero means the call succeeded logically; anything else is a
//! failure the caller has to handle even though the transport said 200.

use serde::{Deserialize, Serialize};

/// Application code that denotes logical success.
pub const SUCCESS_CODE: i64 = 0;

/// Errors produced when unwrapping an [`Envelope`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("application error {code}: {message}")]
    Logical { code: i64, message: String },

    #[error("envelope carried no data")]
    MissingData,
}

/// `{ code, message, data }` wrapper used by most endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Checks the application code and returns the (possibly absent) payload.
    pub fn into_result(self) -> Result<Option<T>, EnvelopeError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(EnvelopeError::Logical {
                code: self.code,
                message: self.message,
            })
        }
    }

    /// Like [`Envelope::into_result`] but requires the payload to be present.
    pub fn into_data(self) -> Result<T, EnvelopeError> {
        self.into_result()?.ok_or(EnvelopeError::MissingData)
    }
}

/// One page of records as returned by the paginated endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    pub total: u64,
    pub size: u64,
    pub current: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current < self.pages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `{ code, message, data: { records, total, size, current, pages } }`.
pub type PageEnvelope<T> = Envelope<Page<T>>;

/// The `code`/`message` pair of an envelope, read without touching `data`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EnvelopeHeader {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

impl EnvelopeHeader {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Reads the envelope header from a JSON body.
///
/// Returns `None` when the body is not a JSON object with an integer `code`,
/// which is how endpoints that do not use the envelope are recognised.
#[must_use]
pub fn peek_header(body: &[u8]) -> Option<EnvelopeHeader> {
    serde_json::from_slice::<EnvelopeHeader>(body).ok()
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extracts a server-provided error message from an error response body.
///
/// Accepts `{ "message": ... }` and `{ "error": ... }`; blank strings count as
/// absent.
#[must_use]
pub fn peek_error_message(body: &[u8]) -> Option<String> {
    let parsed = serde_json::from_slice::<ErrorBody>(body).ok()?;
    parsed
        .message
        .into_iter()
        .chain(parsed.error)
        .map(|m| m.trim().to_string())
        .find(|m| !m.is_empty())
}
