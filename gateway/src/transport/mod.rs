//! The seam between the gateway and the network.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::header::HeaderMap;

use crate::request::PreparedRequest;

pub use http::ReqwestTransport;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request could not be sent: {0}")]
    Request(String),
}

/// A complete response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Status and headers of a response whose body is still arriving.
///
/// Dropping `body` releases the connection.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and reads the whole body.
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;

    /// Sends the request and returns as soon as the status line and headers
    /// are in.
    async fn open(&self, request: PreparedRequest) -> Result<StreamingResponse, TransportError>;
}
