use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};

use super::{RawResponse, StreamingResponse, Transport, TransportError};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::request::{MultipartForm, PreparedBody, PreparedRequest};

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: std::time::Duration,
}

impl ReqwestTransport {
    pub fn new(config: &GatewayConfig) -> crate::error::Result<Self> {
        // no client-wide timeout: it would also cut long-lived event streams
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    fn build(&self, request: PreparedRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        Ok(match request.body {
            PreparedBody::Empty => builder,
            PreparedBody::Bytes(bytes) => builder.body(bytes),
            PreparedBody::Multipart(form) => builder.multipart(encode_multipart(form)?),
        })
    }
}

fn encode_multipart(form: MultipartForm) -> Result<Form, TransportError> {
    let mut encoded = Form::new();

    for (name, value) in form.fields {
        encoded = encoded.text(name, value);
    }

    for file in form.files {
        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(mime) = file.mime {
            part = part
                .mime_str(&mime)
                .map_err(|e| TransportError::Request(format!("invalid mime '{}': {}", mime, e)))?;
        }
        encoded = encoded.part(file.field, part);
    }

    Ok(encoded)
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::Request(err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let response = self
            .build(request)?
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            // the status alone decides a 401
            Err(err) if status == 401 => {
                log::debug!("Discarding unreadable 401 body: {}", err);
                Bytes::new()
            }
            Err(err) => return Err(map_error(err)),
        };

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    async fn open(&self, request: PreparedRequest) -> Result<StreamingResponse, TransportError> {
        let response = self.build(request)?.send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(map_error)).boxed();

        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}
