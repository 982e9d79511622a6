//! Request descriptors and their translation into wire requests.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Url};
use serde::Serialize;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::middleware::auth::attach_credentials;
use crate::session::SessionSnapshot;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Content-type override for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Multipart,
    /// Sent verbatim; the body is still encoded as JSON.
    Custom(String),
}

/// A file attached to a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Text fields and files, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// Method, path, ordered query pairs, body and content-type override.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub content_type: Option<ContentType>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            content_type: None,
            headers: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds the pair only when `value` is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| GatewayError::InvalidRequest(format!("failed to encode body: {}", e)))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    EventStream,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBody {
    Empty,
    Bytes(Vec<u8>),
    /// Encoded by the transport, which also sets the boundary header.
    Multipart(MultipartForm),
}

/// Fully built request handed to a transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request_id: String,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: PreparedBody,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Content type as it will go on the wire.
    pub fn content_type(&self) -> Option<&str> {
        match self.body {
            PreparedBody::Multipart(_) => Some(MULTIPART_CONTENT_TYPE),
            _ => self.header(CONTENT_TYPE.as_str()),
        }
    }
}

/// Joins `path` onto the base URL and appends the query pairs in order.
///
/// Absolute `http(s)` paths bypass the base URL.
pub fn build_url(base_url: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
    let raw = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    let mut url = Url::parse(&raw)
        .map_err(|e| GatewayError::InvalidRequest(format!("invalid url '{}': {}", raw, e)))?;

    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    Ok(url)
}

/// Builds the wire request: URL, default and override headers, bearer
/// credential from `snapshot`, and the encoded body.
pub fn prepare(
    config: &GatewayConfig,
    descriptor: &RequestDescriptor,
    snapshot: &SessionSnapshot,
    accept: Accept,
) -> Result<PreparedRequest> {
    let url = build_url(&config.base_url, &descriptor.path, &descriptor.query)?;
    let request_id = Uuid::new_v4().to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(match accept {
            Accept::Json => JSON_CONTENT_TYPE,
            Accept::EventStream => EVENT_STREAM_CONTENT_TYPE,
        }),
    );
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);
    headers.insert(REQUEST_ID_HEADER, header_value(&request_id)?);

    for (name, value) in &descriptor.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid header '{}': {}", name, e)))?;
        headers.insert(name, header_value(value)?);
    }

    let body = match (&descriptor.body, &descriptor.content_type) {
        (Body::Multipart(_), Some(ContentType::Json | ContentType::Custom(_))) => {
            return Err(GatewayError::InvalidRequest(
                "multipart body cannot be sent with a non-multipart content type".to_string(),
            ));
        }
        (Body::Multipart(form), _) => PreparedBody::Multipart(form.clone()),
        (_, Some(ContentType::Multipart)) => {
            return Err(GatewayError::InvalidRequest(
                "multipart content type requires a multipart body".to_string(),
            ));
        }
        (body, content_type) => {
            let value = match content_type {
                Some(ContentType::Custom(custom)) => header_value(custom)?,
                _ => HeaderValue::from_static(JSON_CONTENT_TYPE),
            };
            headers.insert(CONTENT_TYPE, value);

            match body {
                Body::Json(value) => PreparedBody::Bytes(serde_json::to_vec(value).map_err(|e| {
                    GatewayError::InvalidRequest(format!("failed to encode body: {}", e))
                })?),
                _ => PreparedBody::Empty,
            }
        }
    };

    if matches!(body, PreparedBody::Multipart(_)) {
        headers.remove(CONTENT_TYPE);
    }

    // credentials go on last so no caller header can replace them
    attach_credentials(&mut headers, snapshot)?;

    Ok(PreparedRequest {
        request_id,
        method: descriptor.method.clone(),
        url,
        headers,
        body,
    })
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GatewayError::InvalidRequest(format!("invalid header value: {}", e)))
}
