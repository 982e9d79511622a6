//! The authenticated request gateway.

use std::sync::Arc;

use bytes::Bytes;
use protocol::{Envelope, Page};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::classify::{error_for_status, logical_failure, status_class, StatusClass};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::middleware::SessionExpiry;
use crate::navigation::{LogNavigator, Navigator};
use crate::notify::{LogNotifier, Notice, Notifier};
use crate::request::{prepare, Accept, RequestDescriptor};
use crate::session::{ExpiryOutcome, FileStore, SessionContext, SessionSnapshot};
use crate::transport::{ReqwestTransport, Transport};

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub request_id: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|_| GatewayError::Decode("response body is not valid UTF-8".to_string()))
    }

    /// Decodes `{ code, message, data }` and checks the application code.
    pub fn envelope<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let envelope: Envelope<T> = self.json()?;
        Ok(envelope.into_result()?)
    }

    /// Like [`ApiResponse::envelope`] but requires `data` to be present.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        let envelope: Envelope<T> = self.json()?;
        Ok(envelope.into_data()?)
    }
}

pub(crate) struct GatewayInner {
    pub(crate) config: GatewayConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) session: SessionContext,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) expiry: SessionExpiry,
}

/// Wraps every call with credential attachment and 401 recovery.
///
/// Cloning is cheap; clones share the session, transport and sinks.
#[derive(Clone)]
pub struct Gateway {
    pub(crate) inner: Arc<GatewayInner>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.config.base_url)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

pub struct GatewayBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn Transport>>,
    session: Option<SessionContext>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl GatewayBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Fills in the defaults: reqwest transport, a session persisted at
    /// `credentials_path` (in memory without one), log-backed sinks.
    pub fn build(self) -> Result<Gateway> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        let session = match self.session {
            Some(session) => session,
            None => match &self.config.credentials_path {
                Some(path) => SessionContext::new(Arc::new(FileStore::new(path)))?,
                None => SessionContext::in_memory(),
            },
        };

        let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
        let navigator = self.navigator.unwrap_or_else(|| Arc::new(LogNavigator));

        let expiry = SessionExpiry::new(
            session.clone(),
            notifier.clone(),
            navigator,
            self.config.login_route(),
        );

        Ok(Gateway {
            inner: Arc::new(GatewayInner {
                config: self.config,
                transport,
                session,
                notifier,
                expiry,
            }),
        })
    }
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder {
            config,
            transport: None,
            session: None,
            notifier: None,
            navigator: None,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    pub async fn get(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        self.send(request.method(Method::GET)).await
    }

    pub async fn post(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        self.send(request.method(Method::POST)).await
    }

    pub async fn put(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        self.send(request.method(Method::PUT)).await
    }

    pub async fn delete(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        self.send(request.method(Method::DELETE)).await
    }

    /// Sends `request` with its own method.
    ///
    /// Fails with the classified error for every non-2xx status and for 2xx
    /// bodies carrying a non-zero application code. A 401 runs the
    /// session-expiry recovery before failing with
    /// [`GatewayError::Unauthorized`]. Nothing is retried.
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let snapshot = self.inner.session.snapshot();
        let prepared = prepare(&self.inner.config, &request, &snapshot, Accept::Json)
            .map_err(|err| self.fail(err))?;
        let request_id = prepared.request_id.clone();

        log::debug!("{} {} [{}]", request.method, request.path, request_id);

        let response = match self.inner.transport.send(prepared).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!(
                    "{} {} [{}] failed without response: {}",
                    request.method,
                    request.path,
                    request_id,
                    err
                );
                return Err(self.fail(GatewayError::Network(err.to_string())));
            }
        };

        match status_class(response.status) {
            StatusClass::Success => {
                if let Some(err) = logical_failure(&response.body) {
                    return Err(self.fail(err));
                }

                Ok(ApiResponse {
                    request_id,
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                })
            }
            StatusClass::Unauthorized => {
                self.unauthorized(&snapshot);
                Err(GatewayError::Unauthorized)
            }
            _ => Err(self.fail(error_for_status(response.status, &response.body))),
        }
    }

    /// Sends `request` and unwraps `data` from the envelope.
    pub async fn fetch<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T> {
        let response = self.send(request).await?;
        response.data().map_err(|err| self.fail(err))
    }

    /// Sends `request` and checks the envelope, ignoring `data`.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<()> {
        let response = self.send(request).await?;
        response
            .envelope::<serde_json::Value>()
            .map(|_| ())
            .map_err(|err| self.fail(err))
    }

    /// Sends `request` and unwraps a page of records.
    pub async fn fetch_page<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<Page<T>> {
        self.fetch(request).await
    }

    /// Runs the session-expiry recovery against the current session, as if
    /// a 401 had just been received. Safe to call repeatedly.
    pub fn expire_session(&self) -> ExpiryOutcome {
        self.inner.expiry.recover()
    }

    pub(crate) fn unauthorized(&self, snapshot: &SessionSnapshot) -> ExpiryOutcome {
        self.inner.expiry.on_unauthorized(snapshot)
    }

    /// Logs and surfaces a classified failure, then hands it back.
    pub(crate) fn fail(&self, err: GatewayError) -> GatewayError {
        log::warn!("Request failed ({:?}): {}", err.kind(), err);

        if self.inner.config.notify_errors {
            self.inner.notifier.notify(Notice::error(err.user_message()));
        }

        err
    }
}
