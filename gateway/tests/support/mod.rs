#![allow(dead_code)]

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::AppRoute;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use gateway::navigation::Navigator;
use gateway::notify::{Notice, Notifier};
use gateway::request::PreparedRequest;
use gateway::transport::{RawResponse, StreamingResponse, Transport, TransportError};
use gateway::{EventHandler, Gateway, GatewayConfig, GatewayError, SessionContext};
use protocol::SseEvent;
use reqwest::header::HeaderMap;
use tokio::sync::Semaphore;

pub const BASE_URL: &str = "http://api.test";

pub fn envelope(code: i64, message: &str, data: serde_json::Value) -> Bytes {
    Bytes::from(
        serde_json::json!({ "code": code, "message": message, "data": data }).to_string(),
    )
}

pub fn ok(data: serde_json::Value) -> Scripted {
    Scripted::Respond {
        status: 200,
        body: envelope(0, "success", data),
    }
}

pub fn status(status: u16, body: &str) -> Scripted {
    Scripted::Respond {
        status,
        body: Bytes::from(body.to_string()),
    }
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Respond { status: u16, body: Bytes },
    Fail(TransportError),
}

#[derive(Debug, Clone)]
pub enum ScriptedStream {
    Open {
        status: u16,
        chunks: Vec<Result<Bytes, TransportError>>,
        /// Keep the body pending after the last chunk instead of ending it.
        hold_open: bool,
    },
    Fail(TransportError),
}

impl ScriptedStream {
    pub fn events(chunks: &[&str]) -> Self {
        ScriptedStream::Open {
            status: 200,
            chunks: chunks
                .iter()
                .map(|chunk| Ok(Bytes::from(chunk.to_string())))
                .collect(),
            hold_open: false,
        }
    }

    pub fn held(chunks: &[&str]) -> Self {
        match Self::events(chunks) {
            ScriptedStream::Open { status, chunks, .. } => ScriptedStream::Open {
                status,
                chunks,
                hold_open: true,
            },
            other => other,
        }
    }

    pub fn rejected(status: u16) -> Self {
        ScriptedStream::Open {
            status,
            chunks: Vec::new(),
            hold_open: false,
        }
    }

    /// Rejection whose body arrives in `chunks`.
    pub fn rejected_with(status: u16, chunks: &[&str]) -> Self {
        match Self::events(chunks) {
            ScriptedStream::Open { chunks, .. } => ScriptedStream::Open {
                status,
                chunks,
                hold_open: false,
            },
            other => other,
        }
    }
}

/// Transport that replays scripted responses and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<Scripted>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<PreparedRequest>>,
    gate: Option<Arc<Semaphore>>,
    body_released: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send` parks until the semaphore hands out a permit.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push(&self, scripted: Scripted) -> &Self {
        self.responses.lock().unwrap().push_back(scripted);
        self
    }

    /// Answer used once the queue is empty.
    pub fn always(&self, scripted: Scripted) -> &Self {
        *self.fallback.lock().unwrap() = Some(scripted);
        self
    }

    pub fn push_stream(&self, scripted: ScriptedStream) -> &Self {
        self.streams.lock().unwrap().push_back(scripted);
        self
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> PreparedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    pub fn body_released(&self) -> bool {
        self.body_released.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Scripted {
        if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
            return scripted;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .expect("unexpected request: nothing scripted")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        match self.next_response() {
            Scripted::Respond { status, body } => Ok(RawResponse {
                status,
                headers: HeaderMap::new(),
                body,
            }),
            Scripted::Fail(err) => Err(err),
        }
    }

    async fn open(&self, request: PreparedRequest) -> Result<StreamingResponse, TransportError> {
        self.requests.lock().unwrap().push(request);

        let scripted = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected stream: nothing scripted");

        match scripted {
            ScriptedStream::Open {
                status,
                chunks,
                hold_open,
            } => {
                let chunks = stream::iter(chunks);
                let body: BoxStream<'static, Result<Bytes, TransportError>> = if hold_open {
                    chunks.chain(stream::pending()).boxed()
                } else {
                    chunks.boxed()
                };

                Ok(StreamingResponse {
                    status,
                    headers: HeaderMap::new(),
                    body: ReleaseOnDrop {
                        inner: body,
                        released: self.body_released.clone(),
                    }
                    .boxed(),
                })
            }
            ScriptedStream::Fail(err) => Err(err),
        }
    }
}

struct ReleaseOnDrop {
    inner: BoxStream<'static, Result<Bytes, TransportError>>,
    released: Arc<AtomicBool>,
}

impl Stream for ReleaseOnDrop {
    type Item = Result<Bytes, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.message).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<AppRoute>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<AppRoute> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: AppRoute) {
        self.routes.lock().unwrap().push(route);
    }
}

/// Event handler whose calls can be inspected after the fact.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    pub events: Arc<Mutex<Vec<SseEvent>>>,
    pub errors: Arc<Mutex<Vec<GatewayError>>>,
    pub closes: Arc<AtomicUsize>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<SseEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<GatewayError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl EventHandler for RecordingHandler {
    fn on_event(&mut self, event: SseEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn on_error(&mut self, error: &GatewayError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub gateway: Gateway,
    pub transport: Arc<ScriptedTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(transport: ScriptedTransport, session: SessionContext) -> Self {
        let transport = Arc::new(transport);
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());

        let config = GatewayConfig {
            base_url: BASE_URL.to_string(),
            ..GatewayConfig::default()
        };

        let gateway = Gateway::builder(config)
            .transport(transport.clone())
            .session(session)
            .notifier(notifier.clone())
            .navigator(navigator.clone())
            .build()
            .expect("failed to build gateway");

        Self {
            gateway,
            transport,
            notifier,
            navigator,
        }
    }

    pub fn session(&self) -> &SessionContext {
        self.gateway.session()
    }
}

/// Polls `condition` until it holds, failing the test after a second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
