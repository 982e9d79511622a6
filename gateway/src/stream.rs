//! Server-sent-event calls.
//!
//! The handshake is classified into proceed / fatal / retriable. Once open,
//! a reader task feeds the body through [`SseDecoder`] and hands events to
//! the caller's [`EventHandler`] until the server closes the stream, the
//! transport fails or the caller aborts.

use std::time::Duration;

use futures_util::StreamExt;
use protocol::{SseDecoder, SseEvent};
use reqwest::Method;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::classify::{classify_handshake, error_for_status, HandshakeOutcome};
use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::request::{prepare, Accept, RequestDescriptor};
use crate::transport::BodyStream;

/// How much of a rejected handshake's body is read for its error message.
const REJECTION_BODY_LIMIT: usize = 64 * 1024;

/// Callbacks for an open stream. All of them run on the reader task.
pub trait EventHandler: Send + 'static {
    fn on_event(&mut self, event: SseEvent);

    /// The transport failed or the body could not be decoded. `on_close`
    /// follows.
    fn on_error(&mut self, _error: &GatewayError) {}

    /// Runs exactly once, whatever ended the stream.
    fn on_close(&mut self) {}
}

/// [`EventHandler`] made of three closures.
pub struct StreamCallbacks<M, E, C> {
    on_event: M,
    on_error: E,
    on_close: C,
}

impl<M, E, C> StreamCallbacks<M, E, C>
where
    M: FnMut(SseEvent) + Send + 'static,
    E: FnMut(&GatewayError) + Send + 'static,
    C: FnMut() + Send + 'static,
{
    pub fn new(on_event: M, on_error: E, on_close: C) -> Self {
        Self {
            on_event,
            on_error,
            on_close,
        }
    }
}

impl<M, E, C> EventHandler for StreamCallbacks<M, E, C>
where
    M: FnMut(SseEvent) + Send + 'static,
    E: FnMut(&GatewayError) + Send + 'static,
    C: FnMut() + Send + 'static,
{
    fn on_event(&mut self, event: SseEvent) {
        (self.on_event)(event)
    }

    fn on_error(&mut self, error: &GatewayError) {
        (self.on_error)(error)
    }

    fn on_close(&mut self) {
        (self.on_close)()
    }
}

/// Why a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The server closed the body.
    Completed,
    /// The caller aborted, or dropped the handle.
    Aborted,
    /// Transport or decode error; `on_error` has been called.
    Failed,
}

/// An open event stream.
///
/// Dropping the handle aborts the stream and releases the connection.
#[derive(Debug)]
pub struct StreamHandle {
    request_id: String,
    abort: Option<oneshot::Sender<()>>,
    task: JoinHandle<CloseReason>,
}

impl StreamHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the stream and waits for the reader to let go of the
    /// connection.
    pub async fn abort(mut self) -> CloseReason {
        if let Some(abort) = self.abort.take() {
            let _ = abort.send(());
        }
        join(&mut self.task).await
    }

    /// Waits for the stream to end on its own.
    pub async fn closed(mut self) -> CloseReason {
        join(&mut self.task).await
    }
}

async fn join(task: &mut JoinHandle<CloseReason>) -> CloseReason {
    match task.await {
        Ok(reason) => reason,
        Err(err) => {
            log::error!("Event stream reader panicked: {}", err);
            CloseReason::Failed
        }
    }
}

impl Gateway {
    /// Opens an event stream for `request`.
    ///
    /// Handshake failures come back as errors: [`GatewayError::Unauthorized`]
    /// (after the session-expiry recovery) and other 4xx except 429 are
    /// fatal; 429, 5xx, unrecognised statuses and connection failures are
    /// retriable, see [`GatewayError::is_retriable`]. Reconnecting is up to
    /// the caller.
    pub async fn open_stream<H: EventHandler>(
        &self,
        request: RequestDescriptor,
        handler: H,
    ) -> Result<StreamHandle> {
        let snapshot = self.inner.session.snapshot();
        let prepared = prepare(&self.inner.config, &request, &snapshot, Accept::EventStream)
            .map_err(|err| self.fail(err))?;
        let request_id = prepared.request_id.clone();

        log::debug!(
            "{} {} [{}] opening event stream",
            request.method,
            request.path,
            request_id
        );

        let response = match self.inner.transport.open(prepared).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(GatewayError::Network(err.to_string()))),
        };

        match classify_handshake(response.status) {
            HandshakeOutcome::Proceed => {}
            HandshakeOutcome::Fatal if response.status == 401 => {
                drop(response);
                self.unauthorized(&snapshot);
                return Err(GatewayError::Unauthorized);
            }
            outcome => {
                log::debug!(
                    "[{}] stream handshake rejected with {} ({:?})",
                    request_id,
                    response.status,
                    outcome
                );
                let status = response.status;
                let body = rejection_body(response.body, self.inner.config.timeout()).await;
                return Err(self.fail(error_for_status(status, &body)));
            }
        }

        let (abort_tx, abort_rx) = oneshot::channel();
        let decoder = SseDecoder::new(self.inner.config.sse_limits());
        let task = tokio::spawn(read_events(
            request_id.clone(),
            response.body,
            decoder,
            handler,
            abort_rx,
        ));

        Ok(StreamHandle {
            request_id,
            abort: Some(abort_tx),
            task,
        })
    }

    /// `GET` event stream.
    pub async fn get_stream<H: EventHandler>(
        &self,
        request: RequestDescriptor,
        handler: H,
    ) -> Result<StreamHandle> {
        self.open_stream(request.method(Method::GET), handler).await
    }

    /// `POST` event stream.
    pub async fn post_stream<H: EventHandler>(
        &self,
        request: RequestDescriptor,
        handler: H,
    ) -> Result<StreamHandle> {
        self.open_stream(request.method(Method::POST), handler).await
    }
}

/// Reads at most [`REJECTION_BODY_LIMIT`] bytes of `body`, giving up after
/// `timeout`. Whatever arrived by then is returned; the rest is dropped.
async fn rejection_body(mut body: BodyStream, timeout: Duration) -> Vec<u8> {
    let mut prefix = Vec::new();

    let read = async {
        while prefix.len() < REJECTION_BODY_LIMIT {
            match body.next().await {
                Some(Ok(chunk)) => {
                    let take = chunk.len().min(REJECTION_BODY_LIMIT - prefix.len());
                    prefix.extend_from_slice(&chunk[..take]);
                }
                _ => break,
            }
        }
    };
    if tokio::time::timeout(timeout, read).await.is_err() {
        log::debug!("Timed out reading rejected stream body");
    }

    prefix
}

async fn read_events<H: EventHandler>(
    request_id: String,
    mut body: BodyStream,
    mut decoder: SseDecoder,
    mut handler: H,
    mut abort: oneshot::Receiver<()>,
) -> CloseReason {
    let reason = loop {
        tokio::select! {
            biased;

            // a dropped sender counts as an abort
            _ = &mut abort => break CloseReason::Aborted,

            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => match decoder.push(&bytes) {
                    Ok(events) => {
                        for event in events {
                            handler.on_event(event);
                        }
                    }
                    Err(err) => {
                        handler.on_error(&GatewayError::Stream(err));
                        break CloseReason::Failed;
                    }
                },
                Some(Err(err)) => {
                    handler.on_error(&GatewayError::Network(err.to_string()));
                    break CloseReason::Failed;
                }
                None => {
                    if decoder.finish() {
                        log::debug!("[{}] discarded unterminated event at end of stream", request_id);
                    }
                    break CloseReason::Completed;
                }
            },
        }
    };

    drop(body);
    handler.on_close();

    log::debug!("[{}] event stream closed ({:?})", request_id, reason);
    reason
}
