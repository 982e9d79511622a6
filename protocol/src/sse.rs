//! Incremental decoder for `text/event-stream` bodies.
//!
//! Bytes arrive in arbitrary chunks; [`SseDecoder::push`] buffers partial
//! lines and returns every event completed by the chunk.

/// Event type used when the stream does not name one.
pub const DEFAULT_EVENT_TYPE: &str = "message";

const BOM: &str = "\u{feff}";

/// Limits used by the decoder to protect against runaway streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SseLimits {
    pub max_event_bytes: usize,
    pub max_line_bytes: usize,
}

impl Default for SseLimits {
    fn default() -> Self {
        Self {
            max_event_bytes: 1024 * 1024,
            max_line_bytes: 256 * 1024,
        }
    }
}

/// A dispatched server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    /// Last event id seen on the stream at dispatch time.
    pub id: Option<String>,
    /// Reconnection delay announced alongside this event, in milliseconds.
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: DEFAULT_EVENT_TYPE.to_string(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }
}

/// Errors produced while decoding an event stream.
///
/// A decoder that returned an error should be discarded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SseError {
    #[error("event exceeds limit: limit={limit} actual={actual}")]
    EventTooLarge { limit: usize, actual: usize },

    #[error("line exceeds limit: limit={limit} actual={actual}")]
    LineTooLong { limit: usize, actual: usize },

    #[error("event stream line is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Default)]
struct PendingEvent {
    event: Option<String>,
    data: String,
    has_data: bool,
    retry: Option<u64>,
}

#[derive(Debug)]
pub struct SseDecoder {
    limits: SseLimits,
    buffer: Vec<u8>,
    pending: PendingEvent,
    last_event_id: Option<String>,
    reconnect_ms: Option<u64>,
    // a chunk ended on '\r'; a leading '\n' in the next chunk belongs to it
    skip_lf: bool,
    started: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new(SseLimits::default())
    }
}

impl SseDecoder {
    #[must_use]
    pub fn new(limits: SseLimits) -> Self {
        Self {
            limits,
            buffer: Vec::new(),
            pending: PendingEvent::default(),
            last_event_id: None,
            reconnect_ms: None,
            skip_lf: false,
            started: false,
        }
    }

    #[must_use]
    pub const fn limits(&self) -> SseLimits {
        self.limits
    }

    /// Last event id announced by the stream, for `Last-Event-ID` on reconnect.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Most recent `retry:` value announced by the stream.
    #[must_use]
    pub fn reconnect_ms(&self) -> Option<u64> {
        self.reconnect_ms
    }

    /// Feeds a chunk of bytes and returns the events it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, SseError> {
        let mut events = Vec::new();
        let mut start = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let buffer = std::mem::take(&mut self.buffer);
        let mut line_start = 0;
        let mut i = start;

        if self.skip_lf && i < buffer.len() {
            self.skip_lf = false;
            if buffer[i] == b'\n' {
                i += 1;
                line_start = i;
            }
        }

        while i < buffer.len() {
            match buffer[i] {
                b'\n' | b'\r' => {
                    self.process_line(&buffer[line_start..i], &mut events)?;
                    if buffer[i] == b'\r' {
                        if i + 1 < buffer.len() {
                            if buffer[i + 1] == b'\n' {
                                i += 1;
                            }
                        } else {
                            self.skip_lf = true;
                        }
                    }
                    i += 1;
                    line_start = i;
                }
                _ => i += 1,
            }
        }

        start = line_start;
        let remainder = buffer.len() - start;
        if remainder > self.limits.max_line_bytes {
            return Err(SseError::LineTooLong {
                limit: self.limits.max_line_bytes,
                actual: remainder,
            });
        }

        let mut buffer = buffer;
        buffer.drain(..start);
        self.buffer = buffer;

        Ok(events)
    }

    /// Signals the end of the stream.
    ///
    /// An event that was never terminated by a blank line is discarded.
    /// Returns `true` when something was discarded.
    pub fn finish(&mut self) -> bool {
        let discarded = !self.buffer.is_empty() || self.pending.has_data;
        self.buffer.clear();
        self.pending = PendingEvent::default();
        self.skip_lf = false;
        discarded
    }

    fn process_line(&mut self, raw: &[u8], events: &mut Vec<SseEvent>) -> Result<(), SseError> {
        if raw.len() > self.limits.max_line_bytes {
            return Err(SseError::LineTooLong {
                limit: self.limits.max_line_bytes,
                actual: raw.len(),
            });
        }

        let mut line = std::str::from_utf8(raw).map_err(|_| SseError::InvalidUtf8)?;

        if !self.started {
            self.started = true;
            line = line.strip_prefix(BOM).unwrap_or(line);
        }

        if line.is_empty() {
            self.dispatch(events);
            return Ok(());
        }

        if line.starts_with(':') {
            return Ok(());
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                self.check_event_size(value.len(), self.id_len(), self.pending.data.len())?;
                self.pending.event = Some(value.to_string());
            }
            "data" => {
                self.check_event_size(
                    self.event_len(),
                    self.id_len(),
                    self.pending.data.len() + value.len() + 1,
                )?;
                self.pending.data.push_str(value);
                self.pending.data.push('\n');
                self.pending.has_data = true;
            }
            "id" => {
                if !value.contains('\0') {
                    self.check_event_size(self.event_len(), value.len(), self.pending.data.len())?;
                    self.last_event_id = (!value.is_empty()).then(|| value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.reconnect_ms = Some(ms);
                        self.pending.retry = Some(ms);
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn event_len(&self) -> usize {
        self.pending.event.as_ref().map_or(0, String::len)
    }

    fn id_len(&self) -> usize {
        self.last_event_id.as_ref().map_or(0, String::len)
    }

    // name, id and data of one event share the event budget
    fn check_event_size(&self, event: usize, id: usize, data: usize) -> Result<(), SseError> {
        let size = event + id + data;
        if size > self.limits.max_event_bytes {
            return Err(SseError::EventTooLarge {
                limit: self.limits.max_event_bytes,
                actual: size,
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        let pending = std::mem::take(&mut self.pending);
        if !pending.has_data {
            return;
        }

        let mut data = pending.data;
        if data.ends_with('\n') {
            data.pop();
        }

        events.push(SseEvent {
            event: pending
                .event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data,
            id: self.last_event_id.clone(),
            retry: pending.retry,
        });
    }
}
