use crate::core::errors::LedgerError;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use tracing::trace;

/// A boxed stream of server-sent events.
pub type EventStream = BoxStream<'static, Result<StreamEvent, LedgerError>>;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// Value of the last `id:` field; used as the paging cursor.
    pub id: Option<String>,
    /// Value of the `event:` field, `None` for the default `message` type.
    pub event: Option<String>,
    pub data: String,
}

/// Incremental `text/event-stream` parser.
///
/// Bytes may arrive split at arbitrary points; complete events are returned
/// as soon as their terminating blank line has been seen.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "id" => self.id = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // retry and unknown fields carry nothing we act on
            _ => trace!("ignoring SSE field {}", field),
        }
        None
    }

    fn dispatch(&mut self) -> Option<StreamEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let event = StreamEvent {
            id: self.id.clone(),
            event: self.event.take(),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(event)
    }
}

struct SseState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

/// Turn a raw byte stream into an [`EventStream`].
///
/// A transport error ends the stream after yielding one
/// `StreamDisconnected` item.
pub fn sse_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(LedgerError::StreamDisconnected(e.to_string())), state));
                }
                None => return None,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_horizon_open_and_data_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(
            b"retry: 1000\nevent: open\ndata: \"hello\"\n\nid: 1234-1\ndata: {\"a\":1}\n\n",
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.as_deref(), Some("open"));
        assert_eq!(events[0].data, "\"hello\"");
        assert_eq!(events[1].id.as_deref(), Some("1234-1"));
        assert_eq!(events[1].event, None);
        assert_eq!(events[1].data, "{\"a\":1}");
    }

    #[test]
    fn test_handles_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"id: 7\r\nda").is_empty());
        assert!(decoder.feed(b"ta: line one\r\ndata: line two\r\n").is_empty());
        let events = decoder.feed(b"\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line one\nline two");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b": keepalive\n\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_sse_stream_yields_disconnect_on_error() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: one\n\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let mut events = sse_stream(futures_util::stream::iter(chunks));

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first.data, "one");
        let second = events.next().await.unwrap();
        assert!(matches!(second, Err(LedgerError::StreamDisconnected(_))));
        assert!(events.next().await.is_none());
    }
}
