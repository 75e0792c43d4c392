//! Event sources feeding the bridge.
//!
//! - `ChannelEventSource`: an in-process topic fed through an
//!   `EventPublisher` handle
//! - `JsonLinesSource`: one event per line of a reader or file, for replaying
//!   captured traffic
//!
//! Both assign offsets in delivery order and end the stream when their
//! input ends.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use auditbridge_contracts::{
    error::{BridgeError, BridgeResult},
    event::RawEvent,
};
use auditbridge_core::traits::EventSource;

// ── Channel source ────────────────────────────────────────────────────────────

/// Publishing side of an in-process topic.
#[derive(Clone)]
pub struct EventPublisher {
    topic: String,
    sender: mpsc::Sender<Vec<u8>>,
}

impl EventPublisher {
    /// Publish one payload, waiting for capacity if the topic is full.
    ///
    /// Returns `BridgeError::Connection` once the consuming source is gone.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> BridgeResult<()> {
        self.sender
            .send(payload.into())
            .await
            .map_err(|_| BridgeError::Connection {
                reason: format!("topic {} has no subscriber", self.topic),
            })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Consuming side of an in-process topic.
pub struct ChannelEventSource {
    topic: String,
    group_id: String,
    receiver: mpsc::Receiver<Vec<u8>>,
    offset: u64,
}

/// Create a bounded in-process topic. The source ends once every publisher
/// has been dropped and the buffer is drained.
pub fn channel(
    topic: impl Into<String>,
    group_id: impl Into<String>,
    capacity: usize,
) -> (EventPublisher, ChannelEventSource) {
    let topic = topic.into();
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let publisher = EventPublisher {
        topic: topic.clone(),
        sender,
    };
    let source = ChannelEventSource {
        topic,
        group_id: group_id.into(),
        receiver,
        offset: 0,
    };
    (publisher, source)
}

#[async_trait]
impl EventSource for ChannelEventSource {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn next_event(&mut self) -> Option<RawEvent> {
        let payload = self.receiver.recv().await?;
        let offset = self.offset;
        self.offset += 1;
        debug!(topic = %self.topic, offset, bytes = payload.len(), "event received");
        Some(RawEvent::new(self.topic.clone(), offset, payload))
    }
}

// ── JSON lines source ─────────────────────────────────────────────────────────

/// Reads one event per non-blank line. The offset is the zero-based line
/// number, so blank lines leave gaps.
///
/// Lines are passed through as raw bytes; a line that is not UTF-8 or not
/// JSON is left for the decoder to reject and the stream continues.
pub struct JsonLinesSource<R> {
    topic: String,
    group_id: String,
    reader: R,
    buf: Vec<u8>,
    line: u64,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn from_reader(reader: R, topic: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            group_id: group_id.into(),
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open `path` for replay.
    pub async fn open(
        path: &Path,
        topic: impl Into<String>,
        group_id: impl Into<String>,
    ) -> BridgeResult<Self> {
        let file = File::open(path).await.map_err(|e| BridgeError::Connection {
            reason: format!("failed to open event file '{}': {}", path.display(), e),
        })?;
        Ok(Self::from_reader(BufReader::new(file), topic, group_id))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesSource<R> {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn next_event(&mut self) -> Option<RawEvent> {
        loop {
            let offset = self.line;
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let payload = strip_line_ending(&self.buf);
                    if payload.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(RawEvent::new(self.topic.clone(), offset, payload.to_vec()));
                }
                Err(e) => {
                    warn!(topic = %self.topic, line = offset, error = %e, "event stream read failed");
                    return None;
                }
            }
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_assigns_offsets_in_order() {
        let (publisher, mut source) = channel("clause-events", "clause-hlf", 8);

        publisher.publish(r#"{"contractId":"A"}"#).await.unwrap();
        publisher.publish(r#"{"contractId":"B"}"#).await.unwrap();
        drop(publisher);

        let first = source.next_event().await.unwrap();
        let second = source.next_event().await.unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(first.payload, br#"{"contractId":"A"}"#.to_vec());
        assert_eq!(second.offset, 1);
        assert_eq!(second.topic, "clause-events");
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_after_source_dropped_fails() {
        let (publisher, source) = channel("clause-events", "clause-hlf", 1);
        drop(source);

        let err = publisher.publish("{}").await.unwrap_err();
        assert!(matches!(err, BridgeError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_json_lines_skips_blank_lines() {
        let input = "{\"contractId\":\"A\"}\n\n   \n{\"contractId\":\"B\"}\n";
        let mut source = JsonLinesSource::from_reader(BufReader::new(input.as_bytes()), "replay", "g");

        let first = source.next_event().await.unwrap();
        let second = source.next_event().await.unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 3);
        assert_eq!(String::from_utf8(second.payload).unwrap(), r#"{"contractId":"B"}"#);
        assert!(source.next_event().await.is_none());
        assert_eq!(source.group_id(), "g");
    }

    #[tokio::test]
    async fn test_json_lines_passes_non_utf8_line_through() {
        let input: &[u8] = b"{\"contractId\":\"A\"}\n\xff\xfe\n{\"contractId\":\"B\"}\n";
        let mut source = JsonLinesSource::from_reader(BufReader::new(input), "replay", "g");

        let mut delivered = Vec::new();
        while let Some(event) = source.next_event().await {
            delivered.push((event.offset, event.payload));
        }

        assert_eq!(
            delivered,
            vec![
                (0, br#"{"contractId":"A"}"#.to_vec()),
                (1, vec![0xff, 0xfe]),
                (2, br#"{"contractId":"B"}"#.to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_json_lines_last_line_without_newline() {
        let input: &[u8] = b"{\"contractId\":\"A\"}\r\n{\"contractId\":\"B\"}";
        let mut source = JsonLinesSource::from_reader(input, "replay", "g");

        assert_eq!(source.next_event().await.unwrap().payload, br#"{"contractId":"A"}"#.to_vec());
        assert_eq!(source.next_event().await.unwrap().payload, br#"{"contractId":"B"}"#.to_vec());
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let result = JsonLinesSource::open(Path::new("/nonexistent/events.jsonl"), "replay", "g").await;
        assert!(matches!(result, Err(BridgeError::Connection { .. })));
    }
}
