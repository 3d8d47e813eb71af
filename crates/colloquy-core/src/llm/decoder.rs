//! Incremental decoder for newline-delimited JSON chat streams.
//!
//! The backend streams one JSON object per line:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hel"},"done":false}
//! {"message":{"role":"assistant","content":"lo"},"done":false}
//! {"done":true}
//! ```
//!
//! Objects may be split across network chunks, so bytes are buffered until a
//! newline arrives. Nothing beyond the current partial line is held in memory.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use colloquy_types::error::ConversationError;
use colloquy_types::llm::ChatChunk;

use super::backend::ByteStream;

/// Result of decoding one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The stream ended with `done: true` or at EOF.
    Complete(String),
    /// Cancellation was observed; `partial` is everything accumulated so far.
    Interrupted { partial: String },
}

impl Decoded {
    pub fn text(&self) -> &str {
        match self {
            Decoded::Complete(text) => text,
            Decoded::Interrupted { partial } => partial,
        }
    }
}

/// Splits a byte stream into lines without buffering the whole body.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
    /// Bytes of `pending` already known to contain no newline.
    scanned: usize,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Take the next complete line, without its terminator.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') else {
            self.scanned = self.pending.len();
            return None;
        };
        let pos = self.scanned + offset;
        self.scanned = 0;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        Some(line)
    }

    /// Take whatever is left after EOF.
    fn take_remaining(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            self.scanned = 0;
            Some(std::mem::take(&mut self.pending))
        }
    }
}

enum LineStep {
    Continue,
    Done,
}

/// Stateless NDJSON stream decoder.
pub struct StreamDecoder;

impl StreamDecoder {
    /// Decode a chat stream, calling `on_fragment` for every non-empty piece of
    /// content as it arrives.
    ///
    /// Cancellation is checked between every decoded object and raced against
    /// every read, so an open stream never blocks shutdown.
    pub async fn decode<F>(
        mut stream: ByteStream,
        cancel: &CancellationToken,
        mut on_fragment: F,
    ) -> Result<Decoded, ConversationError>
    where
        F: FnMut(&str),
    {
        let mut buffer = LineBuffer::default();
        let mut accumulated = String::new();

        loop {
            while let Some(line) = buffer.next_line() {
                if cancel.is_cancelled() {
                    return Ok(Decoded::Interrupted {
                        partial: accumulated,
                    });
                }
                let step = Self::process_line(&line, &mut accumulated, &mut on_fragment)?;
                if let LineStep::Done = step {
                    return Ok(Decoded::Complete(accumulated));
                }
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(Decoded::Interrupted { partial: accumulated });
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(bytes)) => buffer.extend(&bytes),
                Some(Err(err)) => return Err(err),
                None => {
                    if let Some(rest) = buffer.take_remaining() {
                        Self::process_line(&rest, &mut accumulated, &mut on_fragment)?;
                    }
                    trace!(chars = accumulated.len(), "stream reached EOF");
                    return Ok(Decoded::Complete(accumulated));
                }
            }
        }
    }

    fn process_line<F>(
        line: &[u8],
        accumulated: &mut String,
        on_fragment: &mut F,
    ) -> Result<LineStep, ConversationError>
    where
        F: FnMut(&str),
    {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(LineStep::Continue);
        }

        let chunk: ChatChunk = serde_json::from_slice(line).map_err(|e| {
            ConversationError::Decode(format!(
                "{e} in line '{}'",
                String::from_utf8_lossy(line)
            ))
        })?;

        if let Some(message) = chunk.error {
            return Err(ConversationError::Application(message));
        }

        let content = chunk.content();
        if !content.is_empty() {
            on_fragment(content);
            accumulated.push_str(content);
        }

        if chunk.done {
            Ok(LineStep::Done)
        } else {
            Ok(LineStep::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn byte_stream(chunks: Vec<String>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, ConversationError>(c.into_bytes())),
        ))
    }

    fn line(content: &str) -> String {
        format!(
            "{}\n",
            serde_json::json!({"message": {"role": "assistant", "content": content}, "done": false})
        )
    }

    #[test]
    fn test_line_buffer_scans_each_byte_once() {
        let mut buffer = LineBuffer::default();
        for _ in 0..100 {
            buffer.extend(b"abcd");
            assert!(buffer.next_line().is_none());
            assert_eq!(buffer.scanned, buffer.pending.len());
        }

        buffer.extend(b"e\nfg\nh");
        let first = buffer.next_line().unwrap();
        assert_eq!(first.len(), 401);
        assert_eq!(buffer.next_line().unwrap(), b"fg");
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.scanned, 1);
        assert_eq!(buffer.take_remaining().unwrap(), b"h");
        assert_eq!(buffer.scanned, 0);
    }

    #[tokio::test]
    async fn test_fragments_accumulate_until_done() {
        let stream = byte_stream(vec![
            line("Hel"),
            line("lo"),
            "{\"done\":true}\n".to_string(),
        ]);
        let mut fragments = Vec::new();
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |f| {
            fragments.push(f.to_string())
        })
        .await
        .unwrap();

        assert_eq!(decoded, Decoded::Complete("Hello".to_string()));
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_eof_without_done_is_not_an_error() {
        let stream = byte_stream(vec![line("partial answer")]);
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(decoded, Decoded::Complete("partial answer".to_string()));
    }

    #[tokio::test]
    async fn test_object_split_across_chunks() {
        let full = line("split");
        let (a, b) = full.split_at(10);
        let stream = byte_stream(vec![a.to_string(), b.to_string(), "{\"done\":true}".to_string()]);
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(decoded.text(), "split");
    }

    #[tokio::test]
    async fn test_unterminated_final_line_is_decoded() {
        let stream = byte_stream(vec![
            line("a"),
            r#"{"message":{"role":"assistant","content":"b"},"done":false}"#.to_string(),
        ]);
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(decoded.text(), "ab");
    }

    #[tokio::test]
    async fn test_content_after_done_is_ignored() {
        let stream = byte_stream(vec![line("x"), "{\"done\":true}\n".to_string(), line("y")]);
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(decoded.text(), "x");
    }

    #[tokio::test]
    async fn test_blank_lines_skipped() {
        let stream = byte_stream(vec!["\n\r\n".to_string(), line("ok"), "\n".to_string()]);
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(decoded.text(), "ok");
    }

    #[tokio::test]
    async fn test_malformed_line_is_decode_error() {
        let stream = byte_stream(vec![line("fine"), "{not json}\n".to_string()]);
        let err = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::Decode(_)));
    }

    #[tokio::test]
    async fn test_in_band_error_is_application_error() {
        let stream = byte_stream(vec!["{\"error\":\"model 'nope' not found\"}\n".to_string()]);
        let err = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        match err {
            ConversationError::Application(msg) => assert!(msg.contains("nope")),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream_propagates() {
        let first = line("he");
        let stream: ByteStream = Box::pin(stream::iter(vec![
            Ok(first.into_bytes()),
            Err(ConversationError::Transport("connection reset".to_string())),
        ]));
        let err = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_pre_cancelled_returns_interrupted() {
        let token = CancellationToken::new();
        token.cancel();
        let stream = byte_stream(vec![line("never")]);
        let mut called = false;
        let decoded = StreamDecoder::decode(stream, &token, |_| called = true)
            .await
            .unwrap();
        assert_eq!(
            decoded,
            Decoded::Interrupted {
                partial: String::new()
            }
        );
        assert!(!called);
    }

    #[tokio::test]
    async fn test_cancel_between_objects_keeps_partial() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let body = format!("{}{}", line("first"), line("second"));
        let stream = byte_stream(vec![body]);
        let decoded = StreamDecoder::decode(stream, &token, |_| canceller.cancel())
            .await
            .unwrap();
        assert_eq!(
            decoded,
            Decoded::Interrupted {
                partial: "first".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_for_bytes() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let stream: ByteStream = Box::pin(
            stream::iter(vec![Ok(line("slow").into_bytes())]).chain(stream::pending()),
        );
        let decoded = StreamDecoder::decode(stream, &token, |_| {}).await.unwrap();
        assert_eq!(
            decoded,
            Decoded::Interrupted {
                partial: "slow".to_string()
            }
        );
    }
}
