// Streaming Module
// SSE decoding, delta forwarding and the simulated stream used for cache
// replays and providers without native streaming

use async_stream::try_stream;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use super::{AIError, AIResult, ProviderAdapter};

/// Callback receiving each text delta as it arrives
pub type ChunkCallback<'a> = &'a mut (dyn FnMut(&str) + Send + 'a);

/// What one SSE line means to an adapter
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental text
    Delta(String),
    /// Provider signalled end of stream
    Done,
    /// Keep-alive, comments, events without text
    Skip,
    /// Line could not be decoded; logged and dropped
    Malformed(String),
    /// Provider reported an error inside the stream
    Error(String),
}

/// Splits a byte stream into lines
///
/// Bytes are buffered until a newline, so a UTF-8 sequence split across two
/// network chunks is decoded only once complete.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the complete, non-empty lines it closed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Trailing line without a final newline, if any
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

/// Payload of a `data:` line
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Decode a provider byte stream into text deltas
///
/// Stops at the adapter's end marker or when the body ends. Malformed lines
/// are skipped; an in-stream error or an idle gap longer than `idle_timeout`
/// ends the stream with an error.
pub fn delta_stream(
    mut body: BoxStream<'static, AIResult<Vec<u8>>>,
    adapter: Arc<dyn ProviderAdapter>,
    idle_timeout: Option<Duration>,
) -> impl Stream<Item = AIResult<String>> + Send + 'static {
    try_stream! {
        let mut decoder = SseDecoder::new();
        let mut finished = false;

        while !finished {
            let next = match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, body.next())
                    .await
                    .map_err(|_| AIError::Timeout)?,
                None => body.next().await,
            };

            let lines = match next {
                Some(chunk) => decoder.push(&chunk?),
                None => {
                    finished = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for line in lines {
                match adapter.parse_stream_line(&line) {
                    StreamEvent::Delta(text) => {
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                    StreamEvent::Done => {
                        finished = true;
                        break;
                    }
                    StreamEvent::Skip => {}
                    StreamEvent::Malformed(reason) => {
                        log::warn!("[{}] Skipping malformed stream line: {}", adapter.id(), reason);
                    }
                    StreamEvent::Error(message) => {
                        Err::<(), AIError>(AIError::StreamError(message))?;
                    }
                }
            }
        }
    }
}

/// Accumulates streamed text and forwards it to the caller's callback
pub struct StreamContext<'a> {
    callback: Option<ChunkCallback<'a>>,
    accumulated_content: String,
}

impl<'a> StreamContext<'a> {
    pub fn new(callback: Option<ChunkCallback<'a>>) -> Self {
        Self {
            callback,
            accumulated_content: String::new(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.callback.is_some()
    }

    /// Emit a token and accumulate content
    pub fn emit_token(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        self.accumulated_content.push_str(token);
        if let Some(callback) = self.callback.as_mut() {
            callback(token);
        }
    }

    /// Get accumulated content
    pub fn get_content(&self) -> &str {
        &self.accumulated_content
    }

    /// Replace accumulated content without emitting (non-streaming results)
    pub fn set_content(&mut self, content: String) {
        self.accumulated_content = content;
    }

    pub fn into_content(self) -> String {
        self.accumulated_content
    }
}

/// Replays a finished text as a sequence of deltas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedStream {
    pub chunk_count: usize,
    pub delay: Duration,
}

impl Default for SimulatedStream {
    fn default() -> Self {
        Self {
            chunk_count: 50,
            delay: Duration::from_millis(50),
        }
    }
}

impl SimulatedStream {
    /// Same slicing without pauses
    pub fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Split `text` into at most `chunk_count` slices on char boundaries
    pub fn slices<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let total = text.chars().count();
        if total == 0 {
            return Vec::new();
        }
        let per_chunk = total.div_ceil(self.chunk_count.max(1));

        let mut slices = Vec::new();
        let mut start = 0;
        for (count, (idx, _)) in text.char_indices().enumerate() {
            if count > 0 && count % per_chunk == 0 {
                slices.push(&text[start..idx]);
                start = idx;
            }
        }
        slices.push(&text[start..]);
        slices
    }

    pub async fn replay(&self, text: &str, ctx: &mut StreamContext<'_>) {
        let slices = self.slices(text);
        let last = slices.len().saturating_sub(1);
        for (i, slice) in slices.into_iter().enumerate() {
            ctx.emit_token(slice);
            if i < last && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_handles_split_utf8() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: 你好\n".as_bytes();
        // split inside the first CJK char
        let first = decoder.push(&bytes[..7]);
        assert!(first.is_empty());
        let second = decoder.push(&bytes[7..]);
        assert_eq!(second, vec!["data: 你好".to_string()]);
    }

    #[test]
    fn test_decoder_skips_blank_lines_and_crlf() {
        let mut decoder = SseDecoder::new();
        let lines = decoder.push(b"data: a\r\n\r\ndata: b\n\ndata: c");
        assert_eq!(lines, vec!["data: a", "data: b"]);
        assert_eq!(decoder.finish(), Some("data: c".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_sse_data() {
        assert_eq!(sse_data("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data("event: ping"), None);
    }

    #[test]
    fn test_slices_reassemble_exactly() {
        let text = "摘要内容 with mixed 文字 and ascii ".repeat(7);
        let policy = SimulatedStream::default();
        let slices = policy.slices(&text);
        assert!(slices.len() <= 50);
        assert_eq!(slices.concat(), text);
    }

    #[test]
    fn test_slices_short_text() {
        let slices = SimulatedStream::default().slices("abc");
        assert_eq!(slices, vec!["a", "b", "c"]);
        assert!(SimulatedStream::default().slices("").is_empty());
    }

    #[tokio::test]
    async fn test_replay_emits_all_chunks() {
        let mut seen = Vec::new();
        let mut callback = |chunk: &str| seen.push(chunk.to_string());
        let mut ctx = StreamContext::new(Some(&mut callback));
        SimulatedStream::instant().replay("• 测试要点一\n• 测试要点二", &mut ctx).await;
        let content = ctx.into_content();

        assert_eq!(content, "• 测试要点一\n• 测试要点二");
        assert_eq!(seen.concat(), content);
    }

    #[test]
    fn test_context_without_callback() {
        let mut ctx = StreamContext::new(None);
        assert!(!ctx.is_streaming());
        ctx.emit_token("a");
        ctx.emit_token("");
        ctx.emit_token("b");
        assert_eq!(ctx.get_content(), "ab");
    }
}
