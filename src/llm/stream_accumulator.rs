// ABOUTME: Utilities that turn streamed bodies into text - line framing for
// ABOUTME: NDJSON/SSE bytes and accumulation of text fragments into one answer.

use futures::StreamExt;
use tracing::debug;

use super::TextStream;
use crate::error::LlmError;

/// Accumulates streamed text fragments into the final answer.
///
/// Feed fragments via [`push`](Self::push) and call
/// [`into_text`](Self::into_text) to retrieve the joined text.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    text: String,
    chunks: usize,
}

impl TextAccumulator {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment. Fragments are joined with no separator.
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.chunks += 1;
    }

    /// Number of fragments seen so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Consume the accumulator and return the joined text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Drain a text stream to completion.
///
/// The first error aborts the drain; nothing collected so far is returned.
pub async fn collect_text(mut stream: TextStream) -> Result<String, LlmError> {
    let mut acc = TextAccumulator::new();
    while let Some(fragment) = stream.next().await {
        acc.push(&fragment?);
    }
    debug!(chunks = acc.chunk_count(), "Stream drained");
    Ok(acc.into_text())
}

/// Splits a byte stream into trimmed, non-empty lines.
///
/// Lines are decoded only once complete, so multi-byte characters split
/// across network chunks survive.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Return the unterminated remainder, if any, once the body has ended.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        if rest.is_empty() { None } else { Some(rest) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(items: Vec<Result<String, LlmError>>) -> TextStream {
        Box::pin(futures::stream::iter(items))
    }

    #[test]
    fn test_accumulate_text_only() {
        let mut acc = TextAccumulator::new();
        acc.push("Hello");
        acc.push(" ");
        acc.push("world");

        assert_eq!(acc.chunk_count(), 3);
        assert_eq!(acc.into_text(), "Hello world");
    }

    #[test]
    fn test_accumulate_keeps_whitespace_untouched() {
        let mut acc = TextAccumulator::new();
        acc.push("  a\n");
        acc.push("\tb  ");
        assert_eq!(acc.into_text(), "  a\n\tb  ");
    }

    #[tokio::test]
    async fn test_collect_text_in_arrival_order() {
        let stream = stream_of(vec![Ok("one ".into()), Ok("two ".into()), Ok("three".into())]);
        let text = collect_text(stream).await.unwrap();
        assert_eq!(text, "one two three");
    }

    #[tokio::test]
    async fn test_collect_text_empty_stream() {
        let text = collect_text(stream_of(vec![])).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_collect_text_stops_at_first_error() {
        let stream = stream_of(vec![
            Ok("partial".into()),
            Err(LlmError::StreamClosed),
            Ok("never seen".into()),
        ]);
        let result = collect_text(stream).await;
        tokio_test::assert_err!(result);
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut lines = LineBuffer::new();
        assert!(lines.push(b"{\"a\":").is_empty());
        assert_eq!(lines.push(b"1}\n{\"b\":2}\n"), vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(lines.finish().is_none());
    }

    #[test]
    fn test_line_buffer_skips_blank_lines() {
        let mut lines = LineBuffer::new();
        assert_eq!(lines.push(b"data: x\r\n\r\n\ndata: y\n"), vec!["data: x", "data: y"]);
    }

    #[test]
    fn test_line_buffer_keeps_split_multibyte_char() {
        let mut lines = LineBuffer::new();
        let bytes = "grüß\n".as_bytes();
        assert!(lines.push(&bytes[..3]).is_empty());
        assert_eq!(lines.push(&bytes[3..]), vec!["grüß"]);
    }

    #[test]
    fn test_line_buffer_returns_unterminated_tail() {
        let mut lines = LineBuffer::new();
        assert_eq!(lines.push(b"first\nsecond"), vec!["first"]);
        assert_eq!(lines.finish().as_deref(), Some("second"));
    }
}
