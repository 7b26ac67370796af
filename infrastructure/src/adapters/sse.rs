//! Server-sent-events framing shared by the live adapters.
//!
//! Every supported dialect streams newline-delimited `data:` records over
//! a chunked HTTP response. The response body is wrapped in a
//! [`StreamReader`] and split with a [`LinesCodec`]; payload extraction
//! and end-of-stream markers stay dialect-specific.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

/// Cap on a single SSE line; anything larger is a protocol violation.
const MAX_LINE_BYTES: usize = 1024 * 1024;

pub type SseLines =
    FramedRead<StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes>, LinesCodec>;

/// Split a streaming response body into SSE lines.
pub fn sse_lines(response: reqwest::Response) -> SseLines {
    let bytes = response
        .bytes_stream()
        .map(|r| r.map_err(std::io::Error::other))
        .boxed();
    FramedRead::new(
        StreamReader::new(bytes),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    )
}

/// Extract the payload of a `data:` line, if this is one. Comment lines,
/// `event:` lines, and keep-alive blanks return `None`.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
        .map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_lines_are_extracted() {
        assert_eq!(data_payload("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(data_payload("data:[DONE]"), Some("[DONE]"));
        assert_eq!(data_payload("event: message_stop"), None);
        assert_eq!(data_payload(""), None);
        assert_eq!(data_payload(": keep-alive"), None);
    }
}
