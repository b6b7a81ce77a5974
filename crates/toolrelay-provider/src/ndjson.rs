//! Decoding of Ollama's NDJSON chat stream into text fragments.
//!
//! Each line is `{"message":{"role":"assistant","content":"…"},"done":false}`;
//! the last one has `"done":true`. A line with an `"error"` field reports a
//! failure after the response has started.

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use toolrelay_core::ProviderError;

/// One decoded stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatChunk {
    pub content: String,
    pub done: bool,
}

#[derive(Deserialize)]
struct WireLine {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: String,
}

/// Decode one NDJSON line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ChatChunk>, ProviderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let wire: WireLine =
        serde_json::from_str(line).map_err(|e| ProviderError::Decode(format!("{e}: {line}")))?;
    if let Some(error) = wire.error {
        return Err(ProviderError::Upstream(error));
    }

    Ok(Some(ChatChunk {
        content: wire.message.map(|m| m.content).unwrap_or_default(),
        done: wire.done,
    }))
}

struct DecodeState<S> {
    stream: S,
    buf: BytesMut,
    done: bool,
}

/// Turn a response body into a stream of non-empty content fragments.
///
/// Ends at the `done` line or end of body. The first error ends the stream.
pub(crate) fn content_stream<S, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<String, ProviderError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }

            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                match decode(&line) {
                    Ok(Some(chunk)) => {
                        st.done = chunk.done;
                        if !chunk.content.is_empty() {
                            return Some((Ok(chunk.content), st));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        st.done = true;
                        return Some((Err(e), st));
                    }
                }
                continue;
            }

            match st.stream.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "chat stream interrupted");
                    st.done = true;
                    return Some((Err(ProviderError::Http(e.to_string())), st));
                }
                None => {
                    // Body ended; a final line may lack its newline.
                    st.done = true;
                    let rest = st.buf.split();
                    match decode(&rest) {
                        Ok(Some(chunk)) if !chunk.content.is_empty() => {
                            return Some((Ok(chunk.content), st));
                        }
                        Ok(_) => return None,
                        Err(e) => return Some((Err(e), st)),
                    }
                }
            }
        }
    })
}

fn decode(line: &[u8]) -> Result<Option<ChatChunk>, ProviderError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| ProviderError::Decode(format!("invalid UTF-8 in stream: {e}")))?;
    parse_line(text)
}

/// Position just past the next newline.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    async fn collect(parts: &[&'static str]) -> Vec<Result<String, ProviderError>> {
        let chunks: Vec<Result<Bytes, String>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        content_stream(stream::iter(chunks)).collect().await
    }

    #[test]
    fn test_parse_content_line() {
        let chunk = parse_line(r#"{"model":"m","message":{"role":"assistant","content":"Hi"},"done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk, ChatChunk { content: "Hi".into(), done: false });
    }

    #[test]
    fn test_parse_done_line_without_message() {
        let chunk = parse_line(r#"{"done":true,"done_reason":"stop"}"#).unwrap().unwrap();
        assert!(chunk.done);
        assert!(chunk.content.is_empty());
    }

    #[test]
    fn test_parse_blank_and_error_lines() {
        assert_eq!(parse_line("  \r").unwrap(), None);
        assert!(matches!(
            parse_line(r#"{"error":"model not found"}"#),
            Err(ProviderError::Upstream(msg)) if msg == "model not found"
        ));
        assert!(matches!(parse_line("not json"), Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let items = collect(&[
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n{\"message\":{\"con",
            "tent\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}\n",
        ])
        .await;
        let texts: Vec<_> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_stops_at_done() {
        let items = collect(&[
            "{\"message\":{\"content\":\"a\"},\"done\":true}\n{\"message\":{\"content\":\"b\"},\"done\":false}\n",
        ])
        .await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let items = collect(&["{\"message\":{\"content\":\"tail\"},\"done\":false}"]).await;
        assert_eq!(items.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec!["tail"]);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let line = "{\"message\":{\"content\":\"é\"},\"done\":false}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xc3).unwrap() + 1;
        let parts = vec![
            Ok::<_, String>(Bytes::copy_from_slice(&line[..split])),
            Ok(Bytes::copy_from_slice(&line[split..])),
        ];
        let items: Vec<_> = content_stream(stream::iter(parts)).collect().await;
        assert_eq!(items.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec!["é"]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let parts = vec![
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"x\"},\"done\":false}\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"y\"},\"done\":false}\n")),
        ];
        let items: Vec<_> = content_stream(stream::iter(parts)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(ProviderError::Http(msg)) if msg == "connection reset"));
    }
}
