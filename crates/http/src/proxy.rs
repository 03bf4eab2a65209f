//! Streams an upstream body to the client as a chunked response with integrity trailers.
//!
//! The upstream is anything readable. Its bytes are forwarded in fixed-size
//! blocks, each one as its own chunk, while a running SHA-256 digest and byte
//! count are kept. Once the upstream reports end-of-data the terminal chunk is
//! written followed by the `X-Content-SHA256` and `X-Content-Length` trailers.
//!
//! If the upstream fails midway the response is abandoned as it is: no terminal
//! chunk and no trailers, so the client only sees the connection close on an
//! unterminated chunked body.

use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, TRAILER, TRANSFER_ENCODING};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, error, info};

use crate::connection::ResponseWriter;
use crate::protocol::{HeaderTable, SendError};

/// Size of the blocks read from the upstream, each is forwarded as one chunk.
pub const DEFAULT_BLOCK_SIZE: usize = 32;

pub const X_CONTENT_SHA256: HeaderName = HeaderName::from_static("x-content-sha256");
pub const X_CONTENT_LENGTH: HeaderName = HeaderName::from_static("x-content-length");

/// Value of the `Trailer` header announcing the integrity trailers.
const DECLARED_TRAILERS: &str = "X-Content-SHA256, X-Content-Length";

/// A response body being fetched from somewhere else.
#[derive(Debug)]
pub struct Upstream<R> {
    content_type: Option<String>,
    body: R,
}

impl<R> Upstream<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(body: R) -> Self {
        Self { content_type: None, body }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// What was forwarded once the upstream finished cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOutcome {
    pub sha256: String,
    pub length: usize,
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream error after {forwarded} bytes: {source}")]
    Upstream { forwarded: usize, source: std::io::Error },

    #[error("response error: {source}")]
    Response {
        #[from]
        source: SendError,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkedProxy {
    block_size: usize,
}

impl Default for ChunkedProxy {
    fn default() -> Self {
        Self { block_size: DEFAULT_BLOCK_SIZE }
    }
}

impl ChunkedProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses blocks of `block_size` bytes, at least one.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Streams `upstream` through `writer`, starting from the handler's `headers`.
    ///
    /// `headers` is adjusted for a chunked response (`Content-Type` taken from the
    /// upstream, `Content-Length` dropped, `Transfer-Encoding` and `Trailer` set)
    /// and receives the trailer values before they are written.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::Upstream`] if reading the upstream failed; the chunked body
    ///   is left unterminated
    /// - [`ProxyError::Response`] if writing to the client failed
    pub async fn stream<R, W>(
        &self,
        writer: &mut ResponseWriter<W>,
        headers: &mut HeaderTable,
        mut upstream: Upstream<R>,
    ) -> Result<ProxyOutcome, ProxyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(content_type) = upstream.content_type.take() {
            headers.insert(CONTENT_TYPE, content_type);
        }
        headers.remove(CONTENT_LENGTH.as_str());
        headers.insert(TRANSFER_ENCODING, "chunked");
        headers.insert(TRAILER, DECLARED_TRAILERS);

        writer.write_status_line(StatusCode::OK).await?;
        writer.write_headers(headers).await?;

        let mut block = vec![0; self.block_size];
        let mut hasher = Sha256::new();
        let mut length = 0;

        loop {
            let n = match upstream.body.read(&mut block).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error!(cause = %e, forwarded = length, "upstream failed mid-stream, abandon chunked body");
                    return Err(ProxyError::Upstream { forwarded: length, source: e });
                }
            };

            hasher.update(&block[..n]);
            length += n;
            writer.write_chunked_body(&block[..n]).await?;
            debug!(n, forwarded = length, "forwarded upstream block");
        }

        let outcome = ProxyOutcome { sha256: format!("{:x}", hasher.finalize()), length };

        writer.write_chunked_body_done().await?;
        headers.insert(X_CONTENT_SHA256, outcome.sha256.clone());
        headers.insert(X_CONTENT_LENGTH, outcome.length.to_string());
        writer.write_trailers(headers).await?;

        info!(length = outcome.length, sha256 = outcome.sha256.as_str(), "finished streaming upstream");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::WriterState;
    use crate::connection::default_headers;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Yields `data` and then fails instead of reporting end-of-data.
    struct BrokenUpstream {
        data: Vec<u8>,
    }

    impl AsyncRead for BrokenUpstream {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            if self.data.is_empty() {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream reset")));
            }
            let n = self.data.len().min(buf.remaining());
            let rest = self.data.split_off(n);
            buf.put_slice(&self.data);
            self.data = rest;
            Poll::Ready(Ok(()))
        }
    }

    /// Splits a chunked body into its chunk payloads and whatever follows the terminal chunk.
    fn split_chunks(mut body: &[u8]) -> (Vec<Vec<u8>>, &[u8]) {
        let mut chunks = Vec::new();
        loop {
            let line_end = body.windows(2).position(|w| w == b"\r\n").unwrap();
            let size = usize::from_str_radix(std::str::from_utf8(&body[..line_end]).unwrap(), 16).unwrap();
            body = &body[line_end + 2..];
            if size == 0 {
                return (chunks, body);
            }
            chunks.push(body[..size].to_vec());
            assert_eq!(&body[size..size + 2], b"\r\n");
            body = &body[size + 2..];
        }
    }

    #[tokio::test]
    async fn stream_forwards_blocks_and_trailers() {
        let payload = (0..100u8).collect::<Vec<_>>();
        let mut writer = ResponseWriter::new(Vec::new());
        let mut headers = default_headers(0);

        let outcome = ChunkedProxy::new()
            .stream(&mut writer, &mut headers, Upstream::new(&payload[..]).with_content_type("application/json"))
            .await
            .unwrap();

        let expected_sha = format!("{:x}", Sha256::digest(&payload));
        assert_eq!(outcome, ProxyOutcome { sha256: expected_sha.clone(), length: 100 });
        assert_eq!(writer.state(), WriterState::Finished);

        let output = writer.into_inner();
        let header_end = output.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let head = std::str::from_utf8(&output[..header_end]).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("content-type: application/json\r\n"));
        assert!(head.contains("transfer-encoding: chunked\r\n"));
        assert!(head.contains("trailer: X-Content-SHA256, X-Content-Length\r\n"));
        assert!(!head.contains("content-length"));

        let (chunks, trailers) = split_chunks(&output[header_end..]);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![32, 32, 32, 4]);
        assert_eq!(chunks.concat(), payload);
        assert_eq!(trailers, format!("X-Content-SHA256: {expected_sha}\r\nX-Content-Length: 100\r\n\r\n").as_bytes());
    }

    #[tokio::test]
    async fn stream_empty_upstream() {
        let mut writer = ResponseWriter::new(Vec::new());
        let mut headers = HeaderTable::new();

        let outcome = ChunkedProxy::new().stream(&mut writer, &mut headers, Upstream::new(&b""[..])).await.unwrap();

        assert_eq!(outcome.length, 0);
        assert_eq!(outcome.sha256, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert!(!headers.contains("content-type"));
        let output = writer.into_inner();
        assert!(output.ends_with(b"\r\n\r\n0\r\nX-Content-SHA256: e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\r\nX-Content-Length: 0\r\n\r\n"));
    }

    #[tokio::test]
    async fn stream_respects_block_size() {
        let payload = b"hello chunked world";
        let mut writer = ResponseWriter::new(Vec::new());
        let mut headers = HeaderTable::new();

        ChunkedProxy::new().block_size(5).stream(&mut writer, &mut headers, Upstream::new(&payload[..])).await.unwrap();

        let output = writer.into_inner();
        let header_end = output.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let (chunks, _) = split_chunks(&output[header_end..]);
        assert_eq!(chunks, vec![b"hello".to_vec(), b" chun".to_vec(), b"ked w".to_vec(), b"orld".to_vec()]);
    }

    // the client cannot tell a broken upstream apart from a dropped connection
    #[tokio::test]
    async fn stream_upstream_failure_leaves_body_unterminated() {
        let mut writer = ResponseWriter::new(Vec::new());
        let mut headers = HeaderTable::new();
        let upstream = Upstream::new(BrokenUpstream { data: b"first bytes".to_vec() });

        let result = ChunkedProxy::new().stream(&mut writer, &mut headers, upstream).await;

        assert!(matches!(result, Err(ProxyError::Upstream { forwarded: 11, .. })));
        assert_eq!(writer.state(), WriterState::Body);
        assert!(!headers.contains("x-content-sha256"));

        let output = writer.into_inner();
        assert!(output.ends_with(b"\r\n\r\nb\r\nfirst bytes\r\n"));
        assert!(!output.ends_with(b"0\r\n"));
    }
}
