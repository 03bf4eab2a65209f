use bytes::BytesMut;
use http::StatusCode;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

use crate::codec::{ResponseEncoder, ResponsePart, WriterState};
use crate::protocol::{HeaderTable, SendError};

const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Writes a response to `W`, one part per call, in the order the protocol allows.
///
/// Every call encodes its part into an internal buffer and flushes that buffer
/// to the sink before returning, so the peer sees parts in call order. A call
/// made in the wrong [`WriterState`] fails with [`SendError::InvalidState`] and
/// writes nothing.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
    buffer: BytesMut,
    encoder: ResponseEncoder,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), encoder: ResponseEncoder::new() }
    }

    pub fn state(&self) -> WriterState {
        self.encoder.state()
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), SendError> {
        self.write(ResponsePart::StatusLine(status)).await.map(|_| ())
    }

    /// Writes one line per header followed by the blank line ending the header section.
    pub async fn write_headers(&mut self, headers: &HeaderTable) -> Result<(), SendError> {
        self.write(ResponsePart::Headers(headers)).await.map(|_| ())
    }

    /// Writes `body` verbatim, may be called repeatedly.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, SendError> {
        self.write(ResponsePart::Body(body)).await
    }

    /// Writes `chunk` framed as one chunk, returning the number of bytes put on the wire.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, SendError> {
        self.write(ResponsePart::Chunk(chunk)).await
    }

    /// Writes the terminal `0\r\n` chunk, after which only trailers may follow.
    pub async fn write_chunked_body_done(&mut self) -> Result<usize, SendError> {
        self.write(ResponsePart::ChunkedDone).await
    }

    /// Writes the fields named by the `Trailer` header of `headers`, then the final blank line.
    pub async fn write_trailers(&mut self, headers: &HeaderTable) -> Result<(), SendError> {
        self.write(ResponsePart::Trailers(headers)).await.map(|_| ())
    }

    async fn write(&mut self, part: ResponsePart<'_>) -> Result<usize, SendError> {
        self.encoder.encode(part, &mut self.buffer)?;
        let written = self.buffer.len();
        self.flush().await?;
        Ok(written)
    }

    #[inline]
    async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let result = self.writer.write_all(self.buffer.as_ref()).await;
        self.buffer.clear();
        result?;
        Ok(self.writer.flush().await?)
    }
}

/// Headers for a plain `text/plain` response of `content_length` bytes that closes the connection.
pub fn default_headers(content_length: usize) -> HeaderTable {
    let mut headers = HeaderTable::new();
    headers.insert(CONTENT_LENGTH, content_length.to_string());
    headers.insert(CONNECTION, "close");
    headers.insert(CONTENT_TYPE, mime::TEXT_PLAIN.essence_str());
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_content() {
        let mut headers = default_headers(42);

        assert_eq!(headers.get("Content-Length"), Some("42"));
        assert_eq!(headers.get("Connection"), Some("close"));
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));

        headers.set("Content-Type", "text/html").unwrap();
        assert_eq!(headers.get("content-type"), Some("text/html"));
    }

    #[tokio::test]
    async fn full_plain_response() {
        let mut writer = ResponseWriter::new(Vec::new());
        let body = b"Hello World!";

        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers(&default_headers(body.len())).await.unwrap();
        let n = writer.write_body(body).await.unwrap();

        assert_eq!(n, body.len());
        assert_eq!(
            writer.into_inner(),
            b"HTTP/1.1 200 OK\r\ncontent-length: 12\r\nconnection: close\r\ncontent-type: text/plain\r\n\r\nHello World!"
        );
    }

    #[tokio::test]
    async fn chunked_response_with_trailers() {
        let mut headers = HeaderTable::new();
        headers.set("Transfer-Encoding", "chunked").unwrap();
        headers.set("Trailer", "X-Checksum").unwrap();
        let mut writer = ResponseWriter::new(Vec::new());

        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers(&headers).await.unwrap();
        assert_eq!(writer.write_chunked_body(b"abc").await.unwrap(), 8);
        assert_eq!(writer.write_chunked_body(b"").await.unwrap(), 0);
        assert_eq!(writer.write_chunked_body(b"de").await.unwrap(), 7);
        assert_eq!(writer.write_chunked_body_done().await.unwrap(), 3);
        headers.set("X-Checksum", "5").unwrap();
        writer.write_trailers(&headers).await.unwrap();

        assert_eq!(writer.state(), WriterState::Finished);
        let expected = "HTTP/1.1 200 OK\r\n\
                        transfer-encoding: chunked\r\n\
                        trailer: X-Checksum\r\n\
                        \r\n\
                        3\r\nabc\r\n\
                        2\r\nde\r\n\
                        0\r\n\
                        X-Checksum: 5\r\n\
                        \r\n";
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), expected);
    }

    #[tokio::test]
    async fn out_of_order_calls_write_nothing() {
        let mut writer = ResponseWriter::new(Vec::new());

        assert!(matches!(writer.write_body(b"too early").await, Err(SendError::InvalidState { .. })));
        assert!(matches!(writer.write_headers(&HeaderTable::new()).await, Err(SendError::InvalidState { .. })));
        assert!(matches!(writer.write_chunked_body_done().await, Err(SendError::InvalidState { .. })));
        assert!(matches!(writer.write_trailers(&HeaderTable::new()).await, Err(SendError::InvalidState { .. })));
        assert!(writer.get_mut().is_empty());

        writer.write_status_line(StatusCode::BAD_REQUEST).await.unwrap();
        assert!(matches!(writer.write_status_line(StatusCode::OK).await, Err(SendError::InvalidState { .. })));
        assert!(matches!(writer.write_chunked_body(b"x").await, Err(SendError::InvalidState { .. })));

        assert_eq!(writer.into_inner(), b"HTTP/1.1 400 Bad Request\r\n");
    }

    #[tokio::test]
    async fn nothing_is_accepted_after_trailers() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers(&HeaderTable::new()).await.unwrap();
        writer.write_chunked_body_done().await.unwrap();
        writer.write_trailers(&HeaderTable::new()).await.unwrap();
        let written = writer.get_mut().len();

        assert!(matches!(writer.write_trailers(&HeaderTable::new()).await, Err(SendError::InvalidState { .. })));
        assert!(matches!(writer.write_body(b"late").await, Err(SendError::InvalidState { .. })));
        assert_eq!(writer.get_mut().len(), written);
    }
}
