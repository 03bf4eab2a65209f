//! HTTP request decoder module
//!
//! This module adapts the incremental [`Request`] parser to `tokio_util`'s
//! [`Decoder`] so that a [`FramedRead`] can own the read loop: it reads from the
//! stream into the unfilled tail of a growing `BytesMut`, offers the filled
//! region to the parser, and keeps whatever the parser did not consume at the
//! front of the buffer for the next round.
//!
//! # Example
//!
//! ```no_run
//! use httpfromtcp::codec::read_request;
//!
//! # async fn run(stream: tokio::net::TcpStream) -> Result<(), httpfromtcp::protocol::ParseError> {
//! let request = read_request(stream).await?;
//! println!("{} {}", request.method(), request.target());
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::trace;

use crate::protocol::{ParseError, Request};

/// Initial capacity of the read buffer, it grows whenever it fills up.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// A decoder yielding one complete [`Request`] once the parser reaches `Done`.
///
/// The request under construction lives inside the decoder between calls, so
/// partial state survives across reads.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    request: Request,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Offers the buffered bytes to the parser and drops the consumed prefix.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: the request is complete
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the bytes do not form a valid request
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let consumed = self.request.parse(src)?;
        src.advance(consumed);
        trace!(consumed, remaining = src.len(), state = ?self.request.state(), "decoded request bytes");

        if self.request.is_done() {
            return Ok(Some(std::mem::take(&mut self.request)));
        }
        Ok(None)
    }

    /// Called once the stream hit end-of-input, anything short of a full request is an error.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None => Err(ParseError::Incomplete),
        }
    }
}

/// Reads exactly one request from `reader`.
///
/// # Errors
///
/// Returns [`ParseError::Incomplete`] if the stream ends before the request is
/// complete, [`ParseError::Io`] on read failures, or any parse error raised by
/// the bytes received.
pub async fn read_request<R>(reader: R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    read_request_with_capacity(reader, DEFAULT_READ_BUFFER_CAPACITY).await
}

/// Same as [`read_request`] with an explicit initial read buffer capacity.
pub async fn read_request_with_capacity<R>(reader: R, capacity: usize) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut framed_read = FramedRead::with_capacity(reader, RequestDecoder::new(), capacity);
    match framed_read.next().await {
        Some(result) => result,
        None => Err(ParseError::Incomplete),
    }
}
