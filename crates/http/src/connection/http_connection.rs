use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info};

use crate::codec::{DEFAULT_READ_BUFFER_CAPACITY, read_request_with_capacity};
use crate::connection::ResponseWriter;
use crate::handler::Handler;
use crate::protocol::HttpError;

/// A single-request HTTP connection.
///
/// `HttpConnection` reads exactly one request from `R`, hands it to a
/// [`Handler`] together with a [`ResponseWriter`] over `W`, and is consumed by
/// [`HttpConnection::process`]. Dropping the halves afterwards closes the
/// connection; keep-alive is not supported.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    reader: R,
    writer: W,
    read_buffer_capacity: usize,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_capacity(reader, writer, DEFAULT_READ_BUFFER_CAPACITY)
    }

    pub fn with_capacity(reader: R, writer: W, read_buffer_capacity: usize) -> Self {
        Self { reader, writer, read_buffer_capacity }
    }

    /// Parses one request and runs `handler` on it.
    ///
    /// # Errors
    ///
    /// - [`HttpError::RequestError`] if the request could not be parsed, in which
    ///   case nothing has been written to the peer
    /// - [`HttpError::HandlerError`] if the handler failed, whatever it already
    ///   wrote stays on the wire
    pub async fn process<H>(self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler<W>,
    {
        let request = match read_request_with_capacity(self.reader, self.read_buffer_capacity).await {
            Ok(request) => request,
            Err(e) => {
                error!(cause = %e, "can't parse request, abandon connection");
                return Err(e.into());
            }
        };

        info!(method = %request.method(), target = request.target(), "received request");

        let writer = ResponseWriter::new(self.writer);
        handler.call(request, writer).await.map_err(HttpError::handler)
    }
}
