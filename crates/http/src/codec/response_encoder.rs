//! HTTP response encoder enforcing the legal order of response parts.
//!
//! A response goes out as status line, headers, then either a plain body or a
//! chunked body followed by trailers. [`ResponseEncoder`] keeps a [`WriterState`]
//! and refuses any [`ResponsePart`] that is not legal in the current state,
//! before a single byte is written to the destination buffer.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::StatusCode;
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::{HeaderTable, SendError};
use crate::utils::has_line_break;

/// Progress of a response. Each part moves it forward at most one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriterState {
    #[default]
    StatusLine,
    Headers,
    Body,
    Trailers,
    /// Trailers have been written, the response is complete.
    Finished,
}

/// One piece of a response handed to the [`ResponseEncoder`].
#[derive(Debug, Clone, Copy)]
pub enum ResponsePart<'a> {
    StatusLine(StatusCode),
    Headers(&'a HeaderTable),
    Body(&'a [u8]),
    Chunk(&'a [u8]),
    ChunkedDone,
    Trailers(&'a HeaderTable),
}

impl ResponsePart<'_> {
    fn required_state(&self) -> WriterState {
        match self {
            ResponsePart::StatusLine(_) => WriterState::StatusLine,
            ResponsePart::Headers(_) => WriterState::Headers,
            ResponsePart::Body(_) | ResponsePart::Chunk(_) | ResponsePart::ChunkedDone => WriterState::Body,
            ResponsePart::Trailers(_) => WriterState::Trailers,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResponseEncoder {
    state: WriterState,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WriterState {
        self.state
    }
}

impl Encoder<ResponsePart<'_>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: ResponsePart<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let expected = item.required_state();
        if self.state != expected {
            error!(state = ?self.state, expected = ?expected, "response part written out of order");
            return Err(SendError::invalid_state(expected, self.state));
        }

        match item {
            ResponsePart::StatusLine(status) => {
                write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_u16(), reason_phrase(status))?;
                self.state = WriterState::Headers;
            }

            ResponsePart::Headers(headers) => {
                ensure_single_line(headers.iter())?;
                for (name, value) in headers.iter() {
                    put_field(dst, name, value);
                }
                dst.put_slice(b"\r\n");
                self.state = WriterState::Body;
            }

            ResponsePart::Body(bytes) => dst.put_slice(bytes),

            // an empty chunk would read as the terminal chunk
            ResponsePart::Chunk([]) => {}

            ResponsePart::Chunk(bytes) => {
                write!(FastWrite(dst), "{:x}\r\n", bytes.len())?;
                dst.reserve(bytes.len() + 2);
                dst.put_slice(bytes);
                dst.put_slice(b"\r\n");
            }

            ResponsePart::ChunkedDone => {
                dst.put_slice(b"0\r\n");
                self.state = WriterState::Trailers;
            }

            ResponsePart::Trailers(headers) => {
                let declared = headers.get(http::header::TRAILER.as_str()).unwrap_or_default();
                let fields = declared
                    .split(',')
                    .map(str::trim)
                    .filter_map(|name| headers.get(name).map(|value| (name, value)))
                    .collect::<Vec<_>>();
                ensure_single_line(fields.iter().copied())?;
                for (name, value) in fields {
                    put_field(dst, name, value);
                }
                dst.put_slice(b"\r\n");
                self.state = WriterState::Finished;
            }
        }

        Ok(())
    }
}

/// Reason phrase for the status line, empty for codes outside the fixed table.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "OK",
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "",
    }
}

/// Fails before anything is written if a value would end its line early.
fn ensure_single_line<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<(), SendError> {
    for (name, value) in fields {
        if has_line_break(value) {
            error!(name, "header value holds a line break, refusing to write it");
            return Err(SendError::invalid_header_value(name));
        }
    }
    Ok(())
}

fn put_field(dst: &mut BytesMut, name: &str, value: &str) {
    dst.reserve(name.len() + value.len() + 4);
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}

/// Adapter letting `write!` format straight into a `BytesMut`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
