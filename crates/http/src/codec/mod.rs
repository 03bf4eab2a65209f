//! HTTP codec module for decoding requests and encoding responses
//!
//! Both directions are implemented as `tokio_util` codecs operating on
//! `BytesMut` buffers, so they never touch a socket themselves.
//!
//! # Components
//!
//! - [`RequestDecoder`]: Feeds buffered bytes to the incremental request parser
//!   and yields the request once it is complete; [`read_request`] drives it over
//!   any `AsyncRead`
//! - [`ResponseEncoder`]: Encodes [`ResponsePart`]s while enforcing the
//!   [`WriterState`] order, including chunked bodies and trailers
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use http::StatusCode;
//! use httpfromtcp::codec::{ResponseEncoder, ResponsePart};
//! use tokio_util::codec::Encoder;
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut buffer = BytesMut::new();
//! encoder.encode(ResponsePart::StatusLine(StatusCode::OK), &mut buffer).unwrap();
//! assert_eq!(&buffer[..], b"HTTP/1.1 200 OK\r\n");
//! ```

mod request_decoder;
mod response_encoder;

pub use request_decoder::DEFAULT_READ_BUFFER_CAPACITY;
pub use request_decoder::RequestDecoder;
pub use request_decoder::read_request;
pub use request_decoder::read_request_with_capacity;
pub use response_encoder::ResponseEncoder;
pub use response_encoder::ResponsePart;
pub use response_encoder::WriterState;
pub use response_encoder::reason_phrase;
