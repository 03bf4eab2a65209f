//! HTTP connection handling module
//!
//! This module ties the request parser and the response writer to a byte
//! stream. Each connection serves exactly one request and is closed afterwards.
//!
//! # Components
//!
//! - [`HttpConnection`]: Reads one request and runs the handler on it
//! - [`ResponseWriter`]: Writes a response in the only order the protocol allows:
//!   status line, headers, then a plain or chunked body, then trailers
//! - [`default_headers`]: The header set of a plain `text/plain` response

mod http_connection;
mod response_writer;

pub use http_connection::HttpConnection;
pub use response_writer::ResponseWriter;
pub use response_writer::default_headers;
