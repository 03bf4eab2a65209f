//! A small HTTP/1.1 engine built directly on tcp streams
//!
//! This crate parses requests incrementally from whatever bytes have arrived,
//! hands each request to a handler together with a writer that enforces the
//! order of a response, and closes the connection after that single exchange.
//!
//! # Features
//!
//! - Incremental request parsing, independent of how the peer splits its writes
//! - Case-insensitive header table folding repeated names into one value
//! - Fixed-length and chunked response bodies, with trailers
//! - A chunked proxy that forwards any readable upstream and appends
//!   `X-Content-SHA256` and `X-Content-Length` trailers
//! - One task per connection, optional cap on concurrent connections
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use httpfromtcp::connection::{ResponseWriter, default_headers};
//! use httpfromtcp::handler::make_handler;
//! use httpfromtcp::protocol::{Request, SendError};
//! use httpfromtcp::server::Server;
//! use tokio::net::tcp::OwnedWriteHalf;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = Server::serve(42069, make_handler(hello_world)).await.unwrap();
//!     tokio::signal::ctrl_c().await.unwrap();
//!     server.close().await.unwrap();
//! }
//!
//! async fn hello_world(request: Request, mut writer: ResponseWriter<OwnedWriteHalf>) -> Result<(), SendError> {
//!     let body = format!("Hello {}!\n", request.target());
//!     writer.write_status_line(StatusCode::OK).await?;
//!     writer.write_headers(&default_headers(body.len())).await?;
//!     writer.write_body(body.as_bytes()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: Header table, request parser and error types
//! - [`codec`]: `tokio_util` codecs reading requests and encoding response parts
//! - [`connection`]: One request per connection, and the [`connection::ResponseWriter`]
//! - [`handler`]: Request handler trait and [`handler::make_handler`]
//! - [`server`]: Listener, accept loop and its configuration
//! - [`proxy`]: Chunked forwarding of an upstream body with integrity trailers
//!
//! # Limitations
//!
//! - HTTP/1.1 only, one request per connection, no keep-alive
//! - Request bodies are only read when `Content-Length` is present
//! - A malformed request closes the connection without a response

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod proxy;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
