//! Core HTTP protocol types.
//!
//! This module holds the values the engine passes around: the header table,
//! the incrementally parsed request and the error types of every layer.
//!
//! # Components
//!
//! - **Headers** ([`headers`]): [`HeaderTable`], a case-insensitive name/value table
//!   that folds repeated names into one comma-joined value and parses one header
//!   line at a time
//!
//! - **Request Processing** ([`request`]): [`Request`] and its [`ParserState`]
//!   machine, fed with whatever bytes have arrived so far
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error of a connection
//!   - [`ParseError`]: Request parsing errors
//!   - [`SendError`]: Response writing errors
//!   - [`ServerError`]: Listener lifecycle errors

mod headers;
pub use headers::HeaderTable;

mod request;
pub use request::ParserState;
pub use request::Request;
pub use request::RequestLine;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::ServerError;
