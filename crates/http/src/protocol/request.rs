//! Incremental HTTP request parsing.
//!
//! A [`Request`] is built up in place as bytes arrive. Each call to
//! [`Request::parse`] consumes only complete elements (the request line, one
//! header line at a time, whatever body bytes are available) and reports how
//! many bytes it used, leaving the unconsumed tail for the caller to resend once
//! more input has been read.

use bytes::BytesMut;
use http::{Method, Version};
use tracing::trace;

use crate::ensure;
use crate::protocol::{HeaderTable, ParseError};
use crate::utils::find_crlf;

/// The version every accepted request line must name.
const HTTP_11: &str = "HTTP/1.1";

/// Parse progress of a [`Request`]. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserState {
    #[default]
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    version: Version,
}

impl RequestLine {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request target exactly as it appeared on the wire.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Always [`Version::HTTP_11`] once the line has been validated.
    pub fn version(&self) -> Version {
        self.version
    }
}

impl Default for RequestLine {
    fn default() -> Self {
        Self { method: Method::GET, target: String::new(), version: Version::HTTP_11 }
    }
}

#[derive(Debug, Default)]
pub struct Request {
    request_line: RequestLine,
    headers: HeaderTable,
    body: BytesMut,

    state: ParserState,
    body_read: usize,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    pub fn method(&self) -> &Method {
        self.request_line.method()
    }

    pub fn target(&self) -> &str {
        self.request_line.target()
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Feeds `data` to the parser, returning how many bytes were consumed.
    ///
    /// Steps through the parser states until one step consumes nothing (more
    /// input is needed) or the request is complete. Bytes that were not consumed
    /// must be offered again, followed by newly read data, on the next call.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] raised by a step, or
    /// [`ParseError::AlreadyDone`] when called on a completed request.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        ensure!(!self.is_done(), ParseError::AlreadyDone);

        let mut parsed = 0;
        while !self.is_done() {
            let n = self.parse_single(&data[parsed..])?;
            parsed += n;
            if n == 0 {
                break;
            }
        }
        Ok(parsed)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParserState::Initialized => {
                let Some(idx) = find_crlf(data) else {
                    return Ok(0);
                };

                self.request_line = parse_request_line(&data[..idx])?;
                self.transition(ParserState::ParsingHeaders);
                Ok(idx + 2)
            }

            ParserState::ParsingHeaders => {
                let (n, done) = self.headers.parse(data)?;
                if done {
                    self.transition(ParserState::ParsingBody);
                }
                Ok(n)
            }

            ParserState::ParsingBody => {
                // without content-length the body is empty, anything offered is dropped
                let Some(content_length) = self.headers.get(http::header::CONTENT_LENGTH.as_str()) else {
                    self.transition(ParserState::Done);
                    return Ok(data.len());
                };

                let content_length = content_length
                    .parse::<usize>()
                    .map_err(|_e| ParseError::invalid_content_length(format!("value {content_length} is not usize")))?;

                self.body.extend_from_slice(data);
                self.body_read += data.len();

                ensure!(self.body_read <= content_length, ParseError::body_overflow(content_length, self.body_read));
                if self.body_read == content_length {
                    self.transition(ParserState::Done);
                }
                Ok(data.len())
            }

            ParserState::Done => Err(ParseError::AlreadyDone),
        }
    }

    fn transition(&mut self, next: ParserState) {
        trace!(from = ?self.state, to = ?next, "request parser transition");
        self.state = next;
    }
}

fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    // the target is opaque, bytes that are not utf-8 become U+FFFD
    let line = String::from_utf8_lossy(line);

    let fields = line.split_whitespace().collect::<Vec<_>>();
    let [method, target, version] = fields[..] else {
        return Err(ParseError::invalid_request_line(format!("request-line missing fields: {line}")));
    };

    // must end in uppercase letters, e.g. `GET` or `M-SEARCH`; the token grammar is left to `Method`
    ensure!(method.bytes().last().is_some_and(|b| b.is_ascii_uppercase()), ParseError::InvalidMethod(method.to_owned()));
    ensure!(version.contains(HTTP_11), ParseError::InvalidVersion(version.to_owned()));

    let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod(method.to_owned()))?;

    Ok(RequestLine { method, target: target.to_owned(), version: Version::HTTP_11 })
}
