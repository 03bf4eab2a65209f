use std::error::Error;
use std::io;
use thiserror::Error;

use crate::codec::WriterState;
use crate::server::ServerBuildError;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("handler error: {source}")]
    HandlerError { source: Box<dyn Error + Send + Sync> },
}

impl HttpError {
    pub fn handler<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::HandlerError { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("invalid http method: {0}")]
    InvalidMethod(String),

    #[error("invalid http version: {0}")]
    InvalidVersion(String),

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("body exceeds content-length, expected {expected} bytes but read {actual}")]
    BodyOverflow { expected: usize, actual: usize },

    #[error("incomplete request")]
    Incomplete,

    #[error("trying to parse data in a done state")]
    AlreadyDone,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn body_overflow(expected: usize, actual: usize) -> Self {
        Self::BodyOverflow { expected, actual }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("writer is in {actual:?} state, expected {expected:?}")]
    InvalidState { expected: WriterState, actual: WriterState },

    #[error("value of header {name} contains a line break")]
    InvalidHeaderValue { name: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_state(expected: WriterState, actual: WriterState) -> Self {
        Self::InvalidState { expected, actual }
    }

    pub fn invalid_header_value<S: ToString>(name: S) -> Self {
        Self::InvalidHeaderValue { name: name.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("bind server error: {source}")]
    Bind {
        #[from]
        source: io::Error,
    },

    #[error("invalid server config: {source}")]
    Config {
        #[from]
        source: ServerBuildError,
    },

    #[error("server already closed")]
    AlreadyClosed,
}
