//! Case-insensitive header table with incremental line parsing.
//!
//! [`HeaderTable`] wraps an `http::HeaderMap<String>` so that every name is
//! validated against the token grammar and folded to lowercase at the boundary.
//! Repeated names never produce a second entry: the new value is appended to the
//! old one separated by `", "`, both when parsing header lines and through
//! [`HeaderTable::add`].
//!
//! Values are kept as text. Bytes of a parsed value that are not UTF-8 (obs-text
//! such as Latin-1) are replaced with U+FFFD rather than failing the request.

use http::HeaderMap;
use http::header::{Entry, HeaderName};
use tracing::trace;

use crate::protocol::ParseError;
use crate::utils::{find_crlf, has_line_break};
use crate::ensure;

/// Separator used when folding repeated header values into one entry.
const FOLD_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    inner: HeaderMap<String>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// # Returns
    ///
    /// - `Ok((0, false))` if `data` holds no complete line yet
    /// - `Ok((2, true))` if `data` starts with the blank line ending the header section
    /// - `Ok((n, false))` after storing one header, `n` being the line length including CRLF
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidHeader`] if the line is malformed: a missing colon,
    /// whitespace between the name and the colon, an empty name, or a name with
    /// characters outside the token grammar.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(idx) = find_crlf(data) else {
            return Ok((0, false));
        };

        if idx == 0 {
            return Ok((2, true));
        }

        let (name, value) = parse_header_line(&data[..idx])?;
        trace!(name = name.as_str(), value = value.as_str(), "parsed header line");
        self.fold(name, value)?;

        Ok((idx + 2, false))
    }

    /// Returns the value stored under `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
        self.inner.get(&name).map(String::as_str)
    }

    /// Stores `value` under `name`, replacing any existing value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), ParseError> {
        let name = header_name(name.as_bytes())?;
        let value = header_value(value.into())?;
        self.inner.try_insert(name, value).map_err(ParseError::invalid_header)?;
        Ok(())
    }

    /// Stores `value` under an already validated `name`, replacing any existing value.
    ///
    /// The value is not checked here; the response encoder refuses to write a
    /// value holding CR or LF.
    pub fn insert(&mut self, name: HeaderName, value: impl Into<String>) {
        self.inner.insert(name, value.into());
    }

    /// Stores `value` under `name`, folding it into an existing value with `", "`.
    pub fn add(&mut self, name: &str, value: impl Into<String>) -> Result<(), ParseError> {
        let name = header_name(name.as_bytes())?;
        let value = header_value(value.into())?;
        self.fold(name, value)
    }

    /// Removes `name` from the table, doing nothing when it is absent.
    pub fn remove(&mut self, name: &str) {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            self.inner.remove(&name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over `(lowercase name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn fold(&mut self, name: HeaderName, value: String) -> Result<(), ParseError> {
        match self.inner.try_entry(name).map_err(ParseError::invalid_header)? {
            Entry::Occupied(mut entry) => {
                let old = entry.get_mut();
                old.push_str(FOLD_SEPARATOR);
                old.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.try_insert(value).map_err(ParseError::invalid_header)?;
            }
        }
        Ok(())
    }
}

fn parse_header_line(line: &[u8]) -> Result<(HeaderName, String), ParseError> {
    let colon = match line.iter().position(|&b| b == b':') {
        Some(idx) if idx > 0 => idx,
        _ => return Err(ParseError::invalid_header(format!("improper header line: {}", String::from_utf8_lossy(line)))),
    };

    ensure!(
        !line[colon - 1].is_ascii_whitespace(),
        ParseError::invalid_header(format!("whitespace before colon: {}", String::from_utf8_lossy(line)))
    );

    let name = header_name(line[..colon].trim_ascii())?;
    let value = String::from_utf8_lossy(line[colon + 1..].trim_ascii()).into_owned();

    Ok((name, value))
}

/// Validates `name` against the token grammar and folds it to lowercase.
fn header_name(name: &[u8]) -> Result<HeaderName, ParseError> {
    ensure!(
        !name.is_empty() && name.iter().copied().all(is_token_char),
        ParseError::invalid_header(format!("improper key value: {}", String::from_utf8_lossy(name)))
    );

    HeaderName::from_bytes(name).map_err(ParseError::invalid_header)
}

/// Rejects values that would break out of their header line.
fn header_value(value: String) -> Result<String, ParseError> {
    ensure!(!has_line_break(&value), ParseError::invalid_header(format!("line break in header value: {value:?}")));
    Ok(value)
}

/// `[A-Za-z0-9!#$%&'*+\-.^_`|~]`
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
