use thiserror::Error;

use crate::codec::DEFAULT_READ_BUFFER_CAPACITY;

/// Host the listener binds to unless told otherwise.
pub const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Debug)]
pub struct ServerBuilder {
    host: String,
    port: Option<u16>,
    max_connections: Option<usize>,
    read_buffer_capacity: usize,
}

impl ServerBuilder {
    pub(crate) fn new() -> Self {
        Self { host: DEFAULT_HOST.to_owned(), port: None, max_connections: None, read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Caps the number of connections handled at once.
    ///
    /// Without a cap every accepted connection gets its own task immediately.
    /// With one, the accept loop stops accepting while the cap is reached, so
    /// further peers wait in the listen backlog.
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = Some(max_connections);
        self
    }

    pub fn read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<ServerConfig, ServerBuildError> {
        let port = self.port.ok_or(ServerBuildError::MissingPort)?;

        if self.max_connections == Some(0) {
            return Err(ServerBuildError::ZeroMaxConnections);
        }
        if self.read_buffer_capacity == 0 {
            return Err(ServerBuildError::ZeroReadBuffer);
        }

        Ok(ServerConfig {
            host: self.host,
            port,
            max_connections: self.max_connections,
            read_buffer_capacity: self.read_buffer_capacity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    host: String,
    port: u16,
    max_connections: Option<usize>,
    read_buffer_capacity: usize,
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    pub fn read_buffer_capacity(&self) -> usize {
        self.read_buffer_capacity
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServerBuildError {
    #[error("port must be set")]
    MissingPort,
    #[error("max connections must be greater than zero")]
    ZeroMaxConnections,
    #[error("read buffer capacity must be greater than zero")]
    ZeroReadBuffer,
}
