//! TCP server running one task per connection.
//!
//! [`Server::start`] binds a listener from a [`ServerConfig`] and returns a
//! handle once it is ready; [`Server::serve`] does the same for a bare port.
//! Connections are accepted until [`Server::close`] is called.

mod config;
#[allow(clippy::module_inception, reason = "server::Server mirrors the handle's name")]
mod server;

pub use config::DEFAULT_HOST;
pub use config::ServerBuildError;
pub use config::ServerBuilder;
pub use config::ServerConfig;
pub use server::Server;
