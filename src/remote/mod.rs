//! Remote step execution
//!
//! [`RemoteExecutor`] owns one authenticated connection to a build host and
//! runs every command in its own session. The transport is abstracted
//! behind [`Connector`]; [`SshConnector`] is the production implementation.

mod command;
mod config;
mod error;
mod executor;
mod ssh;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{OutputSink, RemoteCommand, export_preamble};
pub use config::{
    AuthMethod, DEFAULT_CONNECT_RETRIES, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RETRY_INTERVAL,
    DEFAULT_USER, DialTarget, RemoteSessionConfig,
};
pub use error::RemoteError;
pub use executor::RemoteExecutor;
pub use ssh::SshConnector;
pub use transport::{Connection, Connector, Session};
