//! Transport seam under [`RemoteExecutor`](super::RemoteExecutor)
//!
//! A [`Connector`] dials and authenticates, producing a [`Connection`];
//! each command gets its own [`Session`] on that connection.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWrite;

use super::config::DialTarget;
use super::error::RemoteError;

/// Dials remote hosts
#[async_trait]
pub trait Connector: Send + Sync {
    /// Performs one dial and authentication attempt
    async fn dial(&self, target: &DialTarget) -> Result<Arc<dyn Connection>, RemoteError>;
}

/// An established, authenticated transport
#[async_trait]
pub trait Connection: Send + Sync {
    /// Opens a fresh session for one command
    async fn open_session(&self) -> Result<Box<dyn Session>, RemoteError>;

    /// Tears the transport down
    async fn close(&self) -> Result<(), RemoteError>;
}

/// One command's execution context
#[async_trait]
pub trait Session: Send {
    /// Runs `command`, feeds it `input`, and copies its output to the sinks
    ///
    /// Returns the exit status the remote side reported.
    async fn execute(
        &mut self,
        command: &str,
        input: &[u8],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u32, RemoteError>;

    /// Asks the remote side to kill the running command
    async fn kill(&mut self) -> Result<(), RemoteError>;

    /// Releases the session
    async fn close(self: Box<Self>) -> Result<(), RemoteError>;
}
