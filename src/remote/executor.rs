//! Remote command execution over an authenticated connection

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use super::command::RemoteCommand;
use super::config::RemoteSessionConfig;
use super::error::RemoteError;
use super::ssh::SshConnector;
use super::transport::{Connection, Connector};
use crate::pipeline::AbortSignal;

/// Runs commands on one remote host
///
/// Owns at most one connection. Every `exec`/`run` opens its own session
/// and closes it before returning, whatever the outcome.
pub struct RemoteExecutor {
    config: RemoteSessionConfig,
    connector: Arc<dyn Connector>,
    connection: RwLock<Option<Arc<dyn Connection>>>,
}

impl RemoteExecutor {
    /// Creates an SSH executor
    #[must_use]
    pub fn new(config: RemoteSessionConfig) -> Self {
        Self::with_connector(config, Arc::new(SshConnector::new()))
    }

    /// Creates an executor dialing through `connector`
    #[must_use]
    pub fn with_connector(config: RemoteSessionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connection: RwLock::new(None),
        }
    }

    /// Settings this executor was created with
    #[must_use]
    pub fn config(&self) -> &RemoteSessionConfig {
        &self.config
    }

    /// Returns true while a connection is held
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Dials the host, retrying with a fixed pause between attempts
    ///
    /// Does nothing when already connected.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NoAuthMethod`] without dialing when no
    /// credentials are configured, otherwise the error of the final dial
    /// attempt once every attempt failed.
    pub async fn connect(&self) -> Result<(), RemoteError> {
        if self.is_connected() {
            debug!(host = %self.config.address(), "Already connected");
            return Ok(());
        }

        let target = self.config.target();
        let address = target.address();
        if target.auth.is_empty() {
            return Err(RemoteError::NoAuthMethod {
                user: target.user,
                address,
            });
        }

        let attempts = self.config.retries();
        let interval = self.config.retry_interval();
        let mut last_error = None;

        for attempt in 1..=attempts {
            info!(host = %address, user = %target.user, attempt, attempts, "Connecting to remote host");
            match self.connector.dial(&target).await {
                Ok(connection) => {
                    self.adopt(connection).await;
                    info!(host = %address, attempt, "Connected");
                    return Ok(());
                }
                Err(err) => {
                    warn!(host = %address, attempt, attempts, error = %err, "Connection attempt failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(RemoteError::Dial {
            address,
            reason: "no connection attempts were made".to_string(),
        }))
    }

    async fn adopt(&self, connection: Arc<dyn Connection>) {
        let surplus = {
            let mut slot = self.connection.write();
            if slot.is_some() {
                Some(connection)
            } else {
                *slot = Some(connection);
                None
            }
        };
        // a concurrent connect won the race
        if let Some(extra) = surplus
            && let Err(err) = extra.close().await
        {
            warn!(error = %err, "Failed to close surplus connection");
        }
    }

    fn connection(&self) -> Result<Arc<dyn Connection>, RemoteError> {
        self.connection.read().clone().ok_or(RemoteError::NotConnected)
    }

    /// Runs `command` without environment or stdin
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotConnected`] before `connect` succeeded,
    /// [`RemoteError::ExitStatus`] on a non-zero exit, or the transport error.
    pub async fn exec(
        &self,
        command: &str,
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), RemoteError> {
        let connection = self.connection()?;
        run_session(connection.as_ref(), command, &[], stdout, stderr, None).await
    }

    /// Runs `command` with its environment exported ahead of its stdin
    ///
    /// Watches `abort` for the whole run; on abort the remote command is
    /// killed, the session closed, and [`RemoteError::Cancelled`] returned.
    ///
    /// # Errors
    ///
    /// Same as [`exec`](Self::exec), plus [`RemoteError::InvalidEnv`] for
    /// malformed environment entries and [`RemoteError::Cancelled`].
    pub async fn run(&self, mut command: RemoteCommand, abort: &AbortSignal) -> Result<(), RemoteError> {
        let connection = self.connection()?;
        let input = command.input()?;
        if abort.is_aborted() {
            return Err(RemoteError::Cancelled);
        }
        run_session(
            connection.as_ref(),
            &command.command,
            &input,
            command.stdout.as_mut(),
            command.stderr.as_mut(),
            Some(abort),
        )
        .await
    }

    /// Closes the connection if one is held; safe to call repeatedly
    pub async fn cleanup(&self) {
        let connection = self.connection.write().take();
        if let Some(connection) = connection {
            if let Err(err) = connection.close().await {
                warn!(host = %self.config.address(), error = %err, "Failed to close connection");
            }
            info!(host = %self.config.address(), "Disconnected");
        }
    }
}

async fn run_session(
    connection: &dyn Connection,
    command: &str,
    input: &[u8],
    stdout: &mut (dyn AsyncWrite + Send + Unpin),
    stderr: &mut (dyn AsyncWrite + Send + Unpin),
    abort: Option<&AbortSignal>,
) -> Result<(), RemoteError> {
    let mut session = connection.open_session().await?;
    debug!(command, "Session opened");

    let outcome = match abort {
        Some(abort) => {
            let finished = tokio::select! {
                biased;
                () = abort.aborted() => None,
                result = session.execute(command, input, stdout, stderr) => Some(result),
            };
            match finished {
                Some(result) => result,
                None => {
                    warn!(command, "Abort requested, killing remote command");
                    if let Err(err) = session.kill().await {
                        warn!(error = %err, "Failed to signal remote command");
                    }
                    Err(RemoteError::Cancelled)
                }
            }
        }
        None => session.execute(command, input, stdout, stderr).await,
    };

    if let Err(err) = session.close().await {
        warn!(error = %err, "Failed to close session");
    }
    debug!(command, "Session closed");

    match outcome? {
        0 => Ok(()),
        code => Err(RemoteError::ExitStatus { code }),
    }
}

impl fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
