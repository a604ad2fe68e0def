//! SSH transport built on `russh`
//!
//! Only password authentication is offered. Host keys are accepted without
//! verification: build hosts are typically freshly provisioned machines
//! whose keys are not known in advance.

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect, Sig};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::config::{AuthMethod, DialTarget};
use super::error::RemoteError;
use super::transport::{Connection, Connector, Session};

/// Extended data stream id carrying stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Dials hosts over SSH
pub struct SshConnector {
    config: Arc<client::Config>,
}

impl SshConnector {
    /// Creates a connector with default client settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Arc::new(client::Config::default()),
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

struct AcceptHostKey;

#[async_trait]
impl client::Handler for AcceptHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn dial(&self, target: &DialTarget) -> Result<Arc<dyn Connection>, RemoteError> {
        let address = target.address();
        let mut handle = client::connect(
            Arc::clone(&self.config),
            (target.host.as_str(), target.port),
            AcceptHostKey,
        )
        .await
        .map_err(|e| RemoteError::Dial {
            address: address.clone(),
            reason: e.to_string(),
        })?;

        for method in &target.auth {
            let accepted = match method {
                AuthMethod::Password(password) => handle
                    .authenticate_password(target.user.clone(), password.clone())
                    .await
                    .map_err(|e| RemoteError::Dial {
                        address: address.clone(),
                        reason: e.to_string(),
                    })?,
            };
            if accepted {
                debug!(host = %address, user = %target.user, "Authenticated");
                return Ok(Arc::new(SshConnection { handle }));
            }
        }

        Err(RemoteError::AuthRejected {
            user: target.user.clone(),
            address,
        })
    }
}

struct SshConnection {
    handle: Handle<AcceptHostKey>,
}

#[async_trait]
impl Connection for SshConnection {
    async fn open_session(&self) -> Result<Box<dyn Session>, RemoteError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(session_error)?;
        Ok(Box::new(SshSession { channel }))
    }

    async fn close(&self) -> Result<(), RemoteError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(session_error)
    }
}

struct SshSession {
    channel: Channel<Msg>,
}

#[async_trait]
impl Session for SshSession {
    async fn execute(
        &mut self,
        command: &str,
        input: &[u8],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u32, RemoteError> {
        self.channel.exec(true, command).await.map_err(session_error)?;
        if !input.is_empty() {
            self.channel.data(input).await.map_err(session_error)?;
        }
        self.channel.eof().await.map_err(session_error)?;

        let mut exit_status = None;
        while let Some(message) = self.channel.wait().await {
            match message {
                ChannelMsg::Data { ref data } => stdout.write_all(data).await?,
                ChannelMsg::ExtendedData { ref data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.write_all(data).await?;
                }
                ChannelMsg::ExitStatus { exit_status: status } => exit_status = Some(status),
                _ => {}
            }
        }
        stdout.flush().await?;
        stderr.flush().await?;

        exit_status
            .ok_or_else(|| RemoteError::Session("channel closed without an exit status".to_string()))
    }

    async fn kill(&mut self) -> Result<(), RemoteError> {
        self.channel.signal(Sig::KILL).await.map_err(session_error)
    }

    async fn close(self: Box<Self>) -> Result<(), RemoteError> {
        self.channel.close().await.map_err(session_error)
    }
}

fn session_error(err: russh::Error) -> RemoteError {
    RemoteError::Session(err.to_string())
}
