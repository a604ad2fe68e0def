use thiserror::Error;

/// Errors raised by remote execution
#[derive(Error, Debug)]
pub enum RemoteError {
    /// A command was issued before `connect` succeeded
    #[error("not connected")]
    NotConnected,

    /// No authentication method is configured
    #[error("no authentication method configured for {user}@{address}")]
    NoAuthMethod {
        /// Login user.
        user: String,
        /// `host:port` of the target.
        address: String,
    },

    /// Dialing the remote host failed
    #[error("failed to connect to {address}: {reason}")]
    Dial {
        /// `host:port` that was dialed.
        address: String,
        /// Transport error text.
        reason: String,
    },

    /// The host refused every authentication method
    #[error("authentication rejected for {user}@{address}")]
    AuthRejected {
        /// Login user.
        user: String,
        /// `host:port` of the target.
        address: String,
    },

    /// A session could not be opened or broke mid-command
    #[error("session error: {0}")]
    Session(String),

    /// The remote command exited unsuccessfully
    #[error("remote command exited with status {code}")]
    ExitStatus {
        /// Exit status reported by the remote shell.
        code: u32,
    },

    /// An environment entry cannot be exported
    #[error("invalid environment entry '{0}'")]
    InvalidEnv(String),

    /// The abort signal fired while the command was running
    #[error("remote command cancelled")]
    Cancelled,

    /// Writing to an output sink failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
