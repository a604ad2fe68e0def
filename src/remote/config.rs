//! Remote host settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Host dialed when none is configured
pub const DEFAULT_HOST: &str = "localhost";
/// SSH port dialed when none is configured
pub const DEFAULT_PORT: u16 = 22;
/// Login user when none is configured
pub const DEFAULT_USER: &str = "root";
/// Dial attempts when none are configured
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;
/// Fixed pause between dial attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Settings for one remote executor
///
/// Every field is optional; accessors resolve the documented defaults.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSessionConfig {
    /// Host name or address
    pub host: Option<String>,

    /// SSH port
    pub port: Option<u16>,

    /// Login user
    pub user: Option<String>,

    /// Password for password authentication
    pub password: Option<String>,

    /// Dial attempts before giving up
    pub connect_retries: Option<u32>,

    /// Pause between dial attempts
    #[serde(skip)]
    pub retry_interval: Option<Duration>,
}

impl RemoteSessionConfig {
    /// Creates settings for `host` with everything else defaulted
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    /// Sets the password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the login user
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the number of dial attempts
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.connect_retries = Some(retries);
        self
    }

    /// Sets the pause between dial attempts
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Host, defaulting to `localhost`
    #[must_use]
    pub fn host(&self) -> &str {
        non_empty(self.host.as_deref()).unwrap_or(DEFAULT_HOST)
    }

    /// Port, defaulting to 22
    #[must_use]
    pub fn port(&self) -> u16 {
        match self.port {
            Some(0) | None => DEFAULT_PORT,
            Some(port) => port,
        }
    }

    /// User, defaulting to `root`
    #[must_use]
    pub fn user(&self) -> &str {
        non_empty(self.user.as_deref()).unwrap_or(DEFAULT_USER)
    }

    /// Dial attempts, defaulting to 3; zero also means the default
    #[must_use]
    pub fn retries(&self) -> u32 {
        match self.connect_retries {
            Some(0) | None => DEFAULT_CONNECT_RETRIES,
            Some(retries) => retries,
        }
    }

    /// Pause between dial attempts
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL)
    }

    /// `host:port`
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Authentication methods offered to the host, in order
    #[must_use]
    pub fn auth_methods(&self) -> Vec<AuthMethod> {
        let mut methods = Vec::new();
        if let Some(password) = non_empty(self.password.as_deref()) {
            methods.push(AuthMethod::Password(password.to_string()));
        }
        methods
    }

    /// Resolves every default into a dial target
    #[must_use]
    pub fn target(&self) -> DialTarget {
        DialTarget {
            host: self.host().to_string(),
            port: self.port(),
            user: self.user().to_string(),
            auth: self.auth_methods(),
        }
    }
}

impl fmt::Debug for RemoteSessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_retries", &self.connect_retries)
            .field("retry_interval", &self.retry_interval)
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A way of proving identity to the remote host
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Password authentication
    Password(String),
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => write!(f, "Password(<redacted>)"),
        }
    }
}

/// Fully resolved dial parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialTarget {
    /// Host name or address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Methods tried in order
    pub auth: Vec<AuthMethod>,
}

impl DialTarget {
    /// `host:port`
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
