//! In-memory transport for exercising the executor without a network

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::config::DialTarget;
use super::error::RemoteError;
use super::transport::{Connection, Connector, Session};

#[derive(Default)]
struct Counters {
    dials: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    kills: AtomicUsize,
    connections_closed: AtomicUsize,
    commands: Mutex<Vec<String>>,
    inputs: Mutex<Vec<Vec<u8>>>,
}

#[derive(Clone, Default)]
struct Behaviour {
    stdout: String,
    stderr: String,
    exit_status: u32,
    hang: bool,
}

/// Connector whose sessions replay canned output and count their lifecycle
#[derive(Default)]
pub struct FakeConnector {
    refuse_first: usize,
    behaviour: Behaviour,
    counters: Arc<Counters>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses the first `attempts` dials
    pub fn failing_first(attempts: usize) -> Self {
        Self {
            refuse_first: attempts,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, stdout: &str, stderr: &str) -> Self {
        self.behaviour.stdout = stdout.to_string();
        self.behaviour.stderr = stderr.to_string();
        self
    }

    pub fn with_exit_status(mut self, status: u32) -> Self {
        self.behaviour.exit_status = status;
        self
    }

    /// Sessions never finish on their own
    pub fn hanging(mut self) -> Self {
        self.behaviour.hang = true;
        self
    }

    pub fn dials(&self) -> usize {
        self.counters.dials.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.counters.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions_opened() - self.counters.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.counters.kills.load(Ordering::SeqCst)
    }

    pub fn connections_closed(&self) -> usize {
        self.counters.connections_closed.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.counters.commands.lock().clone()
    }

    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.counters.inputs.lock().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn dial(&self, target: &DialTarget) -> Result<Arc<dyn Connection>, RemoteError> {
        let attempt = self.counters.dials.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.refuse_first {
            return Err(RemoteError::Dial {
                address: target.address(),
                reason: format!("dial attempt {attempt} refused"),
            });
        }
        Ok(Arc::new(FakeConnection {
            behaviour: self.behaviour.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeConnection {
    behaviour: Behaviour,
    counters: Arc<Counters>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn open_session(&self) -> Result<Box<dyn Session>, RemoteError> {
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            behaviour: self.behaviour.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn close(&self) -> Result<(), RemoteError> {
        self.counters.connections_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeSession {
    behaviour: Behaviour,
    counters: Arc<Counters>,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(
        &mut self,
        command: &str,
        input: &[u8],
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u32, RemoteError> {
        self.counters.commands.lock().push(command.to_string());
        self.counters.inputs.lock().push(input.to_vec());
        if self.behaviour.hang {
            std::future::pending::<()>().await;
        }
        stdout.write_all(self.behaviour.stdout.as_bytes()).await?;
        stderr.write_all(self.behaviour.stderr.as_bytes()).await?;
        Ok(self.behaviour.exit_status)
    }

    async fn kill(&mut self) -> Result<(), RemoteError> {
        self.counters.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), RemoteError> {
        self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Cloneable in-memory output sink
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.bytes.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
