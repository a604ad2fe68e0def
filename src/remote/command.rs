//! Remote command description and environment serialization

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tokio::io::AsyncWrite;

use super::error::RemoteError;

/// Destination for remote stdout or stderr
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

static ENV_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// One invocation on a remote host, consumed by [`RemoteExecutor::run`]
///
/// [`RemoteExecutor::run`]: super::RemoteExecutor::run
pub struct RemoteCommand {
    /// `NAME=value` entries exported before the command's input
    pub environment: Vec<String>,

    /// Command line handed to the remote shell
    pub command: String,

    /// Raw bytes fed after the environment preamble
    pub stdin: Vec<u8>,

    /// Receives remote stdout
    pub stdout: OutputSink,

    /// Receives remote stderr
    pub stderr: OutputSink,
}

impl RemoteCommand {
    /// Creates a command whose output is discarded
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            environment: Vec::new(),
            command: command.into(),
            stdin: Vec::new(),
            stdout: Box::new(tokio::io::sink()),
            stderr: Box::new(tokio::io::sink()),
        }
    }

    /// Adds a `NAME=value` entry
    #[must_use]
    pub fn with_env(mut self, entry: impl Into<String>) -> Self {
        self.environment.push(entry.into());
        self
    }

    /// Sets the stdin bytes
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = stdin.into();
        self
    }

    /// Sets the stdout sink
    #[must_use]
    pub fn with_stdout(mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdout = Box::new(sink);
        self
    }

    /// Sets the stderr sink
    #[must_use]
    pub fn with_stderr(mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stderr = Box::new(sink);
        self
    }

    /// Environment preamble followed by the raw stdin bytes
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidEnv`] for malformed entries.
    pub fn input(&self) -> Result<Vec<u8>, RemoteError> {
        let mut input = export_preamble(&self.environment)?.into_bytes();
        input.extend_from_slice(&self.stdin);
        Ok(input)
    }
}

impl fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCommand")
            .field("command", &self.command)
            .field("environment", &self.environment.len())
            .field("stdin", &self.stdin.len())
            .finish_non_exhaustive()
    }
}

/// Renders `NAME=value` entries as `export NAME=<quoted value>` lines
///
/// # Errors
///
/// Returns [`RemoteError::InvalidEnv`] if an entry has no `=` or its name
/// is not a shell identifier.
pub fn export_preamble(environment: &[String]) -> Result<String, RemoteError> {
    let mut preamble = String::new();
    for entry in environment {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| RemoteError::InvalidEnv(entry.clone()))?;
        if !ENV_NAME.is_match(name) {
            return Err(RemoteError::InvalidEnv(entry.clone()));
        }
        preamble.push_str("export ");
        preamble.push_str(name);
        preamble.push('=');
        preamble.push_str(&shell_words::quote(value));
        preamble.push('\n');
    }
    Ok(preamble)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entries(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_preamble_lines() {
        let preamble = export_preamble(&entries(&["FOO=bar", "BAZ=qux one"])).unwrap();
        assert_eq!(preamble, "export FOO=bar\nexport BAZ='qux one'\n");
    }

    #[test]
    fn test_preamble_round_trips_through_shell_words() {
        let preamble = export_preamble(&entries(&["FOO=bar", "BAZ=qux one"])).unwrap();
        let lines: Vec<Vec<String>> = preamble
            .lines()
            .map(|line| shell_words::split(line).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                vec!["export".to_string(), "FOO=bar".to_string()],
                vec!["export".to_string(), "BAZ=qux one".to_string()],
            ]
        );
    }

    #[test]
    fn test_value_may_contain_equals_and_quotes() {
        let preamble = export_preamble(&entries(&["OPTS=a=b 'c'"])).unwrap();
        let words = shell_words::split(preamble.trim_end()).unwrap();
        assert_eq!(words[1], "OPTS=a=b 'c'");
    }

    #[test]
    fn test_empty_value() {
        let preamble = export_preamble(&entries(&["EMPTY="])).unwrap();
        assert_eq!(preamble, "export EMPTY=''\n");
    }

    #[test]
    fn test_rejects_malformed_entries() {
        for bad in ["NOVALUE", "1ABC=x", "A-B=x", "=x", "A B=x"] {
            let err = export_preamble(&entries(&[bad])).unwrap_err();
            assert!(matches!(err, RemoteError::InvalidEnv(ref e) if e == bad), "{bad}");
        }
    }

    #[test]
    fn test_input_prepends_environment() {
        let command = RemoteCommand::new("sh -s")
            .with_env("FOO=bar")
            .with_stdin("echo $FOO\n");
        assert_eq!(command.input().unwrap(), b"export FOO=bar\necho $FOO\n".to_vec());
    }

    #[tokio::test]
    async fn test_posix_shell_reconstructs_values() {
        let command = RemoteCommand::new("sh -s")
            .with_env("FOO=bar")
            .with_env("BAZ=qux one")
            .with_env("QUOTE=it's $HOME")
            .with_stdin("printf '%s|%s|%s' \"$FOO\" \"$BAZ\" \"$QUOTE\"\n");
        let input = command.input().unwrap();

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(String::from_utf8(input).unwrap())
            .output()
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "bar|qux one|it's $HOME"
        );
    }

    proptest! {
        #[test]
        fn prop_export_round_trip(name in "[A-Za-z_][A-Za-z0-9_]{0,12}", value in "\\PC*") {
            let preamble = export_preamble(&[format!("{name}={value}")]).unwrap();
            prop_assert!(preamble.ends_with('\n'));
            let words = shell_words::split(preamble.trim_end_matches('\n')).unwrap();
            prop_assert_eq!(words, vec!["export".to_string(), format!("{name}={value}")]);
        }
    }
}
