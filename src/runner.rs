//! Command execution channel.
//!
//! The core never talks to a host directly; it hands rendered command
//! strings to a [`CommandRunner`]. Nonzero remote exit is reported as
//! [`Error::Execution`] with the combined output attached. Timeouts and
//! cancellation live entirely on this side of the boundary; the account
//! logic has no notion of either.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{Error, Result};

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Captured output of a successfully exited (status 0) command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// stdout followed by stderr, the diagnostic blob attached to
    /// execution failures.
    pub fn combined(&self) -> String {
        let mut s = self.stdout.clone();
        s.push_str(&self.stderr);
        s
    }
}

/// The execution collaborator contract: run one shell command string
/// synchronously, return its output. Implementations must surface any
/// nonzero exit through the error value, with combined output kept.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<ExecOutput>;

    /// Where commands land, for log lines and CLI messages.
    fn target(&self) -> String;
}

impl<T: CommandRunner + ?Sized> CommandRunner for Box<T> {
    fn run(&self, command: &str) -> Result<ExecOutput> {
        (**self).run(command)
    }

    fn target(&self) -> String {
        (**self).target()
    }
}

/// Runs commands on a remote host through the system ssh client in
/// batch mode, so a missing key fails instead of prompting.
#[derive(Debug, Clone)]
pub struct SshRunner {
    destination: String,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl SshRunner {
    pub fn new(destination: impl Into<String>) -> Self {
        SshRunner {
            destination: destination.into(),
            port: None,
            identity_file: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn identity_file(mut self, path: Option<PathBuf>) -> Self {
        self.identity_file = path;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn build(&self, command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()));
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(&self.destination).arg("--").arg(command);
        cmd
    }
}

impl CommandRunner for SshRunner {
    fn run(&self, command: &str) -> Result<ExecOutput> {
        run_process(self.build(command), command, self.command_timeout)
    }

    fn target(&self) -> String {
        self.destination.clone()
    }
}

/// Runs commands on the local machine through `sh -c`. Useful for
/// loopback administration and manual testing.
#[derive(Debug, Clone)]
pub struct LocalRunner {
    command_timeout: Duration,
}

impl Default for LocalRunner {
    fn default() -> Self {
        LocalRunner {
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

impl CommandRunner for LocalRunner {
    fn run(&self, command: &str) -> Result<ExecOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run_process(cmd, command, self.command_timeout)
    }

    fn target(&self) -> String {
        "localhost".to_string()
    }
}

/// Spawn, enforce the deadline, collect both streams. Readers run on
/// their own threads so a chatty command cannot deadlock on a full pipe.
fn run_process(mut cmd: Command, rendered: &str, timeout: Duration) -> Result<ExecOutput> {
    tracing::debug!(command = rendered, "executing");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| Error::Spawn {
        command: rendered.to_string(),
        source,
    })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_handle = std::thread::spawn(move || read_all(stdout_pipe));
    let stderr_handle = std::thread::spawn(move || read_all(stderr_pipe));

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                command: rendered.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
        Err(source) => {
            return Err(Error::Spawn {
                command: rendered.to_string(),
                source,
            })
        }
    };

    let output = ExecOutput {
        stdout: stdout_handle.join().unwrap_or_default(),
        stderr: stderr_handle.join().unwrap_or_default(),
    };

    if !status.success() {
        return Err(Error::Execution {
            command: rendered.to_string(),
            status: status.code().unwrap_or(-1),
            output: output.combined(),
        });
    }

    Ok(output)
}

fn read_all<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_runner_captures_stdout() {
        let runner = LocalRunner::new();
        let out = runner.run("echo hello").unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "");
    }

    #[test]
    fn test_local_runner_nonzero_exit_is_execution_error() {
        let runner = LocalRunner::new();
        let err = runner.run("echo oops >&2; exit 3").unwrap_err();
        match err {
            Error::Execution {
                status, output, ..
            } => {
                assert_eq!(status, 3);
                assert!(output.contains("oops"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_local_runner_timeout() {
        let runner = LocalRunner::new().command_timeout(Duration::from_millis(100));
        let err = runner.run("sleep 5").unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_combined_output_order() {
        let out = ExecOutput {
            stdout: "a\n".into(),
            stderr: "b\n".into(),
        };
        assert_eq!(out.combined(), "a\nb\n");
    }

    #[test]
    fn test_ssh_invocation_shape() {
        let runner = SshRunner::new("admin@db1")
            .port(Some(2222))
            .identity_file(Some(PathBuf::from("/tmp/key")));
        let cmd = runner.build("cat /etc/passwd");
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-p",
                "2222",
                "-i",
                "/tmp/key",
                "admin@db1",
                "--",
                "cat /etc/passwd",
            ]
        );
    }
}
