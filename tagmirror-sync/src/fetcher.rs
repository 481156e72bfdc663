//! Artifact transfer via an external pull tool.
//!
//! The reconciler never spawns processes itself; it calls an
//! [`ArtifactFetcher`]. [`OrasFetcher`] runs
//! `<tool> pull <host>/<repo>:<tag> --output <destination>`.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tagmirror_core::ArtifactReference;

use crate::error::FetchError;

/// How often a running pull is polled while a timeout is in effect.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Only the tail of the tool's stderr is kept in error messages.
const MAX_STDERR_BYTES: usize = 2048;

pub trait ArtifactFetcher: Send + Sync {
    /// Transfer the content of `reference` into the existing directory
    /// `destination`.
    fn pull(&self, reference: &ArtifactReference, destination: &Path) -> Result<(), FetchError>;
}

/// Runs an oras-compatible command line tool.
#[derive(Debug, Clone)]
pub struct OrasFetcher {
    tool: String,
    timeout: Option<Duration>,
}

impl OrasFetcher {
    pub fn new(tool: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    pub fn command(&self, reference: &ArtifactReference, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.tool);
        cmd.arg("pull")
            .arg(reference.to_string())
            .arg("--output")
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    fn io_err(&self, source: std::io::Error) -> FetchError {
        FetchError::Io {
            tool: self.tool.clone(),
            source,
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, FetchError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|e| self.io_err(e));
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(|e| self.io_err(e))? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::TimedOut {
                    tool: self.tool.clone(),
                    after: timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ArtifactFetcher for OrasFetcher {
    fn pull(&self, reference: &ArtifactReference, destination: &Path) -> Result<(), FetchError> {
        tracing::debug!("running {} pull {reference} --output {}", self.tool, destination.display());

        let mut child = self
            .command(reference, destination)
            .spawn()
            .map_err(|source| FetchError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;

        // Drain stderr on its own thread so a chatty tool cannot block on a
        // full pipe while we wait for it.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let status = self.wait(&mut child)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .map(|buf| stderr_tail(&buf))
            .unwrap_or_default();

        if status.success() {
            return Ok(());
        }
        Err(FetchError::Exit {
            tool: self.tool.clone(),
            status: status.to_string(),
            stderr,
        })
    }
}

fn stderr_tail(buf: &[u8]) -> String {
    let start = buf.len().saturating_sub(MAX_STDERR_BYTES);
    String::from_utf8_lossy(&buf[start..]).trim().to_string()
}
