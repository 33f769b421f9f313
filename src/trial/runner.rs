use crate::trial::Marker;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Failure of a single trial. Never fatal to the sweep.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("failed to launch {executable}: {source}")]
    Launch {
        executable: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to collect output of {executable}: {source}")]
    Io {
        executable: String,
        #[source]
        source: io::Error,
    },

    #[error("{executable} did not exit within {timeout:?}")]
    TimedOut {
        executable: String,
        timeout: Duration,
    },
}

/// Everything observed from one finished invocation.
#[derive(Debug, Clone)]
pub struct TrialOutput {
    pub latency: Duration,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the marker was not found in stdout.
    pub cost: Option<f64>,
}

/// Invokes the external program and parses its marker line.
#[derive(Debug, Clone)]
pub struct TrialRunner {
    pub executable: PathBuf,
    pub marker: Marker,
    pub timeout: Option<Duration>,
}

impl TrialRunner {
    pub fn new(executable: impl Into<PathBuf>, marker: Marker) -> Self {
        Self {
            executable: executable.into(),
            marker,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the executable once with `args`, blocking until it exits.
    ///
    /// Latency is wall-clock from just before spawn to exit observation, so it
    /// includes process startup.
    pub fn run(&self, args: &[String]) -> Result<TrialOutput, TrialError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let (status, stdout, stderr) = match self.timeout {
            None => {
                let output = cmd.output().map_err(|source| self.launch_error(source))?;
                (output.status, output.stdout, output.stderr)
            }
            Some(timeout) => {
                let child = cmd.spawn().map_err(|source| self.launch_error(source))?;
                self.wait_with_timeout(child, start, timeout)?
            }
        };
        let latency = start.elapsed();

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        let cost = self.marker.parse(&stdout);

        Ok(TrialOutput {
            latency,
            status,
            stdout,
            stderr,
            cost,
        })
    }

    fn wait_with_timeout(
        &self,
        mut child: Child,
        start: Instant,
        timeout: Duration,
    ) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), TrialError> {
        // Drain both pipes off-thread so a chatty child cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let deadline = start + timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.timed_out(timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(self.io_error(source)),
            }
        };

        // A background grandchild can keep the pipes open after the direct
        // child exits; the deadline covers collecting output too.
        let stdout = self.collect(stdout, deadline, timeout)?;
        let stderr = self.collect(stderr, deadline, timeout)?;
        Ok((status, stdout, stderr))
    }

    fn collect(
        &self,
        pipe: Option<Receiver<io::Result<Vec<u8>>>>,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Vec<u8>, TrialError> {
        let Some(rx) = pipe else {
            return Ok(Vec::new());
        };
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(read) => read.map_err(|source| self.io_error(source)),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(self.io_error(io::Error::other("output reader thread panicked")))
            }
        }
    }

    fn timed_out(&self, timeout: Duration) -> TrialError {
        TrialError::TimedOut {
            executable: self.executable.display().to_string(),
            timeout,
        }
    }

    fn launch_error(&self, source: io::Error) -> TrialError {
        TrialError::Launch {
            executable: self.executable.display().to_string(),
            source,
        }
    }

    fn io_error(&self, source: io::Error) -> TrialError {
        TrialError::Io {
            executable: self.executable.display().to_string(),
            source,
        }
    }
}

/// Read a pipe to EOF on its own thread and hand the bytes back over a channel.
///
/// The reader is detached: if the caller stops waiting, it exits once the last
/// writer closes the pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let read = pipe.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(read);
        });
        rx
    })
}
