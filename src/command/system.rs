//! Executor backed by `std::process`.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{render_command, CommandExecutor, CommandOutput};
use crate::error::CommandError;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs programs on the host with a bounded wait.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn wait_with_timeout(&self, program: &str, child: &mut Child) -> Result<Option<i32>, CommandError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code()),
                Ok(None) => {}
                Err(e) => {
                    return Err(CommandError::Io {
                        program: program.to_string(),
                        source: e,
                    })
                }
            }

            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill '{}' after timeout: {}", program, e);
                }
                // Reap it so it doesn't linger as a zombie
                let _ = child.wait();
                return Err(CommandError::TimedOut {
                    program: program.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl CommandExecutor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        debug!("Running: {}", render_command(program, args));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CommandError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        // Drain both pipes while waiting so a chatty tool can't block on a full pipe
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait_with_timeout(program, &mut child)?;

        let output = CommandOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        debug!("'{}' exited with {:?}", program, output.status);
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
