//! Local process execution with a hard timeout.
//!
//! `TokioCommandRunner` uses `tokio::select!` with an explicit `child.kill()`
//! so a command that outlives its timeout is terminated, not orphaned.

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;

use crate::domain::MachineError;

/// Upper bound for a single command. Package installs and image loads can
/// legitimately take many minutes.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `argv[0]` with the remaining arguments and capture its output.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::Io` if the process cannot be spawned and
    /// `MachineError::Transport` if it exceeds the timeout.
    pub async fn run(&self, argv: &[String]) -> Result<Output, MachineError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(MachineError::Transport("empty command".to_string()));
        };
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MachineError::io(format!("failed to spawn {program}"), e))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok::<_, MachineError>(Output {
                    status: status.map_err(|e| MachineError::io(format!("waiting for {program}"), e))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                Err(MachineError::Transport(format!(
                    "{program} timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Combined stdout+stderr of a finished process.
#[must_use]
pub fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
