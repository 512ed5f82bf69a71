//! Local machine backend: runs commands as child processes and reads files
//! straight from the filesystem.

use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::Duration;

use crate::application::ports::MachineAccess;
use crate::domain::file_info::mode_string;
use crate::domain::{Cmd, FileInfo, MachineError};
use crate::infra::command_runner::{TokioCommandRunner, combined_output};
use crate::infra::machine::stat_info;

pub struct LocalMachine {
    runner: TokioCommandRunner,
    sudo: bool,
}

impl LocalMachine {
    #[must_use]
    pub fn new(sudo: bool, timeout: Duration) -> Self {
        Self {
            runner: TokioCommandRunner::new(timeout),
            sudo,
        }
    }

    /// Privileged read for files the current user cannot open.
    async fn read_privileged(&self, path: &str) -> Result<FileInfo, MachineError> {
        let stat = stat_info(self, path).await?;
        let cmd = Cmd::privileged("cat").arg("--").arg(path);
        let out = self.runner.run(&cmd.argv(self.sudo)).await?;
        if !out.status.success() {
            return Err(MachineError::Exit {
                code: out.status.code().unwrap_or(-1),
                output: combined_output(&out),
            });
        }
        Ok(FileInfo {
            content: out.stdout,
            mode: stat.mode,
            owner: stat.owner,
            group: stat.group,
        })
    }
}

impl MachineAccess for LocalMachine {
    async fn run_command(&self, cmd: &Cmd) -> Result<String, MachineError> {
        tracing::debug!(command = %cmd.render(self.sudo), "local exec");
        let out = self.runner.run(&cmd.argv(self.sudo)).await?;
        let text = combined_output(&out);
        if out.status.success() {
            Ok(text)
        } else {
            Err(MachineError::Exit {
                code: out.status.code().unwrap_or(-1),
                output: text,
            })
        }
    }

    async fn write_file(
        &self,
        path: &str,
        mode: &str,
        owner: &str,
        group: &str,
        content: &[u8],
    ) -> Result<(), MachineError> {
        // Private staging file; removed on drop if the move never happens.
        let staged = tempfile::Builder::new()
            .prefix("rigger-")
            .tempfile()
            .map_err(|e| MachineError::io("creating staging file", e))?
            .into_temp_path();
        tokio::fs::write(&staged, content)
            .await
            .map_err(|e| MachineError::io(format!("writing {}", staged.display()), e))?;

        let staged_path = staged.to_string_lossy().into_owned();
        self.run_command(&Cmd::privileged("mv").args(["-f", "--", staged_path.as_str(), path]))
            .await?;
        let ownership = format!("{owner}:{group}");
        self.run_command(&Cmd::privileged("chown").args([ownership.as_str(), "--", path]))
            .await?;
        self.run_command(&Cmd::privileged("chmod").args([mode, "--", path]))
            .await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<FileInfo, MachineError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MachineError::FileNotFound {
                    path: path.to_string(),
                });
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied && self.sudo => {
                return self.read_privileged(path).await;
            }
            Err(e) => return Err(MachineError::io(format!("reading {path}"), e)),
        };
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| MachineError::io(format!("inspecting {path}"), e))?;
        Ok(FileInfo {
            content,
            mode: mode_string(meta.mode()),
            owner: meta.uid().to_string(),
            group: meta.gid().to_string(),
        })
    }

    async fn copy_file(&self, local: &Path, remote: &str) -> Result<(), MachineError> {
        if !local.exists() {
            return Err(MachineError::FileNotFound {
                path: local.display().to_string(),
            });
        }
        let source = local.to_string_lossy();
        self.run_command(&Cmd::privileged("cp").args(["-f", "--", source.as_ref(), remote]))
            .await?;
        self.run_command(&Cmd::privileged("chmod").args(["0644", "--", remote]))
            .await?;
        Ok(())
    }
}
