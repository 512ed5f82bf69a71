//! SSH machine backend over libssh2.
//!
//! One connection is shared for the backend's lifetime; every command and
//! upload runs on its own channel. libssh2 calls block, so each one runs on
//! the blocking thread pool.

use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use ssh2::{ExtendedData, Session};

use crate::application::ports::MachineAccess;
use crate::domain::{Cmd, FileInfo, MachineError};
use crate::infra::machine::{stat_cmd, stat_result};

/// Where uploads are staged before being moved into place.
const UPLOAD_DIR: &str = "/tmp";

/// Whether stderr is folded into stdout or kept apart.
#[derive(Clone, Copy)]
enum Streams {
    Merged,
    Separate,
}

struct ExecOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    code: i32,
}

enum Upload {
    Bytes(Vec<u8>),
    File(PathBuf),
}

pub struct SshMachine {
    session: Session,
    sudo: bool,
}

impl SshMachine {
    #[must_use]
    pub fn new(session: Session, sudo: bool) -> Self {
        Self { session, sudo }
    }

    /// Run a rendered command line on a fresh channel.
    async fn exec(&self, command: String, streams: Streams) -> Result<ExecOutput, MachineError> {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || exec_blocking(&session, &command, streams))
            .await
            .map_err(|e| MachineError::transport("command task", e))?
    }

    /// Run `cmd` and return its stdout alone. A failure carries both streams.
    async fn run_stdout(&self, cmd: &Cmd) -> Result<Vec<u8>, MachineError> {
        let line = cmd.render(self.sudo);
        tracing::debug!(command = %line, "ssh exec");
        stdout_or_exit(self.exec(line, Streams::Separate).await?)
    }

    async fn upload(&self, source: Upload, remote: String, mode: i32) -> Result<(), MachineError> {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || upload_blocking(&session, source, &remote, mode))
            .await
            .map_err(|e| MachineError::transport("upload task", e))?
    }

    /// Upload to a private staging path, then move it to `path`.
    async fn stage_and_move(&self, source: Upload, path: &str, mode: i32) -> Result<(), MachineError> {
        let staged = format!("{UPLOAD_DIR}/rigger-upload-{}", uuid::Uuid::new_v4());
        self.upload(source, staged.clone(), mode).await?;
        let moved = self
            .run_command(&Cmd::privileged("mv").args(["-f", "--", staged.as_str(), path]))
            .await;
        if moved.is_err()
            && let Err(e) = self
                .run_command(&Cmd::new("rm").args(["-f", "--", staged.as_str()]))
                .await
        {
            tracing::warn!(path = %staged, error = %e, "could not remove staged upload");
        }
        moved.map(drop)
    }
}

fn stdout_or_exit(out: ExecOutput) -> Result<Vec<u8>, MachineError> {
    if out.code == 0 {
        return Ok(out.stdout);
    }
    let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(&out.stderr));
    Err(MachineError::Exit {
        code: out.code,
        output,
    })
}

fn exec_blocking(
    session: &Session,
    command: &str,
    streams: Streams,
) -> Result<ExecOutput, MachineError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| MachineError::transport("opening session", e))?;
    if let Streams::Merged = streams {
        channel
            .handle_extended_data(ExtendedData::Merge)
            .map_err(|e| MachineError::transport("merging stderr", e))?;
    }
    channel
        .exec(command)
        .map_err(|e| MachineError::transport("starting command", e))?;
    // Commands get no stdin; a prompt sees EOF instead of waiting forever.
    channel
        .send_eof()
        .map_err(|e| MachineError::transport("closing command stdin", e))?;

    let mut stdout = Vec::new();
    channel
        .read_to_end(&mut stdout)
        .map_err(|e| MachineError::io("reading command output", e))?;
    let mut stderr = Vec::new();
    if let Streams::Separate = streams {
        channel
            .stderr()
            .read_to_end(&mut stderr)
            .map_err(|e| MachineError::io("reading command stderr", e))?;
    }
    channel
        .wait_close()
        .map_err(|e| MachineError::transport("closing session", e))?;
    let code = channel
        .exit_status()
        .map_err(|e| MachineError::transport("reading exit status", e))?;
    Ok(ExecOutput {
        stdout,
        stderr,
        code,
    })
}

fn upload_blocking(
    session: &Session,
    source: Upload,
    remote: &str,
    mode: i32,
) -> Result<(), MachineError> {
    let (size, mut reader): (u64, Box<dyn Read>) = match source {
        Upload::Bytes(bytes) => (bytes.len() as u64, Box::new(Cursor::new(bytes))),
        Upload::File(path) => {
            let file = File::open(&path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => MachineError::FileNotFound {
                    path: path.display().to_string(),
                },
                _ => MachineError::io(format!("opening {}", path.display()), e),
            })?;
            let size = file
                .metadata()
                .map_err(|e| MachineError::io(format!("inspecting {}", path.display()), e))?
                .len();
            (size, Box::new(BufReader::new(file)))
        }
    };

    let mut channel = session
        .scp_send(Path::new(remote), mode, size, None)
        .map_err(|e| MachineError::transport(&format!("starting upload to {remote}"), e))?;
    std::io::copy(&mut reader, &mut channel)
        .map_err(|e| MachineError::io(format!("uploading to {remote}"), e))?;
    channel.flush().map_err(|e| MachineError::io("flushing upload", e))?;
    channel
        .send_eof()
        .and_then(|()| channel.wait_eof())
        .and_then(|()| channel.close())
        .and_then(|()| channel.wait_close())
        .map_err(|e| MachineError::transport(&format!("finishing upload to {remote}"), e))
}

impl MachineAccess for SshMachine {
    async fn run_command(&self, cmd: &Cmd) -> Result<String, MachineError> {
        let line = cmd.render(self.sudo);
        tracing::debug!(command = %line, "ssh exec");
        let out = self.exec(line, Streams::Merged).await?;
        let output = String::from_utf8_lossy(&out.stdout).into_owned();
        if out.code == 0 {
            Ok(output)
        } else {
            Err(MachineError::Exit {
                code: out.code,
                output,
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
        self.stage_and_move(Upload::Bytes(content.to_vec()), path, 0o600)
            .await?;
        let ownership = format!("{owner}:{group}");
        self.run_command(&Cmd::privileged("chown").args([ownership.as_str(), "--", path]))
            .await?;
        self.run_command(&Cmd::privileged("chmod").args([mode, "--", path]))
            .await?;
        Ok(())
    }

    /// Privileged `stat` and `cat`, so files stay readable without relaxing
    /// their permissions. Only stdout is taken as output; stderr noise such
    /// as sudo warnings never reaches the content.
    async fn read_file(&self, path: &str) -> Result<FileInfo, MachineError> {
        let stat = self
            .run_stdout(&stat_cmd(path))
            .await
            .map(|out| String::from_utf8_lossy(&out).into_owned());
        let stat = stat_result(path, stat)?;
        let content = match self.run_stdout(&Cmd::privileged("cat").arg("--").arg(path)).await {
            Ok(content) => content,
            Err(e) if e.mentions_missing_path() => {
                return Err(MachineError::FileNotFound {
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        Ok(FileInfo {
            content,
            mode: stat.mode,
            owner: stat.owner,
            group: stat.group,
        })
    }

    async fn copy_file(&self, local: &Path, remote: &str) -> Result<(), MachineError> {
        self.stage_and_move(Upload::File(local.to_path_buf()), remote, 0o644)
            .await?;
        self.run_command(&Cmd::privileged("chmod").args(["0644", "--", remote]))
            .await?;
        Ok(())
    }
}
