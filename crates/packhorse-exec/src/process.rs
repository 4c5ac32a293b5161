//! Spawning and cleaning up piped subprocesses.
//!
//! Every subprocess starts in its own process group so that cleanup can
//! reach helpers the command itself may have forked.

use crate::{ExecError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// A running subprocess with piped standard streams.
///
/// The child is spawned with a cleared environment (only the supplied map
/// is visible to it), stdin and stdout piped, and stderr discarded.
/// Dropping the handle sends `SIGTERM` to the whole process group and the
/// runtime reaps the child in the background, so no exit path can leak a
/// process or a pipe.
#[derive(Debug)]
pub struct Subprocess {
    child: Child,
    pgid: Option<i32>,
    command: String,
}

impl Subprocess {
    /// Spawns `program` with `args` and exactly the environment in `env`.
    pub fn spawn(program: &Path, args: &[&str], env: &HashMap<String, String>) -> Result<Self> {
        let command = format!("{} {}", program.display(), args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env_clear()
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: command.clone(),
            source,
        })?;

        // With process_group(0) the child's pid doubles as its pgid.
        let pgid = child.id().map(|id| id as i32);

        tracing::debug!(command = %command, pid = ?child.id(), "spawned subprocess");

        Ok(Self {
            child,
            pgid,
            command,
        })
    }

    /// Takes the child's stdin pipe. Dropping the returned writer closes
    /// the pipe and signals end-of-data to the child.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Takes the child's stdout pipe.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Waits for the child to exit and returns its status.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.map_err(|source| ExecError::Wait {
            command: self.command.clone(),
            source,
        })
    }

    /// The command line this subprocess was started with, for log
    /// attribution.
    pub fn command_line(&self) -> &str {
        &self.command
    }
}

impl Drop for Subprocess {
    fn drop(&mut self) {
        // Terminate the whole group; the signal also reaches processes the
        // child may have forked. ESRCH just means everyone already exited.
        if let Some(pgid) = self.pgid {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGTERM);
        }
    }
}

/// Copies `reader` into `writer`, returning the byte count alongside the
/// outcome so that a failed copy still reports how far it got.
pub async fn copy_counted<R, W>(reader: &mut R, writer: &mut W) -> (u64, std::io::Result<()>)
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = [0u8; 8192];
    let mut written: u64 = 0;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return (written, Err(e)),
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            return (written, Err(e));
        }
        written += n as u64;
    }

    (written, Ok(()))
}
