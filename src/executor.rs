//! A tool for executing the external media tool.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

/// Represents a command executor.
///
/// Spawn failures meaning the executable is absent or not runnable are
/// reported as [`Error::ToolMissing`], non-zero exits as [`Error::Mux`].
#[derive(Debug, Clone, PartialEq)]
pub struct Executor {
    /// The path to the command executable.
    pub executable_path: PathBuf,
    /// The arguments to pass to the command.
    pub args: Vec<OsString>,
}

/// Represents the output of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// The exit code of the process, `-1` when killed by a signal.
    pub code: i32,
}

impl Executor {
    pub fn new(executable_path: impl Into<PathBuf>) -> Self {
        Self {
            executable_path: executable_path.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the command to completion, discarding its output, and returns its
    /// exit code. Only a failure to start the process is an error.
    pub async fn status(&self) -> Result<i32> {
        log::debug!("Executing command: {:?}", self);

        let status = self
            .command(Stdio::null)
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(status.code().unwrap_or(-1))
    }

    /// Runs the command to completion and captures its output.
    ///
    /// # Errors
    ///
    /// Fails if the process cannot be started or exits unsuccessfully.
    pub async fn execute(&self) -> Result<ProcessOutput> {
        log::debug!("Executing command: {:?}", self);

        let output = self
            .command(Stdio::piped)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code().unwrap_or(-1);
        log::trace!("stdout: {:?}", stdout);
        log::trace!("stderr: {:?}", stderr);

        if !output.status.success() {
            return Err(Error::Mux {
                code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            code,
        })
    }

    fn command(&self, io: fn() -> Stdio) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.executable_path);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(io())
            .stderr(io());

        #[cfg(target_os = "windows")]
        {
            command.creation_flags(0x08000000);
        }

        command
    }

    fn spawn_error(&self, error: std::io::Error) -> Error {
        match error.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                Error::ToolMissing(self.executable_path.clone())
            }
            _ => Error::IO(error),
        }
    }
}
