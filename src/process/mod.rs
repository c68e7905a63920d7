//! Child process helpers.
//!
//! - [`Cmd`] - builder around [`std::process::Command`] that knows whether
//!   the child's output should be streamed or discarded
//! - [`WorkingDir`] - scoped change of the process working directory

use anyhow::{Context, Result};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Exit code recorded when a child has none (spawn failure or signal).
pub const EXIT_CODE_UNAVAILABLE: i32 = -1;

/// An external command to run to completion.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    dir: Option<PathBuf>,
    stream: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
            dir: None,
            stream: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Add an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Inherit stdout/stderr instead of discarding them.
    pub fn stream_output(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + self.envs.len() + 1);
        for (k, v) in &self.envs {
            parts.push(format!("{}={}", k.to_string_lossy(), v.to_string_lossy()));
        }
        parts.push(self.program.display().to_string());
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    /// Run the command and wait for it.
    ///
    /// Only failing to spawn is an error; a non-zero exit is returned as-is.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        if self.stream {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd.stdin(Stdio::null());

        tracing::debug!("exec: {}", self.display());
        cmd.status()
            .with_context(|| format!("running {}", self.program.display()))
    }
}

/// Numeric exit code, or [`EXIT_CODE_UNAVAILABLE`] if the child was killed.
pub fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_CODE_UNAVAILABLE)
}

/// RAII guard: changes the working directory and restores it on drop.
///
/// Restoration also happens when the holder returns early with an error or
/// unwinds from a panic.
#[derive(Debug)]
pub struct WorkingDir {
    previous: PathBuf,
}

impl WorkingDir {
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = env::current_dir().context("resolving current directory")?;
        env::set_current_dir(dir)
            .with_context(|| format!("changing directory to '{}'", dir.display()))?;
        tracing::debug!("cd {}", dir.display());
        Ok(Self { previous })
    }

    /// Directory that will be restored.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            tracing::warn!(
                "failed to restore working directory '{}': {}",
                self.previous.display(),
                e
            );
        }
    }
}

/// Serializes tests that touch the process-wide working directory.
#[cfg(test)]
pub(crate) fn cwd_test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
