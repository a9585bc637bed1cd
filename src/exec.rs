//! Process replacement
//!
//! The launcher never supervises what it starts: it execs into uWSGI or
//! forego, which then owns the process ID (and signals from the container
//! runtime).

use crate::command::CommandSpec;
use crate::env::Environment;
use crate::error::LaunchError;
use std::path::PathBuf;
use tracing::info;

/// Replaces the current process with `command`.
///
/// Returns only on failure; a successful replacement never comes back.
pub trait ProcessReplacer {
    fn replace(&self, command: &CommandSpec, env: &Environment) -> LaunchError;
}

/// Replaces the process image via `exec(3)`.
///
/// The child sees exactly `env` (the inherited environment is already folded
/// into it), so PATH lookup of the program uses the composed PATH.
#[derive(Debug, Clone, Default)]
pub struct ExecReplacer {
    working_dir: Option<PathBuf>,
}

impl ExecReplacer {
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self { working_dir }
    }
}

impl ProcessReplacer for ExecReplacer {
    #[cfg(unix)]
    fn replace(&self, command: &CommandSpec, env: &Environment) -> LaunchError {
        use std::os::unix::process::CommandExt;

        let mut cmd = std::process::Command::new(command.program());
        cmd.args(command.args()).env_clear().envs(env);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        info!(command = %command, "Replacing process");
        let source = cmd.exec();

        LaunchError::ProcessLaunch {
            program: command.program().to_string(),
            source,
        }
    }

    #[cfg(not(unix))]
    fn replace(&self, command: &CommandSpec, _env: &Environment) -> LaunchError {
        info!(command = %command, "Process replacement requested");
        LaunchError::ProcessLaunch {
            program: command.program().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "process replacement requires a unix platform",
            ),
        }
    }
}
