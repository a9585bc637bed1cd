//! Procfile generation for the process supervisor (forego)

use crate::command::CommandSpec;

/// Supervisor that runs every Procfile entry together
pub const SUPERVISOR_PROGRAM: &str = "forego";

/// One named process in a Procfile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    /// Role name (nginx, django, ...)
    pub name: String,
    /// Shell command line
    pub command: String,
}

/// Ordered set of processes started together by the supervisor.
///
/// Entries keep insertion order so the rendered file is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Procfile {
    entries: Vec<ProcessEntry>,
}

impl Procfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a process
    pub fn add(&mut self, name: impl Into<String>, command: &CommandSpec) {
        self.entries.push(ProcessEntry {
            name: name.into(),
            command: command.to_shell_line(),
        });
    }

    pub fn entries(&self) -> &[ProcessEntry] {
        &self.entries
    }

    /// Render as `name: command` lines
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.name, e.command))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Command that starts the supervisor on a Procfile
pub fn supervisor_command(procfile_path: &str) -> CommandSpec {
    CommandSpec::new(SUPERVISOR_PROGRAM)
        .arg("start")
        .arg("-f")
        .arg(procfile_path)
}
