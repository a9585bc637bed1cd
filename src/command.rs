//! Process invocations as argv and shell command lines

use std::fmt;

/// A single process invocation: program name followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument (builder pattern)
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.push(arg);
        self
    }

    /// Append one argument in place. Empty arguments are dropped.
    pub fn push(&mut self, arg: impl Into<String>) {
        let arg = arg.into();
        if !arg.is_empty() {
            self.args.push(arg);
        }
    }

    /// Append several arguments in place
    pub fn extend<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.push(arg);
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full argv, program first
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// True if any argument equals `arg` or starts with `arg=`
    pub fn has_option(&self, arg: &str) -> bool {
        self.args
            .iter()
            .any(|a| a == arg || a.strip_prefix(arg).is_some_and(|rest| rest.starts_with('=')))
    }

    /// Single shell command line, each token quoted as needed
    pub fn to_shell_line(&self) -> String {
        shell_words::join(self.argv())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_line())
    }
}
