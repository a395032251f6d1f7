// src/exec/command.rs

use std::fmt;
use std::path::Path;

/// One external invocation.
///
/// `Argv` is executed directly (no shell interpretation); `Shell` is a
/// snippet meant for `sh -c`, used for user-supplied hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Argv(Vec<String>),
    Shell(String),
}

impl Command {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn shell(script: impl Into<String>) -> Self {
        Command::Shell(script.into())
    }

    /// Name used to tag log lines: basename of the program (argv[0], or the
    /// first whitespace-delimited token of a shell string).
    pub fn short_name(&self) -> String {
        let program = match self {
            Command::Argv(args) => args.first().map(String::as_str).unwrap_or_default(),
            Command::Shell(script) => script.split_whitespace().next().unwrap_or_default(),
        };

        Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string())
    }

    /// Text handed to `sh -c` when the command runs in shell mode.
    pub fn shell_script(&self) -> String {
        match self {
            Command::Argv(args) => args.join(" "),
            Command::Shell(script) => script.clone(),
        }
    }

    /// Tokens used when the command runs without a shell.
    ///
    /// Shell strings are split on whitespace; no quoting rules apply.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Command::Argv(args) => args.clone(),
            Command::Shell(script) => script.split_whitespace().map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Argv(args) => write!(f, "{}", args.join(" ")),
            Command::Shell(script) => write!(f, "{script}"),
        }
    }
}
