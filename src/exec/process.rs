// src/exec/process.rs

//! Spawning a single child process and draining its output.
//!
//! The retry layer talks to a [`ProcessRunner`] instead of spawning processes
//! itself. Production code uses [`SystemProcessRunner`]; tests can replace it
//! with a scripted runner that never touches the OS.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
#[cfg(unix)]
use tokio::net::unix::pipe;
use tokio::process::Command as ProcessCommand;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{Result, RunnerError};
use crate::exec::command::Command;
use crate::exec::output::log_line;
use crate::exec::result::AttemptRecord;

/// Environment handed to every child, on top of the inherited one.
pub type ChildEnvironment = BTreeMap<String, String>;

pub type AttemptFuture<'a> = Pin<Box<dyn Future<Output = Result<AttemptRecord>> + Send + 'a>>;

/// Runs one attempt of a command to completion.
pub trait ProcessRunner: Send + Sync {
    /// Spawn `command`, wait for it to exit and return its exit code together
    /// with the merged stdout/stderr text.
    ///
    /// Ordinary non-zero exits are returned as `Ok`; `Err` means the process
    /// could not be spawned or waited for.
    fn run<'a>(
        &'a self,
        command: &'a Command,
        shell: bool,
        env: &'a ChildEnvironment,
    ) -> AttemptFuture<'a>;
}

/// Real runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run<'a>(
        &'a self,
        command: &'a Command,
        shell: bool,
        env: &'a ChildEnvironment,
    ) -> AttemptFuture<'a> {
        Box::pin(run_process(command, shell, env))
    }
}

async fn run_process(
    command: &Command,
    shell: bool,
    env: &ChildEnvironment,
) -> Result<AttemptRecord> {
    let name = command.short_name();
    let mut cmd = build_process_command(command, shell, &name)?;
    let spawn_error = |source| RunnerError::Spawn {
        command: command.to_string(),
        source,
    };

    cmd.envs(env).stdin(Stdio::null()).kill_on_drop(true);

    #[cfg(unix)]
    let merged = merge_output(&mut cmd).map_err(spawn_error)?;
    #[cfg(not(unix))]
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!(cmd = %name, shell, command = %command, "spawning process");

    let mut child = cmd.spawn().map_err(spawn_error)?;
    // `cmd` holds the parent's copies of the write end; the reader only
    // sees EOF once they are closed.
    drop(cmd);

    // The channel closes once every reader hits EOF.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    #[cfg(unix)]
    forward_lines(merged, tx.clone());
    #[cfg(not(unix))]
    {
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
    }
    drop(tx);

    let mut output = String::new();
    while let Some(line) = rx.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        log_line(&name, &line);
        output.push_str(&line);
        output.push('\n');
    }

    let status = child.wait().await.map_err(spawn_error)?;

    let exit_code = status.code().unwrap_or(-1);
    debug!(cmd = %name, exit_code, "process exited");

    Ok(AttemptRecord::new(exit_code, output))
}

fn build_process_command(command: &Command, shell: bool, name: &str) -> Result<ProcessCommand> {
    if shell {
        let script = command.shell_script();
        let cmd = if cfg!(windows) {
            let mut c = ProcessCommand::new("cmd");
            c.arg("/C").arg(script);
            c
        } else {
            let mut c = ProcessCommand::new("sh");
            c.arg("-c").arg(script);
            c
        };
        return Ok(cmd);
    }

    let tokens = command.tokens();
    let (program, args) = tokens.split_first().ok_or_else(|| {
        RunnerError::ConfigError(format!("empty command line for '{name}'"))
    })?;

    let mut cmd = ProcessCommand::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// Point the child's stdout and stderr at one pipe, so lines from both
/// streams arrive in the order the child wrote them.
#[cfg(unix)]
fn merge_output(cmd: &mut ProcessCommand) -> std::io::Result<pipe::Receiver> {
    let (sender, receiver) = pipe::pipe()?;
    let write_end = sender.into_blocking_fd()?;
    cmd.stderr(Stdio::from(write_end.try_clone()?));
    cmd.stdout(Stdio::from(write_end));
    Ok(receiver)
}

/// Read `reader` line by line into `tx` until EOF.
///
/// Invalid UTF-8 is replaced rather than ending the stream, so the pipe is
/// always drained and the child can never block on a full buffer.
fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "stopped reading process output");
                    break;
                }
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_stderr_with_exit_code() {
        let runner = SystemProcessRunner::new();
        let cmd = Command::shell("echo out; echo err 1>&2; exit 3");

        let attempt = runner.run(&cmd, true, &ChildEnvironment::new()).await.unwrap();

        assert_eq!(attempt.exit_code, 3);
        assert!(attempt.output.contains("out\n"));
        assert!(attempt.output.contains("err\n"));
    }

    #[tokio::test]
    async fn blank_lines_are_dropped_from_output() {
        let runner = SystemProcessRunner::new();
        let cmd = Command::shell("printf 'a\\n\\n   \\nb\\n'");

        let attempt = runner.run(&cmd, true, &ChildEnvironment::new()).await.unwrap();

        assert_eq!(attempt.output, "a\nb\n");
        assert!(attempt.succeeded());
    }

    #[tokio::test]
    async fn environment_map_reaches_the_child_only() {
        let runner = SystemProcessRunner::new();
        let mut env = ChildEnvironment::new();
        env.insert("RESTIC_RUNNER_PROBE".to_string(), "visible".to_string());

        let cmd = Command::shell("echo $RESTIC_RUNNER_PROBE");
        let attempt = runner.run(&cmd, true, &env).await.unwrap();

        assert_eq!(attempt.output, "visible\n");
        assert!(std::env::var("RESTIC_RUNNER_PROBE").is_err());
    }

    #[tokio::test]
    async fn argv_commands_run_without_a_shell() {
        let runner = SystemProcessRunner::new();
        let cmd = Command::argv(["echo", "$HOME", "*"]);

        let attempt = runner.run(&cmd, false, &ChildEnvironment::new()).await.unwrap();

        assert_eq!(attempt.output, "$HOME *\n");
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let runner = SystemProcessRunner::new();
        let cmd = Command::argv(["/nonexistent/definitely-not-restic", "init"]);

        let err = runner
            .run(&cmd, false, &ChildEnvironment::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RunnerError::Spawn { .. }));
    }
}
