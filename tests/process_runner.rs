// tests/process_runner.rs
#![cfg(unix)]

use std::error::Error;

use restic_runner::errors::RunnerError;
use restic_runner::exec::{ChildEnvironment, Command, ProcessRunner, SystemProcessRunner};
use restic_runner_test_utils::{capture_logs, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn captures_stdout_and_stderr_and_exit_code() -> TestResult {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let cmd = Command::shell("echo out; echo 'warning: cache stale' >&2; exit 3");

    let attempt = with_timeout(runner.run(&cmd, true, &ChildEnvironment::new())).await?;

    assert_eq!(attempt.exit_code, 3);
    assert!(attempt.output.contains("out\n"));
    assert!(attempt.output.contains("warning: cache stale\n"));
    Ok(())
}

#[tokio::test]
async fn stdout_and_stderr_lines_keep_the_order_they_were_written() -> TestResult {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let cmd = Command::shell("echo one; echo two >&2; echo three; echo four >&2");

    let attempt = with_timeout(runner.run(&cmd, true, &ChildEnvironment::new())).await?;

    assert_eq!(attempt.output, "one\ntwo\nthree\nfour\n");
    Ok(())
}

#[test]
fn each_non_blank_line_is_logged_once_with_its_command_name() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let cmd = Command::shell("printf 'FATAL: x\\n\\nunchanged /etc/foo\\n'");

    let (attempt, logs) = capture_logs(|| {
        runtime.block_on(SystemProcessRunner::new().run(&cmd, true, &ChildEnvironment::new()))
    });

    let attempt = attempt.expect("printf runs");
    assert_eq!(attempt.output, "FATAL: x\nunchanged /etc/foo\n");

    let lines: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("restic_runner::exec::output"))
        .collect();
    assert_eq!(lines.len(), 2, "{logs}");

    let fatal = lines[0];
    assert!(fatal.contains("ERROR"), "{fatal}");
    assert!(fatal.contains("FATAL: x"), "{fatal}");
    assert!(fatal.contains("cmd=printf"), "{fatal}");
    assert!(fatal.contains("severity=\"critical\""), "{fatal}");

    let unchanged = lines[1];
    assert!(unchanged.contains("DEBUG"), "{unchanged}");
    assert!(unchanged.contains("unchanged /etc/foo"), "{unchanged}");
    assert!(unchanged.contains("cmd=printf"), "{unchanged}");
    assert!(!unchanged.contains("severity"), "{unchanged}");
}

#[tokio::test]
async fn blank_lines_are_dropped() -> TestResult {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let cmd = Command::argv(["printf", "a\\n\\n   \\nb\\n"]);

    let attempt = with_timeout(runner.run(&cmd, false, &ChildEnvironment::new())).await?;

    assert_eq!(attempt.exit_code, 0);
    assert_eq!(attempt.output, "a\nb\n");
    Ok(())
}

#[tokio::test]
async fn argv_mode_does_not_interpret_shell_syntax() -> TestResult {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let cmd = Command::argv(["echo", "$HOME", "&&", "false"]);

    let attempt = with_timeout(runner.run(&cmd, false, &ChildEnvironment::new())).await?;

    assert_eq!(attempt.exit_code, 0);
    assert_eq!(attempt.output, "$HOME && false\n");
    Ok(())
}

#[tokio::test]
async fn child_environment_is_applied_without_touching_the_parent() -> TestResult {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let env = ChildEnvironment::from([(
        "RESTIC_RUNNER_TEST_VALUE".to_string(),
        "from-config".to_string(),
    )]);
    let cmd = Command::shell("echo \"value=$RESTIC_RUNNER_TEST_VALUE\"");

    let attempt = with_timeout(runner.run(&cmd, true, &env)).await?;

    assert_eq!(attempt.output, "value=from-config\n");
    assert!(std::env::var("RESTIC_RUNNER_TEST_VALUE").is_err());
    Ok(())
}

#[tokio::test]
async fn stdin_is_not_connected() -> TestResult {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let cmd = Command::argv(["cat"]);

    let attempt = with_timeout(runner.run(&cmd, false, &ChildEnvironment::new())).await?;

    assert_eq!(attempt.exit_code, 0);
    assert_eq!(attempt.output, "");
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() {
    init_tracing();
    let runner = SystemProcessRunner::new();
    let cmd = Command::argv(["/nonexistent/restic-runner-missing-binary", "version"]);

    let err = with_timeout(runner.run(&cmd, false, &ChildEnvironment::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Spawn { .. }));
}
