// tests/shutdown.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use restic_runner::runner::{Action, RunOptions};
use restic_runner::{run_configs, run_until_shutdown};
use restic_runner_test_utils::builders::ConfigBuilder;
use restic_runner_test_utils::init_tracing;
use restic_runner_test_utils::scripted_runner::{ScriptedRunner, Step};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn signal_stops_the_run_before_remaining_configs() -> TestResult {
    init_tracing();
    let first = ConfigBuilder::new().repository("/srv/slow").build();
    let second = ConfigBuilder::new().repository("/srv/never").build();
    let runner = ScriptedRunner::new().on(
        "/srv/slow",
        vec![Step::ok("").after(Duration::from_secs(3600))],
    );
    let options = RunOptions {
        actions: vec![Action::Unlock],
        ..Default::default()
    };

    let work = run_configs(vec![first, second], options, Arc::new(runner.clone()));
    let shutdown = async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, anyhow::Error>("SIGTERM")
    };

    let err = run_until_shutdown(work, shutdown).await.unwrap_err();

    assert!(err.to_string().contains("SIGTERM"), "{err}");
    assert_eq!(runner.command_lines(), vec!["restic -r /srv/slow unlock"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn finished_work_wins_over_a_pending_signal() -> TestResult {
    init_tracing();
    let work = async { Ok::<_, anyhow::Error>(2) };
    let shutdown = std::future::pending::<anyhow::Result<&'static str>>();

    assert_eq!(run_until_shutdown(work, shutdown).await?, 2);
    Ok(())
}

#[cfg(target_os = "linux")]
fn is_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(") ")
            .is_some_and(|(_, rest)| !rest.starts_with('Z')),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn shutdown_kills_running_children() -> TestResult {
    use restic_runner::exec::{ChildEnvironment, Command, ProcessRunner, SystemProcessRunner};

    init_tracing();
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("child.pid");
    let cmd = Command::shell(format!("echo $$ > {}; exec sleep 30", pid_file.display()));
    let runner = SystemProcessRunner::new();
    let env = ChildEnvironment::new();

    let work = async {
        runner.run(&cmd, true, &env).await?;
        Ok::<_, anyhow::Error>(0)
    };
    let shutdown = async {
        while !std::fs::read_to_string(&pid_file).is_ok_and(|text| text.ends_with('\n')) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok::<_, anyhow::Error>("SIGTERM")
    };

    let err = tokio::time::timeout(Duration::from_secs(5), run_until_shutdown(work, shutdown))
        .await?
        .unwrap_err();
    assert!(err.to_string().contains("SIGTERM"), "{err}");

    let pid: u32 = std::fs::read_to_string(&pid_file)?.trim().parse()?;
    let mut waited = Duration::ZERO;
    while is_running(pid) && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    assert!(!is_running(pid), "child {pid} survived shutdown");
    Ok(())
}
