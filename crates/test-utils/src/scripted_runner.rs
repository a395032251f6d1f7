use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use restic_runner::errors::RunnerError;
use restic_runner::exec::process::AttemptFuture;
use restic_runner::exec::{AttemptRecord, ChildEnvironment, Command, ProcessRunner};
use tokio::time::Instant;

/// One scripted attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Exit {
        code: i32,
        output: String,
        delay: Duration,
    },
    /// The process could not be spawned.
    SpawnError,
}

impl Step {
    pub fn ok(output: &str) -> Self {
        Step::Exit {
            code: 0,
            output: output.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(code: i32, output: &str) -> Self {
        Step::Exit {
            code,
            output: output.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn spawn_error() -> Self {
        Step::SpawnError
    }

    /// Make the attempt take `delay` (on the Tokio clock).
    pub fn after(self, delay: Duration) -> Self {
        match self {
            Step::Exit { code, output, .. } => Step::Exit {
                code,
                output,
                delay,
            },
            Step::SpawnError => Step::SpawnError,
        }
    }
}

/// A recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub command: Command,
    pub shell: bool,
    pub env: ChildEnvironment,
    pub at: Instant,
}

struct Rule {
    pattern: String,
    steps: Vec<Step>,
    next: usize,
}

/// A fake process runner that:
/// - records every invocation with the time it started
/// - answers with the scripted steps of the first rule whose pattern is a
///   substring of the command line; the last step repeats once a rule's
///   script is used up
/// - answers `Step::ok("")` when no rule matches.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "a rule needs at least one step");
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            steps,
            next: 0,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines in invocation order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.command.to_string())
            .collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }

    fn next_step(&self, line: &str) -> Step {
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|r| line.contains(&r.pattern)) {
            Some(rule) => {
                let index = rule.next.min(rule.steps.len() - 1);
                rule.next += 1;
                rule.steps[index].clone()
            }
            None => Step::ok(""),
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        command: &'a Command,
        shell: bool,
        env: &'a ChildEnvironment,
    ) -> AttemptFuture<'a> {
        let line = command.to_string();
        self.calls.lock().unwrap().push(Call {
            command: command.clone(),
            shell,
            env: env.clone(),
            at: Instant::now(),
        });
        let step = self.next_step(&line);

        Box::pin(async move {
            match step {
                Step::Exit {
                    code,
                    output,
                    delay,
                } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(AttemptRecord::new(code, output))
                }
                Step::SpawnError => Err(RunnerError::Spawn {
                    command: line,
                    source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
                }),
            }
        })
    }
}
