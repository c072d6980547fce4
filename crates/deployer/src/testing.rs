//! Scripted command runner for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{CommandOutput, CommandRunner};
use crate::error::ToolError;

enum Reply {
    Stdout(String),
    Fail { code: i32, stderr: String },
    Spawn,
    Timeout,
}

/// Records every invocation and answers from a list of prefix rules.
///
/// The first rule whose prefix matches the joined command line wins;
/// unmatched commands succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, prefix: &str, stdout: &str) -> Self {
        self.rules
            .push((prefix.to_string(), Reply::Stdout(stdout.to_string())));
        self
    }

    pub fn fail(mut self, prefix: &str, code: i32, stderr: &str) -> Self {
        self.rules.push((
            prefix.to_string(),
            Reply::Fail {
                code,
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn spawn_error(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Reply::Spawn));
        self
    }

    pub fn time_out(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Reply::Timeout));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ToolError> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply);

        match reply {
            None => Ok(CommandOutput::default()),
            Some(Reply::Stdout(stdout)) => Ok(CommandOutput::stdout(stdout.clone())),
            Some(Reply::Fail { code, stderr }) => Err(ToolError::Failed {
                program: program.to_string(),
                code: Some(*code),
                stderr: stderr.clone(),
            }),
            Some(Reply::Spawn) => Err(ToolError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            }),
            Some(Reply::Timeout) => Err(ToolError::Timeout {
                program: program.to_string(),
                after: Duration::from_secs(900),
            }),
        }
    }
}
