// Scripted command runner for unit tests

use super::runner::{CommandOutput, CommandRunner};
use crate::{WipeError, WipeResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Output(CommandOutput),
    Error(WipeError),
}

/// Answers commands from a table keyed by the full command line
/// (`"smartctl -i /dev/sda"`). Unregistered commands behave as missing tools.
/// A queued sequence is consumed in order and its last entry repeats.
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, command_line: &str, output: CommandOutput) -> Self {
        self.script(command_line, vec![FakeResponse::Output(output)])
    }

    pub fn fail(self, command_line: &str, error: WipeError) -> Self {
        self.script(command_line, vec![FakeResponse::Error(error)])
    }

    pub fn script(self, command_line: &str, sequence: Vec<FakeResponse>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command_line.to_string(), sequence.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command_line)
            .count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> WipeResult<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line.clone());

        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(&line) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(FakeResponse::Output(output)) => Ok(output),
            Some(FakeResponse::Error(error)) => Err(error),
            None => Err(WipeError::CommandNotFound(program.to_string())),
        }
    }
}
