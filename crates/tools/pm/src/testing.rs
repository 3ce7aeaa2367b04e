//! Recording command runner for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{CommandOutput, CommandRunner, Invocation};

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    Unavailable,
}

/// Runner that records invocations and answers from canned responses.
///
/// Responses are matched by command-line prefix, first registration wins.
/// Unmatched commands succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    responses: Arc<Mutex<Vec<(String, Response)>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingRunner {
    /// Create a runner where every command succeeds silently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `stdout`.
    #[must_use]
    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.register(prefix, Response::Output(CommandOutput::success(stdout)))
    }

    /// Make commands starting with `prefix` exit with `code`.
    #[must_use]
    pub fn fail_on(self, prefix: &str, code: i32, stderr: &str) -> Self {
        self.register(prefix, Response::Output(CommandOutput::failure(code, stderr)))
    }

    /// Make `program` impossible to start.
    #[must_use]
    pub fn unavailable(self, program: &str) -> Self {
        self.register(program, Response::Unavailable)
    }

    /// Every invocation run so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command lines of every invocation run so far.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    fn register(self, prefix: &str, response: Response) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((prefix.to_string(), response));
        self
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        let line = invocation.command_line();
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            Some(Response::Output(output)) => Ok(output),
            Some(Response::Unavailable) => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", invocation.program),
            )),
            None => Ok(CommandOutput::success("")),
        }
    }
}
