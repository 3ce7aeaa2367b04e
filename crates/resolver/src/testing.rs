//! Scripted resolver backend for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

use crate::{ResolverOutput, VersionResolverBackend};

/// One recorded query.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    /// Tool that was asked for.
    pub tool: String,
    /// Range that was sent.
    pub range: String,
    /// Tokio clock reading at the time of the call.
    pub at: Instant,
}

/// Backend that replays queued answers and records every query.
///
/// Once the queue is empty the last answer is repeated.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    answers: Arc<Mutex<VecDeque<std::result::Result<ResolverOutput, String>>>>,
    last: Arc<Mutex<Option<std::result::Result<ResolverOutput, String>>>>,
    calls: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl ScriptedBackend {
    /// Create a backend with no answers queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer line.
    #[must_use]
    pub fn answer(self, line: &str) -> Self {
        self.push(Ok(ResolverOutput::ok(line)))
    }

    /// Queue a failed answer line.
    #[must_use]
    pub fn fail(self, line: &str) -> Self {
        self.push(Ok(ResolverOutput::failed(line)))
    }

    /// Queue a query that cannot be made at all.
    #[must_use]
    pub fn io_error(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    fn push(self, answer: std::result::Result<ResolverOutput, String>) -> Self {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(answer);
        self
    }

    /// Every query made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of queries made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl VersionResolverBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn query(&self, tool: &str, range: &str) -> std::io::Result<ResolverOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedQuery {
                tool: tool.to_string(),
                range: range.to_string(),
                at: Instant::now(),
            });

        let next = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(answer) = next {
            *last = Some(answer);
        }

        match last.clone() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(std::io::Error::other(message)),
            None => Err(std::io::Error::other("no scripted answer")),
        }
    }
}
