use shared::error::BenchError;
use shared::types::Result;
use std::time::Duration;

/// Lifecycle of a streamed completion.
///
/// `NotStarted -> AwaitingFirstChunk -> Receiving -> Complete`, with `Failed`
/// reachable from every non-terminal state. A stream that ends before any
/// content may complete straight from `AwaitingFirstChunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    NotStarted,
    AwaitingFirstChunk,
    Receiving,
    Complete,
    Failed,
}

impl StreamState {
    pub fn name(self) -> &'static str {
        match self {
            StreamState::NotStarted => "NOT_STARTED",
            StreamState::AwaitingFirstChunk => "AWAITING_FIRST_CHUNK",
            StreamState::Receiving => "RECEIVING",
            StreamState::Complete => "COMPLETE",
            StreamState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Complete | StreamState::Failed)
    }

    fn can_move_to(self, next: StreamState) -> bool {
        use StreamState::*;
        match (self, next) {
            (NotStarted, AwaitingFirstChunk) => true,
            (AwaitingFirstChunk, Receiving) => true,
            (AwaitingFirstChunk, Complete) | (Receiving, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub streaming: bool,
    pub response_time: Duration,
    /// Time to the first non-empty chunk. Streaming only.
    pub first_response_time: Option<Duration>,
    /// Streaming only.
    pub tokens_per_second: Option<f64>,
    /// Non-empty chunks received. Streaming only.
    pub chunk_count: Option<usize>,
    pub content: String,
}

impl BenchmarkResult {
    pub fn non_streaming(response_time: Duration, content: String) -> Self {
        Self {
            streaming: false,
            response_time,
            first_response_time: None,
            tokens_per_second: None,
            chunk_count: None,
            content,
        }
    }
}

/// Counts non-empty chunks only; empty deltas are ignored for display and rate.
pub fn tokens_per_second(chunk_count: usize, response_time: Duration) -> f64 {
    let secs = response_time.as_secs_f64();
    if secs > 0.0 {
        chunk_count as f64 / secs
    } else {
        0.0
    }
}

/// Timing collected while a streamed completion is consumed. Timestamps are
/// offsets from request dispatch.
#[derive(Debug)]
pub struct StreamingMetrics {
    state: StreamState,
    chunk_count: usize,
    first_chunk: Option<Duration>,
    completed: Option<Duration>,
}

impl StreamingMetrics {
    pub fn new() -> Self {
        Self {
            state: StreamState::NotStarted,
            chunk_count: 0,
            first_chunk: None,
            completed: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    fn transition(&mut self, next: StreamState) -> Result<()> {
        if !self.state.can_move_to(next) {
            return Err(BenchError::State {
                from: self.state.name(),
                to: next.name(),
            });
        }
        tracing::debug!(from = self.state.name(), to = next.name(), "stream transition");
        self.state = next;
        Ok(())
    }

    /// Request dispatched.
    pub fn start(&mut self) -> Result<()> {
        self.transition(StreamState::AwaitingFirstChunk)
    }

    /// Returns whether the chunk was counted.
    pub fn record_chunk(&mut self, at: Duration, content: &str) -> Result<bool> {
        match self.state {
            StreamState::AwaitingFirstChunk | StreamState::Receiving => {}
            other => {
                return Err(BenchError::State {
                    from: other.name(),
                    to: StreamState::Receiving.name(),
                })
            }
        }
        if content.is_empty() {
            return Ok(false);
        }
        if self.state == StreamState::AwaitingFirstChunk {
            self.transition(StreamState::Receiving)?;
            self.first_chunk = Some(at);
        }
        self.chunk_count += 1;
        Ok(true)
    }

    /// Stream exhausted.
    pub fn complete(&mut self, at: Duration) -> Result<()> {
        self.transition(StreamState::Complete)?;
        self.completed = Some(at);
        Ok(())
    }

    pub fn fail(&mut self) -> Result<()> {
        self.transition(StreamState::Failed)
    }

    pub fn into_result(self, content: String) -> Result<BenchmarkResult> {
        let response_time = match (self.state, self.completed) {
            (StreamState::Complete, Some(at)) => at,
            (state, _) => {
                return Err(BenchError::State {
                    from: state.name(),
                    to: StreamState::Complete.name(),
                })
            }
        };
        Ok(BenchmarkResult {
            streaming: true,
            response_time,
            first_response_time: self.first_chunk,
            tokens_per_second: Some(tokens_per_second(self.chunk_count, response_time)),
            chunk_count: Some(self.chunk_count),
            content,
        })
    }
}

impl Default for StreamingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
