use crate::domain::models::{Role, RunRef};
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Append-only chat history for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}

/// Per-conversation state, owned by the driver and lent to each stream adapter.
#[derive(Debug)]
pub struct SessionState {
    thread_id: String,
    pub transcript: Transcript,
    active_run: Option<RunRef>,
    streaming: bool,
}

impl SessionState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            transcript: Transcript::default(),
            active_run: None,
            streaming: false,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn active_run(&self) -> Option<&RunRef> {
        self.active_run.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Refuses a new turn while the previous run is still streaming
    pub fn begin_turn(&mut self) -> Result<()> {
        if self.streaming {
            return Err(ChatError::RunInProgress);
        }
        self.streaming = true;
        self.active_run = None;
        Ok(())
    }

    pub fn finish_turn(&mut self) {
        self.streaming = false;
    }

    /// Record the run the service reports for this turn. A second, different
    /// run within one turn means the stream is answering for someone else.
    pub fn track_run(&mut self, run: RunRef) -> Result<()> {
        if run.thread_id != self.thread_id {
            return Err(ChatError::StaleRun {
                expected: self.thread_id.clone(),
                actual: run.to_string(),
            });
        }
        match &self.active_run {
            Some(active) if *active != run => Err(ChatError::StaleRun {
                expected: active.to_string(),
                actual: run.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                tracing::debug!(run = %run, "tracking run");
                self.active_run = Some(run);
                Ok(())
            }
        }
    }
}
