//! Consumes the event stream of a run.
//!
//! Each stream (the initial run and every resumed leg after tool outputs are
//! submitted) gets a fresh [`StreamEventAdapter`]. The adapter accumulates
//! text, appends finished segments to the transcript and, when the run pauses
//! for tool calls, hands the pending action back to [`drive_run`], which
//! executes the tools, submits the whole batch and loops on the new stream.

use crate::domain::events::{self, MessageDelta, MessageObject, RunObject, ServerEvent};
use crate::domain::models::{Role, RunRef, ToolCallRequest};
use crate::domain::ports::{AssistantService, EventStream, Renderer};
use crate::domain::session::SessionState;
use crate::domain::tools::ToolExecutor;
use crate::error::{ChatError, Result};
use futures::StreamExt;
use std::collections::HashSet;

/// Callbacks a stream handler reacts to.
pub trait AssistantEventHandler {
    /// Every raw event, before any text callback it produces
    fn on_event(&mut self, event: &ServerEvent) -> Result<()>;
    fn on_text_created(&mut self);
    fn on_text_delta(&mut self, delta: Option<&str>);
    fn on_text_done(&mut self, text: &str);
}

/// Text segments of one stream; the last one is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAccumulator {
    segments: Vec<String>,
}

impl Default for TextAccumulator {
    fn default() -> Self {
        Self {
            segments: vec![String::new()],
        }
    }
}

impl TextAccumulator {
    pub fn begin_segment(&mut self) {
        self.segments = vec![String::new()];
    }

    /// Appends a non-empty delta and returns the updated segment
    pub fn push(&mut self, delta: Option<&str>) -> Option<&str> {
        let delta = delta.filter(|d| !d.is_empty())?;
        let current = self.segments.last_mut()?;
        current.push_str(delta);
        Some(current.as_str())
    }

    pub fn current(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Turns wire events into handler callbacks.
///
/// A message delta carries content parts by index; the first part seen for a
/// given (message, index) starts a new text segment.
#[derive(Debug, Default)]
pub struct EventRouter {
    started: HashSet<(String, usize)>,
}

impl EventRouter {
    pub fn route<H: AssistantEventHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        event: &ServerEvent,
    ) -> Result<()> {
        handler.on_event(event)?;

        match event.event.as_str() {
            events::MESSAGE_DELTA => {
                let delta: MessageDelta = event.parse()?;
                for part in delta.delta.content.iter().filter(|p| p.kind == "text") {
                    if self.started.insert((delta.id.clone(), part.index)) {
                        handler.on_text_created();
                    }
                    let value = part.text.as_ref().and_then(|t| t.value.as_deref());
                    handler.on_text_delta(value);
                }
            }
            // An incomplete message still carries the text produced so far
            events::MESSAGE_COMPLETED | events::MESSAGE_INCOMPLETE => {
                let message: MessageObject = event.parse()?;
                for part in message.content.iter().filter(|p| p.kind == "text") {
                    if let Some(text) = &part.text {
                        handler.on_text_done(&text.value);
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Idle,
    StreamingText,
    AwaitingToolResults,
    Done,
}

/// A run paused on tool calls
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub run: RunRef,
    pub tool_calls: Vec<ToolCallRequest>,
}

pub struct StreamEventAdapter<'a> {
    session: &'a mut SessionState,
    renderer: &'a mut dyn Renderer,
    text: TextAccumulator,
    state: AdapterState,
    pending: Option<PendingAction>,
}

impl<'a> StreamEventAdapter<'a> {
    pub fn new(session: &'a mut SessionState, renderer: &'a mut dyn Renderer) -> Self {
        Self {
            session,
            renderer,
            text: TextAccumulator::default(),
            state: AdapterState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn text(&self) -> &TextAccumulator {
        &self.text
    }

    /// Reads events until the run finishes or pauses for tool calls. On a
    /// pause the rest of this stream is abandoned.
    pub async fn consume(&mut self, mut stream: EventStream) -> Result<()> {
        let mut router = EventRouter::default();

        while let Some(event) = stream.next().await {
            let event = event?;
            tracing::trace!(event = %event.event, "stream event");
            router.route(&mut *self, &event)?;

            if matches!(self.state, AdapterState::AwaitingToolResults | AdapterState::Done) {
                break;
            }
        }

        if self.state != AdapterState::AwaitingToolResults {
            self.state = AdapterState::Done;
        }
        Ok(())
    }

    pub fn into_pending(self) -> Option<PendingAction> {
        self.pending
    }

    fn on_requires_action(&mut self, event: &ServerEvent) -> Result<()> {
        let run: RunObject = event.parse()?;
        let run_ref = run.run_ref();
        self.session.track_run(run_ref.clone())?;

        let Some(tool_calls) = run.pending_tool_calls() else {
            tracing::warn!(run = %run_ref, "run requires an action other than tool outputs");
            return Ok(());
        };

        tracing::info!(run = %run_ref, calls = tool_calls.len(), "run requires tool outputs");
        self.pending = Some(PendingAction {
            run: run_ref,
            tool_calls,
        });
        self.state = AdapterState::AwaitingToolResults;
        Ok(())
    }
}

impl AssistantEventHandler for StreamEventAdapter<'_> {
    fn on_event(&mut self, event: &ServerEvent) -> Result<()> {
        match event.event.as_str() {
            events::RUN_CREATED | events::RUN_QUEUED | events::RUN_IN_PROGRESS => {
                let run: RunObject = event.parse()?;
                self.session.track_run(run.run_ref())
            }
            events::RUN_REQUIRES_ACTION => self.on_requires_action(event),
            events::RUN_COMPLETED | events::DONE => {
                self.state = AdapterState::Done;
                Ok(())
            }
            events::RUN_FAILED | events::RUN_CANCELLED | events::RUN_EXPIRED => {
                let run: RunObject = event.parse()?;
                let reason = match run.last_error {
                    Some(err) => match (err.code, err.message) {
                        (Some(code), Some(message)) => format!("{}: {}", code, message),
                        (None, Some(message)) => message,
                        (Some(code), None) => code,
                        (None, None) => event.event.clone(),
                    },
                    None => event.event.clone(),
                };
                Err(ChatError::RunFailed(reason))
            }
            events::RUN_INCOMPLETE => {
                let run: RunObject = event.parse()?;
                let reason = run
                    .incomplete_details
                    .and_then(|d| d.reason)
                    .unwrap_or_else(|| "no reason given".to_string());
                Err(ChatError::RunFailed(format!("incomplete: {}", reason)))
            }
            events::ERROR => Err(ChatError::Service(events::error_message(&event.data))),
            _ => Ok(()),
        }
    }

    fn on_text_created(&mut self) {
        self.text.begin_segment();
        self.state = AdapterState::StreamingText;
    }

    fn on_text_delta(&mut self, delta: Option<&str>) {
        if let Some(current) = self.text.push(delta) {
            self.renderer.render_partial(current);
        }
    }

    fn on_text_done(&mut self, text: &str) {
        self.session.transcript.push(Role::Assistant, text);
        self.renderer.render_final(text);
        self.state = AdapterState::Idle;
    }
}

/// Drives a run to completion, resuming it after each tool-call pause.
pub async fn drive_run(
    service: &dyn AssistantService,
    executor: &ToolExecutor,
    session: &mut SessionState,
    renderer: &mut dyn Renderer,
    stream: EventStream,
) -> Result<()> {
    let mut stream = stream;

    loop {
        let pending = {
            let mut adapter = StreamEventAdapter::new(session, renderer);
            adapter.consume(stream).await?;
            adapter.into_pending()
        };

        let Some(action) = pending else {
            return Ok(());
        };

        let outputs = executor.execute_all(&action.tool_calls).await;
        tracing::debug!(run = %action.run, outputs = outputs.len(), "submitting tool outputs");
        stream = service.submit_tool_outputs(&action.run, outputs).await?;
    }
}
