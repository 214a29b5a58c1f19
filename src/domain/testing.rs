//! Fakes shared by the domain tests.

use crate::domain::events::{self, ServerEvent};
use crate::domain::models::*;
use crate::domain::ports::{AssistantService, EventStream, Renderer};
use crate::domain::session::Transcript;
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn stream_of(events: Vec<ServerEvent>) -> EventStream {
    futures::stream::iter(events.into_iter().map(Ok)).boxed()
}

pub fn run_event(kind: &str, thread_id: &str, run_id: &str) -> ServerEvent {
    ServerEvent::new(kind, json!({ "id": run_id, "thread_id": thread_id }))
}

pub fn requires_action(thread_id: &str, run_id: &str, call_ids: &[&str]) -> ServerEvent {
    let tool_calls: Vec<_> = call_ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": "get_cat", "arguments": "{}" }
            })
        })
        .collect();

    ServerEvent::new(
        events::RUN_REQUIRES_ACTION,
        json!({
            "id": run_id,
            "thread_id": thread_id,
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": { "tool_calls": tool_calls }
            }
        }),
    )
}

pub fn message_delta(message_id: &str, value: &str) -> ServerEvent {
    ServerEvent::new(
        events::MESSAGE_DELTA,
        json!({
            "id": message_id,
            "object": "thread.message.delta",
            "delta": { "content": [{ "index": 0, "type": "text", "text": { "value": value } }] }
        }),
    )
}

pub fn message_completed(message_id: &str, value: &str) -> ServerEvent {
    ServerEvent::new(
        events::MESSAGE_COMPLETED,
        json!({
            "id": message_id,
            "object": "thread.message",
            "role": "assistant",
            "content": [{ "type": "text", "text": { "value": value, "annotations": [] } }]
        }),
    )
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub titles: Vec<String>,
    pub transcripts: Vec<Transcript>,
    pub users: Vec<String>,
    pub partials: Vec<String>,
    pub finals: Vec<String>,
    pub errors: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn render_title(&mut self, title: &str) {
        self.titles.push(title.to_string());
    }

    fn render_transcript(&mut self, transcript: &Transcript) {
        self.transcripts.push(transcript.clone());
    }

    fn render_user(&mut self, content: &str) {
        self.users.push(content.to_string());
    }

    fn render_partial(&mut self, segment: &str) {
        self.partials.push(segment.to_string());
    }

    fn render_final(&mut self, content: &str) {
        self.finals.push(content.to_string());
    }

    fn render_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// Scripted assistant service: hands out queued streams and records calls.
#[derive(Default)]
pub struct FakeService {
    pub streams: Mutex<VecDeque<Vec<Result<ServerEvent>>>>,
    pub messages: Mutex<Vec<(String, Role, String)>>,
    pub runs_started: Mutex<Vec<(String, String, String)>>,
    pub submissions: Mutex<Vec<(RunRef, Vec<ToolOutput>)>>,
    pub assistants: Mutex<Vec<(String, Vec<ToolDescriptor>)>>,
}

impl FakeService {
    pub fn with_streams(streams: Vec<Vec<ServerEvent>>) -> Self {
        let service = Self::default();
        {
            let mut queue = service.streams.lock().unwrap();
            for events in streams {
                queue.push_back(events.into_iter().map(Ok).collect());
            }
        }
        service
    }

    pub fn push_raw(&self, events: Vec<Result<ServerEvent>>) {
        self.streams.lock().unwrap().push_back(events);
    }

    fn next_stream(&self) -> Result<EventStream> {
        let events = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChatError::Transport("no scripted stream left".into()))?;
        Ok(futures::stream::iter(events).boxed())
    }
}

#[async_trait]
impl AssistantService for FakeService {
    async fn create_assistant(&self, spec: &AssistantSpec, tools: &[ToolDescriptor]) -> Result<String> {
        self.assistants
            .lock()
            .unwrap()
            .push((spec.name.clone(), tools.to_vec()));
        Ok("asst_1".to_string())
    }

    async fn create_thread(&self) -> Result<String> {
        Ok("thread_1".to_string())
    }

    async fn append_message(&self, thread_id: &str, role: Role, content: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((thread_id.to_string(), role, content.to_string()));
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, assistant_id: &str, instructions: &str) -> Result<EventStream> {
        self.runs_started.lock().unwrap().push((
            thread_id.to_string(),
            assistant_id.to_string(),
            instructions.to_string(),
        ));
        self.next_stream()
    }

    async fn submit_tool_outputs(&self, run: &RunRef, outputs: Vec<ToolOutput>) -> Result<EventStream> {
        self.submissions.lock().unwrap().push((run.clone(), outputs));
        self.next_stream()
    }
}
