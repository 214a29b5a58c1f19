use crate::domain::events::ServerEvent;
use crate::domain::models::*;
use crate::domain::session::Transcript;
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Events of one run (or one resumed leg of it). Dropping the stream closes
/// the underlying connection.
pub type EventStream = BoxStream<'static, std::result::Result<ServerEvent, ChatError>>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn descriptor(&self) -> ToolDescriptor;
    async fn execute(&self, input: serde_json::Value) -> ToolResult;
}

/// The hosted assistant service
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn create_assistant(&self, spec: &AssistantSpec, tools: &[ToolDescriptor]) -> Result<String>;
    async fn create_thread(&self) -> Result<String>;
    async fn append_message(&self, thread_id: &str, role: Role, content: &str) -> Result<()>;
    async fn start_run(&self, thread_id: &str, assistant_id: &str, instructions: &str) -> Result<EventStream>;
    async fn submit_tool_outputs(&self, run: &RunRef, outputs: Vec<ToolOutput>) -> Result<EventStream>;
}

pub trait Renderer: Send {
    fn render_title(&mut self, title: &str);
    fn render_transcript(&mut self, transcript: &Transcript);
    fn render_user(&mut self, content: &str);
    /// Redraw the in-progress segment in place
    fn render_partial(&mut self, segment: &str);
    fn render_final(&mut self, content: &str);
    fn render_error(&mut self, message: &str);
}
