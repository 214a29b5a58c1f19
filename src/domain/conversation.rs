use crate::domain::models::{AssistantSpec, Role};
use crate::domain::ports::{AssistantService, Renderer};
use crate::domain::session::SessionState;
use crate::domain::stream::drive_run;
use crate::domain::tools::{ToolExecutor, ToolRegistry};
use crate::error::Result;
use std::sync::Arc;

/// Turn-taking over one assistant thread.
pub struct ConversationDriver {
    service: Arc<dyn AssistantService>,
    executor: ToolExecutor,
    assistant_id: String,
    instructions: String,
    session: SessionState,
}

impl ConversationDriver {
    /// Creates the assistant (advertising every registered tool) and a fresh thread.
    pub async fn start(
        service: Arc<dyn AssistantService>,
        registry: ToolRegistry,
        spec: AssistantSpec,
    ) -> Result<Self> {
        let assistant_id = service.create_assistant(&spec, &registry.descriptors()).await?;
        let thread_id = service.create_thread().await?;
        tracing::info!(assistant = %assistant_id, thread = %thread_id, "conversation started");

        Ok(Self {
            service,
            executor: ToolExecutor::new(registry),
            assistant_id,
            instructions: spec.instructions,
            session: SessionState::new(thread_id),
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn render_history(&self, renderer: &mut dyn Renderer) {
        renderer.render_transcript(&self.session.transcript);
    }

    /// One user turn. Failures end the turn, are shown to the user and returned.
    pub async fn send(&mut self, prompt: &str, renderer: &mut dyn Renderer) -> Result<()> {
        if let Err(err) = self.session.begin_turn() {
            renderer.render_error(&err.to_string());
            return Err(err);
        }

        self.session.transcript.push(Role::User, prompt);
        renderer.render_user(prompt);

        let result = self.run_turn(prompt, renderer).await;
        self.session.finish_turn();

        if let Err(ref err) = result {
            tracing::error!(error = %err, "turn failed");
            renderer.render_error(&err.to_string());
        }
        result
    }

    async fn run_turn(&mut self, prompt: &str, renderer: &mut dyn Renderer) -> Result<()> {
        let thread_id = self.session.thread_id().to_string();
        self.service
            .append_message(&thread_id, Role::User, prompt)
            .await?;

        let stream = self
            .service
            .start_run(&thread_id, &self.assistant_id, &self.instructions)
            .await?;

        drive_run(
            self.service.as_ref(),
            &self.executor,
            &mut self.session,
            renderer,
            stream,
        )
        .await
    }
}
