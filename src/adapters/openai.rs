use crate::domain::events::ServerEvent;
use crate::domain::models::*;
use crate::domain::ports::{AssistantService, EventStream};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the OpenAI Assistants (v2) API.
pub struct OpenAIAssistants {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIAssistants {
    pub fn new(api_key: String, base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            // Applies to connecting only; streams stay open as long as the run
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let response = self.post(path).json(body).send().await?;
        check_status(response).await
    }

    async fn create_object<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let response = self.send_json(path, body).await?;
        let created: CreatedObject = response
            .json()
            .await
            .map_err(|e| ChatError::Protocol(format!("unexpected response from {}: {}", path, e)))?;
        Ok(created.id)
    }

    async fn open_stream<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<EventStream> {
        let response = self
            .post(path)
            .header("Accept", "text/event-stream")
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(event_stream(response))
    }
}

// --- Request Structs ---

#[derive(Serialize)]
struct CreateAssistantRequest<'a> {
    name: &'a str,
    description: &'a str,
    model: &'a str,
    tools: Vec<Value>,
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
    instructions: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct SubmitToolOutputsRequest {
    tool_outputs: Vec<ToolOutput>,
    stream: bool,
}

// --- Response Structs ---

#[derive(Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                body
            }
        });

    Err(ChatError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Decode an SSE body into server events. `data: [DONE]` becomes the `done`
/// event; anything else must be JSON.
fn event_stream(response: Response) -> EventStream {
    response
        .bytes_stream()
        .eventsource()
        .map(|frame| -> Result<ServerEvent> {
            let frame = frame.map_err(|e| ChatError::Transport(e.to_string()))?;
            if frame.data == "[DONE]" {
                return Ok(ServerEvent::done());
            }
            let data: Value = serde_json::from_str(&frame.data).map_err(|e| {
                ChatError::Protocol(format!("invalid JSON in '{}' event: {}", frame.event, e))
            })?;
            Ok(ServerEvent::new(frame.event, data))
        })
        .boxed()
}

#[async_trait]
impl AssistantService for OpenAIAssistants {
    async fn create_assistant(&self, spec: &AssistantSpec, tools: &[ToolDescriptor]) -> Result<String> {
        // Wrap tool schemas in OpenAI format: { type: "function", function: { ... } }
        let tools = tools
            .iter()
            .map(|t| json!({ "type": "function", "function": t }))
            .collect();

        let body = CreateAssistantRequest {
            name: &spec.name,
            description: &spec.description,
            model: &spec.model,
            tools,
        };
        let id = self.create_object("/assistants", &body).await?;
        tracing::debug!(assistant = %id, model = %spec.model, "assistant created");
        Ok(id)
    }

    async fn create_thread(&self) -> Result<String> {
        self.create_object("/threads", &json!({})).await
    }

    async fn append_message(&self, thread_id: &str, role: Role, content: &str) -> Result<()> {
        let body = CreateMessageRequest {
            role: role.as_str(),
            content,
        };
        self.send_json(&format!("/threads/{}/messages", thread_id), &body)
            .await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, assistant_id: &str, instructions: &str) -> Result<EventStream> {
        let body = CreateRunRequest {
            assistant_id,
            instructions,
            stream: true,
        };
        self.open_stream(&format!("/threads/{}/runs", thread_id), &body)
            .await
    }

    async fn submit_tool_outputs(&self, run: &RunRef, outputs: Vec<ToolOutput>) -> Result<EventStream> {
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs,
            stream: true,
        };
        self.open_stream(
            &format!(
                "/threads/{}/runs/{}/submit_tool_outputs",
                run.thread_id, run.run_id
            ),
            &body,
        )
        .await
    }
}
