use crate::domain::models::{ToolDescriptor, ToolResult};
use crate::domain::ports::Tool;
use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const TOOL_NAME: &str = "get_cat";

/// Fetches a random cat picture URL from a TheCatAPI-style search endpoint.
pub struct CatImageTool {
    client: Client,
    endpoint: url::Url,
}

#[derive(Deserialize)]
struct CatImage {
    url: String,
}

impl CatImageTool {
    pub fn new(endpoint: url::Url, timeout: Option<Duration>) -> Result<Self, ChatError> {
        let mut builder = Client::builder().user_agent("catchat/0.1 (get_cat tool)");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    async fn fetch(&self) -> Result<String, String> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    format!("Request failed: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ));
        }

        let images: Vec<CatImage> = response
            .json()
            .await
            .map_err(|e| format!("Malformed response from cat API: {}", e))?;

        images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| "Cat API returned no images".to_string())
    }
}

#[async_trait]
impl Tool for CatImageTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: TOOL_NAME.to_string(),
            description: "Get an image of a cat".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _input: Value) -> ToolResult {
        let url = self.fetch().await?;
        tracing::debug!(%url, "fetched cat image");
        Ok(Value::String(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn tool_for(server: &MockServer) -> CatImageTool {
        let endpoint = format!("{}/v1/images/search", server.uri()).parse().unwrap();
        CatImageTool::new(endpoint, Some(Duration::from_secs(5))).unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/images/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "a1", "url": "https://cdn2.thecatapi.com/images/a1.jpg", "width": 640, "height": 480 },
                { "id": "b2", "url": "https://cdn2.thecatapi.com/images/b2.jpg" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let result = tool_for(&server).await.execute(json!({})).await;
        assert_eq!(result.unwrap(), json!("https://cdn2.thecatapi.com/images/a1.jpg"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = tool_for(&server).await.execute(json!({})).await.unwrap_err();
        assert_eq!(err, "HTTP error 503: Service Unavailable");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "not in an array" })))
            .mount(&server)
            .await;

        let err = tool_for(&server).await.execute(json!({})).await.unwrap_err();
        assert!(err.starts_with("Malformed response from cat API"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_missing_url_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "a1" }])))
            .mount(&server)
            .await;

        let err = tool_for(&server).await.execute(json!({})).await.unwrap_err();
        assert!(err.starts_with("Malformed response from cat API"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_empty_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = tool_for(&server).await.execute(json!({})).await.unwrap_err();
        assert_eq!(err, "Cat API returned no images");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let tool = CatImageTool::new("http://127.0.0.1:9/".parse().unwrap(), None).unwrap();
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_descriptor() {
        let tool = CatImageTool::new("https://api.thecatapi.com/v1/images/search".parse().unwrap(), None)
            .unwrap();
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "get_cat");
        assert_eq!(descriptor.description, "Get an image of a cat");
        assert_eq!(descriptor.parameters["type"], "object");
    }
}
