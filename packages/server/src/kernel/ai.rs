// AI implementation using OpenAI
//
// This is the infrastructure implementation of BaseAI.
// Business logic (what to prompt for) lives in domain layers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient};

use super::BaseAI;

/// OpenAI chat model bound to one model name and temperature.
#[derive(Clone)]
pub struct OpenAIChat {
    client: OpenAIClient,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(client: OpenAIClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    fn request(&self, system: &str, user: &str) -> ChatRequest {
        ChatRequest::new(&self.model)
            .message(Message::system(system))
            .message(Message::user(user))
            .temperature(self.temperature)
    }
}

#[async_trait]
impl BaseAI for OpenAIChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        tracing::debug!(model = %self.model, prompt_length = user.len(), "calling OpenAI");

        let response = self
            .client
            .chat_completion(self.request(system, user))
            .await
            .context("OpenAI chat completion failed")?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI response received"
            );
        }

        Ok(response.content)
    }

    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .chat_completion(self.request(system, user).json_mode())
            .await
            .context("OpenAI JSON completion failed")?;

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    #[tokio::test]
    async fn sends_model_temperature_and_both_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.5,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(reply("hi"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new("sk-test").with_base_url(server.uri());
        let chat = OpenAIChat::new(client, "gpt-4o-mini", 0.5);

        assert_eq!(chat.complete("be brief", "hello").await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn json_completion_requests_json_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"}
            })))
            .respond_with(reply("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new("sk-test").with_base_url(server.uri());
        let chat = OpenAIChat::new(client, "gpt-4o-mini", 0.3);

        assert_eq!(chat.complete_json("sys", "user").await.unwrap(), "{\"ok\":true}");
    }

    #[tokio::test]
    async fn api_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OpenAIClient::new("sk-test").with_base_url(server.uri());
        let chat = OpenAIChat::new(client, "gpt-4o-mini", 0.3);

        assert!(chat.complete("sys", "user").await.is_err());
    }
}
