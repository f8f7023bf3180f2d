//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, vLLM, LM Studio, Ollama's `/v1` shim and any other
//! endpoint exposing `/chat/completions` and `/embeddings`.
//!
//! The assembled prompt already carries its own instructions, so it goes
//! out as a single user message.

use crate::http::{build_client, check_status, parse_error, transport_error};
use async_trait::async_trait;
use pokerag_core::error::ProviderError;
use pokerag_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(timeout)?,
        })
    }

    /// OpenAI proper.
    pub fn openai(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key, timeout)
    }

    fn chat_body(request: &CompletionRequest) -> ChatBody<'_> {
        ChatBody {
            model: &request.model,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_tokens: request.options.max_tokens,
            stream: false,
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B, model: &str) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, model).await
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        request.options.validate()?;
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .post("chat/completions", &Self::chat_body(&request), &request.model)
            .await?;
        let api: ChatResponse = response
            .json()
            .await
            .map_err(|e| parse_error("completion response", e))?;

        let text = api
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::EmptyResponse("no choices in response".into()))?;

        Ok(CompletionResponse {
            text,
            model: api.model,
            usage: api.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });
        let response = self.post("embeddings", &body, &request.model).await?;
        let api: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| parse_error("embedding response", e))?;

        if api.data.is_empty() {
            return Err(ProviderError::EmptyResponse("no embeddings in response".into()));
        }

        Ok(EmbeddingResponse {
            embeddings: api.into_ordered(),
            model: request.model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        Ok(response.status().is_success())
    }
}

// --- OpenAI API wire types ---

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingApiResponse {
    /// Vectors in input order; the API tags each with its input index.
    fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("openai", "https://api.example.com/v1/", "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(provider().base_url, "https://api.example.com/v1");
    }

    #[test]
    fn chat_body_carries_prompt_and_options() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".into(),
            prompt: "What type is Pikachu?".into(),
            options: CompletionOptions::new(0.2, 0.8, Some(256)).unwrap(),
        };
        let body = serde_json::to_value(OpenAiCompatProvider::chat_body(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "What type is Pikachu?");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], false);
        assert!((body["top_p"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn chat_body_omits_unset_max_tokens() {
        let request = CompletionRequest {
            model: "m".into(),
            prompt: "p".into(),
            options: CompletionOptions::default(),
        };
        let body = serde_json::to_value(OpenAiCompatProvider::chat_body(&request)).unwrap();
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parses_chat_response() {
        let data = r#"{"id":"x","model":"gpt-4o-mini","choices":[{"index":0,"message":{"role":"assistant","content":"Electric"},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":1,"total_tokens":11}}"#;
        let parsed: ChatResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Electric"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 11);
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let data = r#"{"object":"list","data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.1]}],"model":"text-embedding-3-small"}"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.into_ordered(), vec![vec![0.1], vec![0.5]]);
    }

    #[tokio::test]
    async fn invalid_options_fail_before_any_request() {
        let request = CompletionRequest {
            model: "m".into(),
            prompt: "p".into(),
            options: CompletionOptions {
                temperature: 9.0,
                ..Default::default()
            },
        };
        let err = provider().complete(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidOptions(_)));
    }
}
