//! Native Ollama API.
//!
//! - `POST /api/generate` with `stream: false` for completions
//! - `POST /api/embed` for batched embeddings
//! - `GET /api/tags` as a liveness probe

use crate::http::{build_client, check_status, parse_error, transport_error};
use async_trait::async_trait;
use pokerag_core::error::ProviderError;
use pokerag_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    pub fn local(timeout: Duration) -> Result<Self, ProviderError> {
        Self::new(DEFAULT_OLLAMA_URL, timeout)
    }

    fn generate_body(request: &CompletionRequest) -> GenerateBody<'_> {
        GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.options.temperature,
                top_p: request.options.top_p,
                num_predict: request.options.max_tokens,
            },
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        request.options.validate()?;
        debug!(model = %request.model, prompt_chars = request.prompt.len(), "Sending Ollama generate request");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&Self::generate_body(&request))
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;

        let api: GenerateResponse = response
            .json()
            .await
            .map_err(|e| parse_error("generate response", e))?;

        let usage = match (api.prompt_eval_count, api.eval_count) {
            (Some(p), Some(c)) => Some(Usage {
                prompt_tokens: p,
                completion_tokens: c,
                total_tokens: p + c,
            }),
            _ => None,
        };

        Ok(CompletionResponse {
            text: api.response,
            model: api.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        debug!(model = %request.model, count = request.inputs.len(), "Sending Ollama embed request");

        let body = EmbedBody {
            model: &request.model,
            input: &request.inputs,
        };
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;

        let api: EmbedResponse = response
            .json()
            .await
            .map_err(|e| parse_error("embed response", e))?;

        if api.embeddings.is_empty() {
            return Err(ProviderError::EmptyResponse("no embeddings returned".into()));
        }

        Ok(EmbeddingResponse {
            embeddings: api.embeddings,
            model: request.model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        Ok(response.status().is_success())
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: Option<String>,
    #[serde(default)]
    response: String,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_body_shape() {
        let request = CompletionRequest {
            model: "llama3.2".into(),
            prompt: "Which Pokemon is #25?".into(),
            options: CompletionOptions::default(),
        };
        let body = serde_json::to_value(OllamaProvider::generate_body(&request)).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["prompt"], "Which Pokemon is #25?");
        assert_eq!(body["stream"], false);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!(body["options"].get("num_predict").is_none());
    }

    #[test]
    fn max_tokens_maps_to_num_predict() {
        let request = CompletionRequest {
            model: "llama3.2".into(),
            prompt: "p".into(),
            options: CompletionOptions::new(0.3, 0.9, Some(128)).unwrap(),
        };
        let body = serde_json::to_value(OllamaProvider::generate_body(&request)).unwrap();
        assert_eq!(body["options"]["num_predict"], 128);
    }

    #[test]
    fn parses_generate_response() {
        let data = r#"{"model":"llama3.2","created_at":"2024-01-01T00:00:00Z","response":"Pikachu","done":true,"prompt_eval_count":12,"eval_count":3}"#;
        let parsed: GenerateResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.response, "Pikachu");
        assert_eq!(parsed.eval_count, Some(3));
    }

    #[test]
    fn parses_embed_response() {
        let data = r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
        let parsed: EmbedResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1], vec![0.3, 0.4]);
    }

    #[test]
    fn local_constructor() {
        let provider = OllamaProvider::local(Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(provider.name(), "ollama");
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on test machines.
        let provider = OllamaProvider::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = provider
            .embed(EmbeddingRequest {
                model: "nomic-embed-text".into(),
                inputs: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
