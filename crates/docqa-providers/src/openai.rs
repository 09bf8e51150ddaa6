//! OpenAI-compatible HTTP providers.
//!
//! Both talk to any endpoint speaking the OpenAI REST shape: `/embeddings` for
//! vectors and the legacy `/completions` for text. Requests are blocking so the
//! providers can be driven from rayon workers and the synchronous CLI loop.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::config::ProviderConfig;
use docqa_core::error::ProviderError;
use docqa_core::traits::{EmbeddingProvider, GenerationProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Shared HTTP plumbing for the two providers.
#[derive(Debug, Clone)]
struct ApiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ApiClient {
    fn new(config: &ProviderConfig, provider: &str) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey { provider: provider.to_string() })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { client, endpoint: config.endpoint.trim_end_matches('/').to_string(), api_key })
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, ProviderError> {
        let url = format!("{}/{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(ProviderError::Api { status: status.as_u16(), message });
        }
        Ok(response)
    }
}

pub struct OpenAiEmbedder {
    api: ApiClient,
    model: String,
    id: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api = ApiClient::new(config, "openai embeddings")?;
        let model = config.embedding_model.clone();
        Ok(Self { api, id: format!("openai:{model}"), model })
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed("empty embeddings response".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest { model: &self.model, input: texts };
        let response: EmbeddingResponse = self
            .api
            .post("embeddings", &request)?
            .json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        debug!(inputs = texts.len(), returned = response.data.len(), "embeddings response");
        order_embeddings(response.data, texts.len())
    }
}

fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    if data.len() != expected {
        return Err(ProviderError::Malformed(format!("expected {expected} embeddings, got {}", data.len())));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

pub struct OpenAiGenerator {
    api: ApiClient,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api = ApiClient::new(config, "openai completions")?;
        Ok(Self { api, model: config.generation_model.clone() })
    }
}

impl GenerationProvider for OpenAiGenerator {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ProviderError> {
        let request = CompletionRequest { model: &self.model, prompt, max_tokens, temperature };
        let response: CompletionResponse = self
            .api
            .post("completions", &request)?
            .json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ProviderError::Malformed("completion response has no choices".into()))
    }
}
