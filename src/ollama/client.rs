/// Ollama HTTP client implementation.
///
/// This module provides `OllamaClient` for making synchronous HTTP requests to the Ollama API,
/// along with error types, the model traits the pipeline depends on, and a builder for
/// configuration.
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{
    CHAT_MODEL_VAR, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL, DEFAULT_OLLAMA_HOST, EMBED_MODEL_VAR,
    OLLAMA_HOST_VAR, env_or,
};

/// Errors that can occur when interacting with the Ollama API.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Ollama API-specific errors
    #[error("Ollama API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl OllamaError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OllamaError::Timeout(error)
        } else {
            OllamaError::Network(error)
        }
    }
}

/// Computes fixed-dimensionality vectors for text.
///
/// Used at index time for every chunk and at query time for the question.
pub trait Embedder: Send + Sync {
    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError>;

    /// Embeds several texts, returning one vector per input in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Name recorded alongside stored vectors.
    fn model_name(&self) -> &str;
}

/// Generates text from a fully assembled prompt.
pub trait LanguageModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, OllamaError>;
}

/// Builder for constructing `OllamaClient` instances.
///
/// # Examples
///
/// ```
/// use pdfrag::ollama::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .build()
///     .expect("Failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    timeout: Option<Duration>,
}

impl OllamaClientBuilder {
    /// Creates a new `OllamaClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API.
    ///
    /// # Arguments
    ///
    /// * `url` - The base URL (e.g., "http://localhost:11434")
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the chat model used for answer generation.
    ///
    /// # Arguments
    ///
    /// * `model` - The model name (e.g., "llama3.2" or "qwen2.5:7b")
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the model used to compute embeddings.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `OllamaClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// Values not set on the builder are read from `OLLAMA_HOST`,
    /// `PDFRAG_CHAT_MODEL` and `PDFRAG_EMBED_MODEL`, falling back to
    /// `http://localhost:11434`, `llama3.2` and `nomic-embed-text`.
    ///
    /// # Errors
    ///
    /// Returns `OllamaError::InvalidUrl` if the base URL does not parse.
    pub fn build(self) -> Result<OllamaClient, OllamaError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| env_or(OLLAMA_HOST_VAR, DEFAULT_OLLAMA_HOST));
        let model = self
            .model
            .unwrap_or_else(|| env_or(CHAT_MODEL_VAR, DEFAULT_CHAT_MODEL));
        let embedding_model = self
            .embedding_model
            .unwrap_or_else(|| env_or(EMBED_MODEL_VAR, DEFAULT_EMBED_MODEL));

        reqwest::Url::parse(&base_url)
            .map_err(|e| OllamaError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(OllamaError::Network)?;

        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            embedding_model,
        })
    }
}

/// Synchronous HTTP client for the Ollama API.
///
/// Every call makes exactly one HTTP request; failures are returned to the
/// caller unchanged.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
    #[serde(default)]
    size: u64,
}

impl OllamaClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the chat model configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the embedding model configured for this client.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Lists models available on the server, largest first.
    pub fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(OllamaError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(OllamaError::Http {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().map_err(OllamaError::from_reqwest)?;
        let tags: TagsResponse = serde_json::from_str(&body).map_err(OllamaError::Serialization)?;

        let mut models: Vec<(String, u64)> =
            tags.models.into_iter().map(|m| (m.name, m.size)).collect();
        models.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(models.into_iter().map(|(name, _)| name).collect())
    }

    /// Posts a JSON body and returns the raw response text.
    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String, OllamaError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(OllamaError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            if let Some(error) = api_error_message(&message) {
                return Err(OllamaError::Api { message: error });
            }
            return Err(OllamaError::Http {
                status: status.as_u16(),
            });
        }

        response.text().map_err(OllamaError::from_reqwest)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.embedding_model, count = texts.len(), "requesting embeddings");
        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let raw = self.post_json("/api/embed", &body)?;
        let parsed = parse_embed_response(&raw)?;

        if parsed.len() != texts.len() {
            return Err(OllamaError::Api {
                message: format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    parsed.len()
                ),
            });
        }

        Ok(parsed)
    }
}

impl Embedder for OllamaClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
        let mut vectors = self.embed_texts(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| OllamaError::Api {
            message: "Missing embedding in API response".to_string(),
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        self.embed_texts(texts)
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

impl LanguageModel for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, OllamaError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0 },
        });

        let raw = self.post_json("/api/generate", &body)?;
        parse_generate_response(&raw)
    }
}

/// Extracts the generated text. A missing or empty `response` is a valid,
/// empty answer.
fn parse_generate_response(raw: &str) -> Result<String, OllamaError> {
    let parsed: GenerateResponse = serde_json::from_str(raw).map_err(OllamaError::Serialization)?;
    Ok(parsed.response)
}

fn parse_embed_response(raw: &str) -> Result<Vec<Vec<f32>>, OllamaError> {
    let parsed: EmbedResponse = serde_json::from_str(raw).map_err(OllamaError::Serialization)?;
    Ok(parsed.embeddings)
}

/// Pulls the `error` field out of an Ollama error body, if present.
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::error::Error;

    fn clear_env() {
        unsafe {
            std::env::remove_var(OLLAMA_HOST_VAR);
            std::env::remove_var(CHAT_MODEL_VAR);
            std::env::remove_var(EMBED_MODEL_VAR);
        }
    }

    #[test]
    fn network_error_variant_creation_and_display() {
        let client = reqwest::blocking::Client::new();
        let reqwest_error = client.get("not-a-valid-url").build().unwrap_err();
        let ollama_error = OllamaError::Network(reqwest_error);

        let error_msg = format!("{}", ollama_error);
        assert!(error_msg.contains("Network error"));
    }

    #[test]
    fn timeout_error_variant_display() {
        let client = reqwest::blocking::Client::new();
        let reqwest_error = client.get("http://").build().unwrap_err();
        let ollama_error = OllamaError::Timeout(reqwest_error);

        assert_eq!(format!("{}", ollama_error), "Request timed out");
    }

    #[test]
    fn http_error_variant_with_status_code() {
        let ollama_error = OllamaError::Http { status: 404 };

        let error_msg = format!("{}", ollama_error);
        assert!(error_msg.contains("HTTP error"));
        assert!(error_msg.contains("404"));
    }

    #[test]
    fn serialization_error_variant_wraps_serde_errors() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let ollama_error = OllamaError::Serialization(json_error);

        assert!(format!("{}", ollama_error).contains("Serialization error"));
        assert!(ollama_error.source().is_some());
    }

    #[test]
    #[serial]
    fn build_uses_defaults_when_nothing_configured() {
        clear_env();

        let client = OllamaClientBuilder::new().build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), DEFAULT_CHAT_MODEL);
        assert_eq!(client.embedding_model(), DEFAULT_EMBED_MODEL);
    }

    #[test]
    #[serial]
    fn build_reads_environment_variables() {
        clear_env();
        unsafe {
            std::env::set_var(OLLAMA_HOST_VAR, "http://custom-host:11434");
            std::env::set_var(CHAT_MODEL_VAR, "gemma3:4b");
            std::env::set_var(EMBED_MODEL_VAR, "mxbai-embed-large");
        }

        let client = OllamaClientBuilder::new().build().unwrap();
        assert_eq!(client.base_url(), "http://custom-host:11434");
        assert_eq!(client.model(), "gemma3:4b");
        assert_eq!(client.embedding_model(), "mxbai-embed-large");

        clear_env();
    }

    #[test]
    #[serial]
    fn builder_values_take_precedence_over_environment() {
        clear_env();
        unsafe {
            std::env::set_var(OLLAMA_HOST_VAR, "http://env-var-host:11434");
            std::env::set_var(CHAT_MODEL_VAR, "env-model");
        }

        let client = OllamaClientBuilder::new()
            .base_url("http://builder-host:11434/")
            .model("builder-model")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://builder-host:11434");
        assert_eq!(client.model(), "builder-model");

        clear_env();
    }

    #[test]
    fn build_returns_error_if_invalid_url_provided() {
        let result = OllamaClientBuilder::new()
            .base_url("not-a-valid-url")
            .build();
        assert!(matches!(result, Err(OllamaError::InvalidUrl(_))));
    }

    #[test]
    fn client_is_usable_through_both_traits() {
        let client = OllamaClientBuilder::new()
            .base_url("http://localhost:11434")
            .embedding_model("nomic-embed-text")
            .build()
            .unwrap();

        let embedder: &dyn Embedder = &client;
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        let _llm: &dyn LanguageModel = &client;
    }

    #[test]
    fn generate_response_is_parsed() {
        let text = parse_generate_response(r#"{"model":"m","response":"Paris.","done":true}"#)
            .unwrap();
        assert_eq!(text, "Paris.");
    }

    #[test]
    fn missing_generate_response_is_an_empty_answer() {
        let text = parse_generate_response(r#"{"model":"m","done":true}"#).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn malformed_generate_response_is_a_serialization_error() {
        let result = parse_generate_response("<html>bad gateway</html>");
        assert!(matches!(result, Err(OllamaError::Serialization(_))));
    }

    #[test]
    fn embed_response_is_parsed() {
        let vectors =
            parse_embed_response(r#"{"model":"e","embeddings":[[0.1,0.2],[0.3,0.4]]}"#).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.3, 0.4]);
    }

    #[test]
    fn api_error_message_extracts_error_field() {
        assert_eq!(
            api_error_message(r#"{"error":"model 'x' not found"}"#),
            Some("model 'x' not found".to_string())
        );
        assert_eq!(api_error_message("plain text"), None);
    }

    #[test]
    fn default_embed_batch_calls_embed_per_text() {
        struct CountingEmbedder;

        impl Embedder for CountingEmbedder {
            fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
                Ok(vec![text.len() as f32])
            }

            fn model_name(&self) -> &str {
                "counting"
            }
        }

        let vectors = CountingEmbedder
            .embed_batch(&["a".to_string(), "abc".to_string()])
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![3.0]]);
    }

    #[test]
    fn unreachable_server_fails_without_retrying() {
        let client = OllamaClientBuilder::new()
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let started = std::time::Instant::now();
        let result = client.generate("hello");
        assert!(matches!(
            result,
            Err(OllamaError::Network(_)) | Err(OllamaError::Timeout(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
