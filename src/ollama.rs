/// Ollama HTTP client module.
///
/// This module provides a blocking HTTP client for the Ollama API and the
/// `Embedder` / `LanguageModel` traits the indexing and answering pipeline is
/// written against.
mod client;

pub use client::{Embedder, LanguageModel, OllamaClient, OllamaClientBuilder, OllamaError};
