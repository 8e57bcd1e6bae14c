//! Process-wide configuration.
//!
//! Settings are resolved from explicit values first, then environment
//! variables (optionally loaded from a `.env` file), then built-in defaults.

use std::path::PathBuf;

use anyhow::Result;

use crate::error::Error;

/// Environment variable naming the Ollama server URL.
pub const OLLAMA_HOST_VAR: &str = "OLLAMA_HOST";
/// Environment variable naming the chat model used for answers.
pub const CHAT_MODEL_VAR: &str = "PDFRAG_CHAT_MODEL";
/// Environment variable naming the embedding model.
pub const EMBED_MODEL_VAR: &str = "PDFRAG_EMBED_MODEL";
/// Environment variable overriding the vector store location.
pub const STORE_VAR: &str = "PDFRAG_STORE";
/// Environment variable setting how many chunks are retrieved per question.
pub const TOP_K_VAR: &str = "PDFRAG_TOP_K";

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Target chunk length in characters.
pub const CHUNK_SIZE: usize = 2000;
/// Characters carried over from the end of one chunk into the next.
pub const CHUNK_OVERLAP: usize = 200;
/// Number of chunks retrieved per question unless overridden.
pub const DEFAULT_TOP_K: usize = 4;

/// Resolved runtime settings shared by the CLI and the TUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub ollama_host: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub top_k: usize,
}

impl Config {
    /// Builds a configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if no store location is configured and the platform
    /// data directory cannot be determined, or if `PDFRAG_TOP_K` is not a
    /// positive integer.
    pub fn from_env() -> Result<Self> {
        let store_path = match std::env::var(STORE_VAR) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => crate::utils::default_store_path()?,
        };

        Ok(Self {
            store_path,
            ollama_host: env_or(OLLAMA_HOST_VAR, DEFAULT_OLLAMA_HOST),
            chat_model: env_or(CHAT_MODEL_VAR, DEFAULT_CHAT_MODEL),
            embedding_model: env_or(EMBED_MODEL_VAR, DEFAULT_EMBED_MODEL),
            top_k: top_k_from_env()?,
        })
    }
}

fn top_k_from_env() -> Result<usize> {
    let raw = env_or(TOP_K_VAR, "");
    if raw.is_empty() {
        return Ok(DEFAULT_TOP_K);
    }
    match raw.trim().parse::<usize>() {
        Ok(k) if k > 0 => Ok(k),
        _ => Err(Error::InvalidInput(format!(
            "{TOP_K_VAR} must be a positive integer, got {raw:?}"
        ))
        .into()),
    }
}

/// Reads an environment variable, falling back to `default` when it is unset
/// or blank.
pub fn env_or(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            std::env::remove_var(OLLAMA_HOST_VAR);
            std::env::remove_var(CHAT_MODEL_VAR);
            std::env::remove_var(EMBED_MODEL_VAR);
            std::env::remove_var(STORE_VAR);
            std::env::remove_var(TOP_K_VAR);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_environment_is_empty() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.ollama_host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.embedding_model, DEFAULT_EMBED_MODEL);
        assert_eq!(config.top_k, 4);
        assert!(config.store_path.ends_with("vectorstore.db"));
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        clear_env();
        unsafe {
            std::env::set_var(CHAT_MODEL_VAR, "qwen2.5:7b");
            std::env::set_var(STORE_VAR, "/tmp/pdfrag-test/store.db");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.chat_model, "qwen2.5:7b");
        assert_eq!(config.store_path, PathBuf::from("/tmp/pdfrag-test/store.db"));

        clear_env();
    }

    #[test]
    #[serial]
    fn top_k_is_read_from_environment() {
        clear_env();
        unsafe {
            std::env::set_var(TOP_K_VAR, " 8 ");
        }

        assert_eq!(Config::from_env().unwrap().top_k, 8);

        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_top_k_is_rejected() {
        clear_env();
        for bad in ["0", "-2", "four"] {
            unsafe {
                std::env::set_var(TOP_K_VAR, bad);
            }
            let err = Config::from_env().unwrap_err();
            assert!(
                err.downcast_ref::<Error>().is_some_and(Error::is_user_error),
                "{bad}: {err:#}"
            );
        }

        clear_env();
    }

    #[test]
    #[serial]
    fn blank_variable_falls_back_to_default() {
        clear_env();
        unsafe {
            std::env::set_var(EMBED_MODEL_VAR, "   ");
        }

        assert_eq!(env_or(EMBED_MODEL_VAR, DEFAULT_EMBED_MODEL), DEFAULT_EMBED_MODEL);

        clear_env();
    }

    #[test]
    fn chunking_constants_match_pipeline_contract() {
        assert_eq!(CHUNK_SIZE, 2000);
        assert_eq!(CHUNK_OVERLAP, 200);
        assert!(CHUNK_OVERLAP < CHUNK_SIZE);
    }
}
