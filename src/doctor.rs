//! Health check for the `doctor` command.
//!
//! Reports on the vector store file and on the Ollama server the pipeline
//! depends on, including whether the configured models are installed.

use anyhow::Result;

use crate::config::Config;
use crate::ollama::OllamaClientBuilder;
use crate::store::{MIGRATIONS, VectorStore};

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Health status for a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Component is healthy
    Ok,
    /// Component has a warning but is functional
    Warning(String),
    /// Component is not functional
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }

    fn is_error(&self) -> bool {
        matches!(self, HealthStatus::Error(_))
    }
}

/// Vector store health information.
#[derive(Debug)]
pub struct StoreHealth {
    pub status: HealthStatus,
    pub file_path: String,
    pub schema_version: Option<u32>,
    pub collections: usize,
    pub chunks: usize,
    /// Newest collection, if any
    pub latest: Option<String>,
}

/// Ollama connectivity information.
#[derive(Debug)]
pub struct OllamaHealth {
    pub status: HealthStatus,
    pub base_url: String,
    pub models: Vec<String>,
    pub chat_model: ModelCheck,
    pub embedding_model: ModelCheck,
}

/// Whether one configured model is installed on the server.
#[derive(Debug)]
pub struct ModelCheck {
    pub name: String,
    pub installed: bool,
}

/// Performs all health checks and prints the report.
///
/// Returns `true` when no check failed outright.
pub fn run_health_checks(config: &Config) -> Result<bool> {
    let store = check_store_health(config);
    let ollama = check_ollama_health(config);

    print_health_report(&store, &ollama);

    Ok(!store.status.is_error() && !ollama.status.is_error())
}

/// Inspects the store file without creating it.
pub fn check_store_health(config: &Config) -> StoreHealth {
    let file_path = config.store_path.display().to_string();
    let mut health = StoreHealth {
        status: HealthStatus::Ok,
        file_path,
        schema_version: None,
        collections: 0,
        chunks: 0,
        latest: None,
    };

    let store = match VectorStore::open_read_only(&config.store_path) {
        Ok(Some(store)) => store,
        Ok(None) => {
            health.status =
                HealthStatus::Warning("Not created yet; it appears after the first index".into());
            return health;
        }
        Err(e) => {
            health.status = HealthStatus::Error(format!("Failed to open: {e}"));
            return health;
        }
    };

    health.schema_version = store
        .connection()
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<u32>>(0)
        })
        .ok()
        .flatten();

    match (store.list_collections(), store.total_chunks()) {
        (Ok(collections), Ok(chunks)) => {
            health.collections = collections.len();
            health.chunks = chunks;
            health.latest = collections.first().map(|c| c.name.clone());
        }
        (Err(e), _) | (_, Err(e)) => {
            health.status = HealthStatus::Error(format!("Failed to read collections: {e}"));
        }
    }

    let expected = MIGRATIONS.last().map(|m| m.version);
    if health.status.is_ok() && health.schema_version != expected {
        health.status = HealthStatus::Warning(format!(
            "Schema version {:?}, expected {:?}; it is upgraded on the next index",
            health.schema_version, expected
        ));
    }

    health
}

/// Contacts the Ollama server and checks the configured models.
pub fn check_ollama_health(config: &Config) -> OllamaHealth {
    let mut health = OllamaHealth {
        status: HealthStatus::Ok,
        base_url: config.ollama_host.clone(),
        models: Vec::new(),
        chat_model: ModelCheck {
            name: config.chat_model.clone(),
            installed: false,
        },
        embedding_model: ModelCheck {
            name: config.embedding_model.clone(),
            installed: false,
        },
    };

    let client = match OllamaClientBuilder::new()
        .base_url(config.ollama_host.clone())
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            health.status = HealthStatus::Error(format!("Failed to build client: {e}"));
            return health;
        }
    };
    health.base_url = client.base_url().to_string();

    match client.list_models() {
        Ok(models) => {
            health.chat_model.installed = model_installed(&models, &config.chat_model);
            health.embedding_model.installed = model_installed(&models, &config.embedding_model);
            health.models = models;

            let missing: Vec<&str> = [&health.chat_model, &health.embedding_model]
                .into_iter()
                .filter(|m| !m.installed)
                .map(|m| m.name.as_str())
                .collect();
            if !missing.is_empty() {
                health.status = HealthStatus::Warning(format!(
                    "Missing model(s): {} (run `ollama pull <model>`)",
                    missing.join(", ")
                ));
            }
        }
        Err(e) => {
            health.status = HealthStatus::Error(format!("Connection failed: {e}"));
        }
    }

    health
}

/// Matches a configured model against installed names. An untagged name
/// matches its `:latest` tag.
pub fn model_installed(installed: &[String], wanted: &str) -> bool {
    installed.iter().any(|name| {
        name == wanted
            || (!wanted.contains(':')
                && name
                    .strip_prefix(wanted)
                    .is_some_and(|rest| rest == ":latest"))
    })
}

fn status_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => GREEN,
        HealthStatus::Warning(_) => YELLOW,
        HealthStatus::Error(_) => RED,
    }
}

fn status_symbol(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "✓",
        HealthStatus::Warning(_) => "!",
        HealthStatus::Error(_) => "✗",
    }
}

fn status_text(status: &HealthStatus, ok: &str) -> String {
    match status {
        HealthStatus::Ok => ok.to_string(),
        HealthStatus::Warning(w) => w.clone(),
        HealthStatus::Error(e) => e.clone(),
    }
}

fn print_health_report(store: &StoreHealth, ollama: &OllamaHealth) {
    println!("{BOLD}pdfrag doctor{RESET}");
    println!();

    println!("{BOLD}Vector store{RESET}");
    println!(
        "  {}{}{} Status: {}",
        status_color(&store.status),
        status_symbol(&store.status),
        RESET,
        status_text(&store.status, "OK")
    );
    println!("    {DIM}Path: {}{RESET}", store.file_path);
    if let Some(version) = store.schema_version {
        println!("    {DIM}Schema: v{version}{RESET}");
    }
    println!("  Collections: {:>6}", store.collections);
    println!("  Chunks:      {:>6}", store.chunks);
    if let Some(latest) = &store.latest {
        println!("    {DIM}Newest: {latest}{RESET}");
    }
    println!();

    println!("{BOLD}Ollama{RESET}");
    println!(
        "  {}{}{} Status: {}",
        status_color(&ollama.status),
        status_symbol(&ollama.status),
        RESET,
        status_text(&ollama.status, "Connected")
    );
    if !ollama.base_url.is_empty() {
        println!("    {DIM}URL: {}{RESET}", ollama.base_url);
    }
    for (role, check) in [
        ("Chat model", &ollama.chat_model),
        ("Embedding model", &ollama.embedding_model),
    ] {
        let (color, symbol) = if check.installed {
            (GREEN, "✓")
        } else {
            (YELLOW, "!")
        };
        println!("  {color}{symbol}{RESET} {role}: {}", check.name);
    }
    if !ollama.models.is_empty() {
        let models_display = if ollama.models.len() > 3 {
            format!(
                "{}, ... ({} more)",
                ollama.models[..3].join(", "),
                ollama.models.len() - 3
            )
        } else {
            ollama.models.join(", ")
        };
        println!("    {DIM}Installed: {models_display}{RESET}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::*;
    use crate::document::{Chunk, ChunkMetadata};
    use crate::store::EmbeddedChunk;

    fn config_with_store(store_path: PathBuf) -> Config {
        Config {
            store_path,
            ollama_host: "http://127.0.0.1:9".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            top_k: 4,
        }
    }

    #[test]
    fn untagged_model_matches_latest() {
        let installed = vec!["llama3.2:latest".to_string(), "nomic-embed-text:v1.5".to_string()];
        assert!(model_installed(&installed, "llama3.2"));
        assert!(model_installed(&installed, "llama3.2:latest"));
        assert!(!model_installed(&installed, "nomic-embed-text"));
        assert!(model_installed(&installed, "nomic-embed-text:v1.5"));
        assert!(!model_installed(&installed, "llama3"));
    }

    #[test]
    fn missing_store_is_a_warning_and_not_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectorstore.db");

        let health = check_store_health(&config_with_store(path.clone()));
        assert!(matches!(health.status, HealthStatus::Warning(_)));
        assert!(!path.exists());
    }

    #[test]
    fn populated_store_reports_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectorstore.db");
        let name = {
            let mut store = VectorStore::open(&path).unwrap();
            let chunk = EmbeddedChunk {
                chunk: Chunk {
                    text: "Paris is the capital of France.".to_string(),
                    metadata: ChunkMetadata::new("A.pdf"),
                },
                embedding: vec![1.0, 0.0],
            };
            store.create_collection("m", 1, &[chunk]).unwrap().name
        };

        let health = check_store_health(&config_with_store(path));
        assert_eq!(health.status, HealthStatus::Ok);
        assert_eq!(health.collections, 1);
        assert_eq!(health.chunks, 1);
        assert_eq!(health.latest, Some(name));
        assert_eq!(health.schema_version, Some(1));
    }

    #[test]
    fn unreachable_server_is_an_error() {
        let dir = tempdir().unwrap();
        let health = check_ollama_health(&config_with_store(dir.path().join("s.db")));
        assert!(health.status.is_error());
        assert!(!health.chat_model.installed);
    }
}
