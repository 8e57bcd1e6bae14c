//! Multi-document question answering with cited sources.
//!
//! Documents are indexed into a new collection of a SQLite vector store by
//! [`Indexer`]; questions are answered from one collection by [`Answerer`],
//! which returns the generated answer and the filenames of the chunks it was
//! given.

pub mod answerer;
pub mod config;
pub mod doctor;
pub mod document;
pub mod error;
pub mod indexer;
pub mod ollama;
pub mod session;
pub mod store;
pub mod tui;
pub mod utils;

pub use answerer::{AnswerRecord, Answerer};
pub use config::Config;
pub use document::{Chunk, ChunkMetadata, Document, Passage, UNKNOWN_SOURCE};
pub use error::{AnswererError, Error, IndexerError};
pub use indexer::Indexer;
pub use ollama::{Embedder, LanguageModel, OllamaClient, OllamaClientBuilder, OllamaError};
pub use session::Session;
pub use store::{CollectionRef, StoreError, VectorStore};
