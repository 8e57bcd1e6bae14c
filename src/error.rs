//! Error kinds surfaced by indexing and answering.

use std::path::PathBuf;

use thiserror::Error;

use crate::document::LoadError;
use crate::ollama::OllamaError;
use crate::store::StoreError;

/// Top-level error for the indexing and answering pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any external call was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("collection {collection} not found in {}", location.display())]
    CollectionNotFound {
        collection: String,
        location: PathBuf,
    },

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error(transparent)]
    Answerer(#[from] AnswererError),

    /// A question was asked before any documents were processed.
    #[error("no documents have been processed yet; process documents before asking")]
    NoActiveCollection,
}

impl Error {
    /// True for errors caused by what the user supplied rather than by a
    /// failing collaborator.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::CollectionNotFound { .. }
                | Error::NoActiveCollection
                | Error::Indexer(IndexerError::Load { .. })
                | Error::Indexer(IndexerError::NoExtractableText)
        )
    }
}

/// Failures while loading, splitting, embedding or writing documents.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("no extractable text found in the supplied documents")]
    NoExtractableText,

    #[error("embedding failed: {0}")]
    Embedding(#[source] OllamaError),

    #[error("vector store write failed: {0}")]
    Store(#[source] StoreError),
}

/// Failures while answering a question.
#[derive(Debug, Error)]
pub enum AnswererError {
    #[error("question embedding failed: {0}")]
    Embedding(#[source] OllamaError),

    #[error("vector store query failed: {0}")]
    Store(#[source] StoreError),

    #[error("language model call failed: {0}")]
    Generation(#[source] OllamaError),
}
