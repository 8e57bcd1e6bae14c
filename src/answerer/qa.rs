//! Question answering with a single "stuffed" prompt.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AnswererError, Error};
use crate::ollama::{Embedder, LanguageModel};
use crate::store::{CollectionRef, ScoredChunk, StoreError, VectorStore};

use super::types::AnswerRecord;

/// Prompt wrapping the retrieved context and the question.
pub const PROMPT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:";

/// Answers questions against collections written by the indexer.
pub struct Answerer {
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
}

impl Answerer {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, model: Arc<dyn LanguageModel>) -> Self {
        Self { embedder, model }
    }

    /// Answers `question` from the `k` chunks of `collection` closest to it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for a blank question or `k == 0`, before any
    ///   external call.
    /// - [`Error::CollectionNotFound`] when the store file or the collection
    ///   does not exist.
    /// - [`Error::Answerer`] when embedding, retrieval or generation fails.
    pub fn answer(
        &self,
        question: &str,
        collection: &CollectionRef,
        k: usize,
    ) -> Result<AnswerRecord, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question is empty".to_string()));
        }
        if k == 0 {
            return Err(Error::InvalidInput(
                "k must be a positive integer".to_string(),
            ));
        }

        let not_found = || Error::CollectionNotFound {
            collection: collection.collection_id.clone(),
            location: collection.store_location.clone(),
        };

        let store = VectorStore::open_read_only(&collection.store_location)
            .map_err(AnswererError::Store)?
            .ok_or_else(not_found)?;
        if store
            .find_collection(&collection.collection_id)
            .map_err(AnswererError::Store)?
            .is_none()
        {
            return Err(not_found());
        }

        let query_vector = self
            .embedder
            .embed(question)
            .map_err(AnswererError::Embedding)?;
        let retrieved = store
            .query(&collection.collection_id, &query_vector, k)
            .map_err(|e| match e {
                StoreError::CollectionNotFound(_) => not_found(),
                other => AnswererError::Store(other).into(),
            })?;
        debug!(
            collection = %collection.collection_id,
            k,
            retrieved = retrieved.len(),
            "retrieved chunks"
        );

        let prompt = build_prompt(question, &retrieved);
        let answer = self
            .model
            .generate(&prompt)
            .map_err(AnswererError::Generation)?;
        let sources = collect_sources(&retrieved);

        info!(
            collection = %collection.collection_id,
            sources = sources.len(),
            answer_chars = answer.len(),
            "answered question"
        );

        Ok(AnswerRecord::new(answer.trim().to_string(), sources))
    }
}

/// Fills [`PROMPT_TEMPLATE`] with the chunk texts, in retrieval order.
pub fn build_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|scored| scored.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    PROMPT_TEMPLATE
        .replace("{context}", &context)
        .replace("{question}", question)
}

/// Source filenames of `chunks`, in retrieval order, each kept once.
pub fn collect_sources(chunks: &[ScoredChunk]) -> Vec<String> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .map(|scored| scored.chunk.source())
        .filter(|source| seen.insert(*source))
        .map(str::to_string)
        .collect()
}
