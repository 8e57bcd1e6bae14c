//! Turns a set of documents into a new vector store collection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{ChunkMetadata, Document, DocumentLoader, FileLoader, Passage, TextSplitter};
use crate::error::{Error, IndexerError};
use crate::ollama::{Embedder, OllamaError};
use crate::store::{CollectionRef, EmbeddedChunk, VectorStore};

/// Loads, splits, embeds and stores documents.
///
/// Every call to [`Indexer::build_index`] writes a brand new collection;
/// collections written earlier are left as they are.
pub struct Indexer {
    loader: Arc<dyn DocumentLoader>,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    store_location: PathBuf,
}

impl Indexer {
    /// Creates an indexer writing to the store file at `store_location`,
    /// using the default file loader and splitter.
    pub fn new(embedder: Arc<dyn Embedder>, store_location: impl Into<PathBuf>) -> Self {
        Self {
            loader: Arc::new(FileLoader::default()),
            splitter: TextSplitter::default(),
            embedder,
            store_location: store_location.into(),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn store_location(&self) -> &Path {
        &self.store_location
    }

    /// Indexes `paths` into a freshly named collection and returns its
    /// address.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] when `paths` is empty; nothing is opened or
    ///   written in that case.
    /// - [`IndexerError`] when a document fails to load, yields no text, or
    ///   embedding or storage fails. No partial collection is left behind.
    pub fn build_index<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CollectionRef, Error> {
        if paths.is_empty() {
            return Err(Error::InvalidInput("no documents supplied".to_string()));
        }

        let documents: Vec<Document> = paths
            .iter()
            .map(|p| Document::new(p.as_ref()))
            .collect();

        let mut passages = Vec::new();
        for document in &documents {
            passages.extend(self.load_document(document)?);
        }

        let chunks = self.splitter.split_passages(&passages);
        if chunks.is_empty() {
            return Err(IndexerError::NoExtractableText.into());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .map_err(IndexerError::Embedding)?;
        if embeddings.len() != chunks.len() {
            return Err(IndexerError::Embedding(OllamaError::Api {
                message: format!(
                    "expected {} embeddings, received {}",
                    chunks.len(),
                    embeddings.len()
                ),
            })
            .into());
        }

        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        let mut store = VectorStore::open(&self.store_location).map_err(IndexerError::Store)?;
        let collection = store
            .create_collection(self.embedder.model_name(), documents.len(), &embedded)
            .map_err(IndexerError::Store)?;

        info!(
            collection = %collection.name,
            documents = documents.len(),
            chunks = collection.chunk_count,
            store = %self.store_location.display(),
            "indexed documents"
        );

        Ok(CollectionRef::new(collection.name, self.store_location.clone()))
    }

    /// Loads one document and tags every passage with its filename.
    fn load_document(&self, document: &Document) -> Result<Vec<Passage>, IndexerError> {
        let mut passages =
            self.loader
                .load(document.path())
                .map_err(|source| IndexerError::Load {
                    path: document.path().to_path_buf(),
                    source,
                })?;

        for passage in &mut passages {
            passage.metadata = ChunkMetadata::new(document.filename());
        }

        debug!(
            file = document.filename(),
            passages = passages.len(),
            "loaded document"
        );
        Ok(passages)
    }
}
