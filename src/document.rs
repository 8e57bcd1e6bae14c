//! Documents, passages and chunks, plus the loaders and splitter that
//! produce them.

mod loader;
mod splitter;
mod types;

#[cfg(test)]
pub(crate) use loader::fixtures;
pub use loader::{
    DEFAULT_MAX_FILE_SIZE, DocumentLoader, FileLoader, LoadError, PDF_EXTRACT_THREAD, PdfLoader,
    TextLoader,
};
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, ChunkMetadata, Document, Passage, UNKNOWN_SOURCE};
