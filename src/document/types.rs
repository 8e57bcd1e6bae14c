use std::path::{Path, PathBuf};

/// Source name used when a chunk carries no source metadata.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// An input file and the filename used to cite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    filename: String,
}

impl Document {
    /// Creates a document from a path, deriving its filename from the last
    /// path component.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, filename }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The citation key for everything derived from this document.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Metadata carried by passages and chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub source: String,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Builds metadata from an optional stored source, substituting
    /// [`UNKNOWN_SOURCE`] when none was recorded.
    pub fn from_stored(source: Option<String>) -> Self {
        source
            .filter(|s| !s.is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self::new(UNKNOWN_SOURCE)
    }
}

/// Text extracted from a document by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata::default(),
        }
    }
}

/// A bounded slice of passage text; the unit that is embedded and retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}
