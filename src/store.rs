//! Persistent vector store.
//!
//! A single SQLite file holds any number of collections. Each collection is
//! written once, in one transaction, and is read-only afterwards; collections
//! never share rows, so readers of one collection are unaffected by writers
//! creating another.

mod migration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{Chunk, ChunkMetadata};

pub use migration::{MIGRATIONS, Migration, apply_pending_migrations};

/// Prefix of every generated collection name.
pub const COLLECTION_PREFIX: &str = "multi_pdf_";

const NAME_ATTEMPTS: usize = 16;
const IN_MEMORY_LOCATION: &str = ":memory:";

/// Errors raised by the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("collection {0} not found")]
    CollectionNotFound(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("stored embedding is corrupt ({0} bytes)")]
    CorruptEmbedding(usize),

    #[error("could not allocate a unique collection name")]
    NameExhausted,

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] time::error::ComponentRange),
}

/// Summary of one stored collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub created_at: OffsetDateTime,
    pub embedding_model: String,
    pub dimensions: usize,
    pub document_count: usize,
    pub chunk_count: usize,
}

/// A chunk paired with its embedding, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Address of one collection: its name and the store file holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub collection_id: String,
    pub store_location: PathBuf,
}

impl CollectionRef {
    pub fn new(collection_id: impl Into<String>, store_location: impl Into<PathBuf>) -> Self {
        Self {
            collection_id: collection_id.into(),
            store_location: store_location.into(),
        }
    }
}

/// Generates a fresh collection name with a random suffix.
pub fn generate_collection_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{COLLECTION_PREFIX}{}", &suffix[..8])
}

/// SQLite-backed store of named embedding collections.
pub struct VectorStore {
    conn: Connection,
    location: PathBuf,
    has_schema: bool,
}

impl VectorStore {
    /// Opens an in-memory store with the schema applied.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, PathBuf::from(IN_MEMORY_LOCATION))
    }

    /// Opens (creating if needed) the store file at `path` for writing.
    ///
    /// The parent directory is created when missing. Pending migrations are
    /// applied on open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Self::initialize(conn, path.to_path_buf())
    }

    /// Opens an existing store file for reading.
    ///
    /// Returns `Ok(None)` when no file exists at `path`. A file without the
    /// store schema opens as an empty store.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Option<Self>, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let has_schema: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='collections')",
            [],
            |row| row.get(0),
        )?;

        Ok(Some(Self {
            conn,
            location: path.to_path_buf(),
            has_schema,
        }))
    }

    fn initialize(mut conn: Connection, location: PathBuf) -> Result<Self, StoreError> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        apply_pending_migrations(&mut conn)?;
        Ok(Self {
            conn,
            location,
            has_schema: true,
        })
    }

    /// The location this store was opened from.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates a new collection holding `chunks` under a freshly generated
    /// name.
    ///
    /// All chunks are written in a single transaction; on error nothing is
    /// stored. Existing collections are never touched.
    pub fn create_collection(
        &mut self,
        embedding_model: &str,
        document_count: usize,
        chunks: &[EmbeddedChunk],
    ) -> Result<CollectionInfo, StoreError> {
        let dimensions = chunks.first().map_or(0, |c| c.embedding.len());
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            return Err(StoreError::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }

        let created_at = OffsetDateTime::now_utc();
        let tx = self.conn.transaction()?;

        let mut name = None;
        for _ in 0..NAME_ATTEMPTS {
            let candidate = generate_collection_name();
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM collections WHERE name = ?1)",
                [&candidate],
                |row| row.get(0),
            )?;
            if !taken {
                name = Some(candidate);
                break;
            }
        }
        let name = name.ok_or(StoreError::NameExhausted)?;

        tx.execute(
            "INSERT INTO collections (name, created_at, embedding_model, dimensions, document_count, chunk_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                name,
                created_at.unix_timestamp(),
                embedding_model,
                dimensions as i64,
                document_count as i64,
                chunks.len() as i64
            ],
        )?;
        let collection_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (collection_id, position, content, source, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, embedded) in chunks.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    collection_id,
                    position as i64,
                    embedded.chunk.text,
                    embedded.chunk.metadata.source,
                    encode_embedding(&embedded.embedding)
                ])?;
            }
        }

        tx.commit()?;
        info!(collection = %name, chunks = chunks.len(), dimensions, "created collection");

        Ok(CollectionInfo {
            name,
            created_at: OffsetDateTime::from_unix_timestamp(created_at.unix_timestamp())?,
            embedding_model: embedding_model.to_string(),
            dimensions,
            document_count,
            chunk_count: chunks.len(),
        })
    }

    /// Looks up a collection by name.
    pub fn find_collection(&self, name: &str) -> Result<Option<CollectionInfo>, StoreError> {
        if !self.has_schema {
            return Ok(None);
        }

        let row = self
            .conn
            .query_row(
                "SELECT name, created_at, embedding_model, dimensions, document_count, chunk_count
                 FROM collections WHERE name = ?1",
                [name],
                read_collection_row,
            )
            .optional()?;

        row.map(CollectionRow::into_info).transpose()
    }

    /// Lists all collections, newest first.
    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        if !self.has_schema {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT name, created_at, embedding_model, dimensions, document_count, chunk_count
             FROM collections ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], read_collection_row)?;

        let mut collections = Vec::new();
        for row in rows {
            collections.push(row?.into_info()?);
        }
        Ok(collections)
    }

    /// Returns the `k` chunks of `collection` most similar to `vector`, best
    /// first.
    ///
    /// Similarity is cosine similarity; ties keep insertion order. Fewer than
    /// `k` chunks are returned when the collection is smaller.
    pub fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let info = self
            .find_collection(collection)?
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        if k == 0 || info.chunk_count == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != info.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: info.dimensions,
                actual: vector.len(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT c.content, c.source, c.embedding
             FROM chunks c JOIN collections col ON col.id = c.collection_id
             WHERE col.name = ?1
             ORDER BY c.position",
        )?;
        let rows = stmt.query_map([collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut scored = Vec::with_capacity(info.chunk_count);
        for row in rows {
            let (text, source, blob) = row?;
            let embedding = decode_embedding(&blob)?;
            scored.push(ScoredChunk {
                score: cosine_similarity(vector, &embedding),
                chunk: Chunk {
                    text,
                    metadata: ChunkMetadata::from_stored(source),
                },
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        debug!(collection, k, returned = scored.len(), "similarity query");
        Ok(scored)
    }

    /// Deletes a collection and its chunks. Returns `false` if it did not
    /// exist.
    pub fn delete_collection(&mut self, name: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM collections WHERE name = ?1", [name])?;
        if removed > 0 {
            info!(collection = name, "deleted collection");
        }
        Ok(removed > 0)
    }

    /// Deletes every collection except the `keep` most recent ones and
    /// returns the names removed.
    pub fn prune(&mut self, keep: usize) -> Result<Vec<String>, StoreError> {
        let stale: Vec<String> = self
            .list_collections()?
            .into_iter()
            .skip(keep)
            .map(|c| c.name)
            .collect();

        let tx = self.conn.transaction()?;
        for name in &stale {
            tx.execute("DELETE FROM collections WHERE name = ?1", [name])?;
        }
        tx.commit()?;

        if !stale.is_empty() {
            info!(removed = stale.len(), kept = keep, "pruned collections");
        }
        Ok(stale)
    }

    /// Total number of stored chunks across all collections.
    pub fn total_chunks(&self) -> Result<usize, StoreError> {
        if !self.has_schema {
            return Ok(0);
        }
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

struct CollectionRow {
    name: String,
    created_at: i64,
    embedding_model: String,
    dimensions: i64,
    document_count: i64,
    chunk_count: i64,
}

impl CollectionRow {
    fn into_info(self) -> Result<CollectionInfo, StoreError> {
        Ok(CollectionInfo {
            name: self.name,
            created_at: OffsetDateTime::from_unix_timestamp(self.created_at)?,
            embedding_model: self.embedding_model,
            dimensions: self.dimensions.max(0) as usize,
            document_count: self.document_count.max(0) as usize,
            chunk_count: self.chunk_count.max(0) as usize,
        })
    }
}

fn read_collection_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        name: row.get(0)?,
        created_at: row.get(1)?,
        embedding_model: row.get(2)?,
        dimensions: row.get(3)?,
        document_count: row.get(4)?,
        chunk_count: row.get(5)?,
    })
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>, StoreError> {
    if blob.len() % 4 != 0 {
        return Err(StoreError::CorruptEmbedding(blob.len()));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
