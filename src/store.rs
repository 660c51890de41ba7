use std::path::Path;

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{embedding::EmbeddingMatrix, error::Result, loader::DocumentChunk};

/// Chunk key -> JSON-encoded [`DocumentChunk`].
const CHUNKS: TableDefinition<u64, &str> = TableDefinition::new("chunks");
/// Chunk key -> embedding matrix (see [`encode_matrix`]).
const EMBEDDINGS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("embeddings");
/// Relative file name -> JSON-encoded [`FileRecord`].
const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

const EMBEDDING_MODEL_KEY: &str = "embedding_model";

/// Header size: 4 bytes token count + 4 bytes dimension.
const HEADER_SIZE: usize = 8;

/// What the store remembers about an indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub mtime: u64,
    pub chunk_keys: Vec<u64>,
}

/// One stored chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub key: u64,
    pub chunk: DocumentChunk,
    pub embedding: EmbeddingMatrix,
}

/// Persistent vector store for a single dataset.
///
/// Chunks, their embeddings and per-file bookkeeping live in one redb file,
/// so a file's chunks are added or removed in a single transaction.
///
/// Embedding binary format per entry:
/// - 4 bytes: token count T (u32 LE)
/// - 4 bytes: embedding dimension D (u32 LE)
/// - T * D * 4 bytes: f32 LE values in row-major order
pub struct VectorStore {
    db: Database,
}

impl VectorStore {
    /// Open or create a store at the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use docchat::VectorStore;
    ///
    /// let store = VectorStore::open(&tmp.path().join("index.redb")).unwrap();
    /// assert_eq!(store.chunk_count().unwrap(), 0);
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        let txn = db.begin_write()?;
        txn.open_table(CHUNKS)?;
        txn.open_table(EMBEDDINGS)?;
        txn.open_table(FILES)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Drop every chunk, embedding, file record and setting.
    pub fn clear(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(CHUNKS)?;
        txn.delete_table(EMBEDDINGS)?;
        txn.delete_table(FILES)?;
        txn.delete_table(SETTINGS)?;
        txn.open_table(CHUNKS)?;
        txn.open_table(EMBEDDINGS)?;
        txn.open_table(FILES)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;
        Ok(())
    }

    /// Identifier of the model the stored embeddings were produced with.
    pub fn embedding_model(&self) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(EMBEDDING_MODEL_KEY)?.map(|v| v.value().to_string()))
    }

    pub fn set_embedding_model(&self, model_id: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(EMBEDDING_MODEL_KEY, model_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Store every chunk of a file, replacing whatever was stored for it
    /// before.
    pub fn add_file(
        &self,
        name: &str,
        mtime: u64,
        chunks: &[IndexedChunk],
    ) -> Result<()> {
        let record = FileRecord {
            mtime,
            chunk_keys: chunks.iter().map(|c| c.key).collect(),
        };
        let record_bytes = serde_json::to_vec(&record)?;

        let txn = self.db.begin_write()?;
        {
            let mut files = txn.open_table(FILES)?;
            let mut chunk_table = txn.open_table(CHUNKS)?;
            let mut embedding_table = txn.open_table(EMBEDDINGS)?;

            let previous = files.get(name)?.and_then(|v| {
                serde_json::from_slice::<FileRecord>(v.value()).ok()
            });
            if let Some(previous) = previous {
                for key in previous.chunk_keys {
                    chunk_table.remove(key)?;
                    embedding_table.remove(key)?;
                }
            }

            for entry in chunks {
                let json = serde_json::to_string(&entry.chunk)?;
                chunk_table.insert(entry.key, json.as_str())?;

                let matrix = &entry.embedding;
                let byte_len =
                    HEADER_SIZE + std::mem::size_of_val(matrix.data.as_slice());
                let mut guard =
                    embedding_table.insert_reserve(entry.key, byte_len)?;
                encode_matrix(matrix, guard.as_mut());
            }

            files.insert(name, record_bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove a file and all of its chunks. Returns whether it was stored.
    pub fn remove_file(&self, name: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut files = txn.open_table(FILES)?;
            let mut chunk_table = txn.open_table(CHUNKS)?;
            let mut embedding_table = txn.open_table(EMBEDDINGS)?;

            let record = files
                .remove(name)?
                .map(|v| serde_json::from_slice::<FileRecord>(v.value()));
            match record {
                Some(record) => {
                    for key in record?.chunk_keys {
                        chunk_table.remove(key)?;
                        embedding_table.remove(key)?;
                    }
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(removed)
    }

    /// All indexed files, ordered by name.
    pub fn files(&self) -> Result<Vec<(String, FileRecord)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FILES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            let record = serde_json::from_slice(v.value())?;
            result.push((k.value().to_string(), record));
        }
        Ok(result)
    }

    pub fn chunk_count(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;
        Ok(table.len()?)
    }

    /// Every stored chunk with its embedding, in key order.
    ///
    /// Chunks whose embedding is missing or malformed are skipped.
    pub fn entries(&self) -> Result<Vec<IndexedChunk>> {
        let txn = self.db.begin_read()?;
        let chunk_table = txn.open_table(CHUNKS)?;
        let embedding_table = txn.open_table(EMBEDDINGS)?;

        let mut result = Vec::new();
        for entry in chunk_table.iter()? {
            let (k, v) = entry?;
            let key = k.value();

            let embedding = embedding_table
                .get(key)?
                .and_then(|guard| decode_matrix(guard.value()));
            let Some(embedding) = embedding else {
                warn!("chunk {key:016x} has no usable embedding, skipping");
                continue;
            };

            result.push(IndexedChunk {
                key,
                chunk: serde_json::from_str(v.value())?,
                embedding,
            });
        }
        Ok(result)
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore").finish_non_exhaustive()
    }
}

fn encode_matrix(matrix: &EmbeddingMatrix, dest: &mut [u8]) {
    dest[0..4].copy_from_slice(&matrix.num_tokens.to_le_bytes());
    dest[4..8].copy_from_slice(&matrix.dimension.to_le_bytes());
    dest[HEADER_SIZE..].copy_from_slice(bytemuck::cast_slice(&matrix.data));
}

fn decode_matrix(bytes: &[u8]) -> Option<EmbeddingMatrix> {
    let (header, body) = bytes.split_at_checked(HEADER_SIZE)?;
    let num_tokens = u32::from_le_bytes(header[0..4].try_into().ok()?);
    let dimension = u32::from_le_bytes(header[4..8].try_into().ok()?);

    if body.len() != (num_tokens as usize) * (dimension as usize) * 4 {
        return None;
    }

    // Values stored by redb are not guaranteed to be 4-byte aligned.
    let data = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Some(EmbeddingMatrix {
        num_tokens,
        dimension,
        data,
    })
}
