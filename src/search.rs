use candle_core::{Device, Tensor};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    embedding::{Embedder, EmbeddingMatrix},
    error::{Error, Result},
    loader::DocumentChunk,
    store::VectorStore,
};

/// Find the `k` chunks most relevant to `query`.
///
/// Results carry their relevance score in `[0, 1]` and are ordered by
/// descending score; chunks with equal scores keep their store order. An
/// empty store yields no results and a warning.
pub fn retrieve(
    store: &VectorStore,
    embedder: &mut dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Vec<DocumentChunk>> {
    let entries = store.entries()?;
    if entries.is_empty() {
        warn!("Unable to find matching results.");
        return Ok(Vec::new());
    }

    let configured = embedder.model_id();
    if let Some(indexed) = store.embedding_model()?
        && indexed != configured
    {
        return Err(Error::ModelMismatch {
            indexed,
            configured,
        });
    }

    let query_embedding = embedder.embed_query(query)?;
    let query_tensor = to_tensor(&query_embedding)?;

    // Score every chunk in parallel; collect preserves store order.
    let scores: Vec<f32> = entries
        .par_iter()
        .map(|entry| -> Result<f32> {
            let cosine = match (&query_tensor, to_tensor(&entry.embedding)?) {
                (Some(q), Some(d)) => {
                    maxsim(q, &d)? / query_embedding.num_tokens as f32
                }
                _ => 0.0,
            };
            Ok(relevance_score(cosine))
        })
        .collect::<Result<_>>()?;

    let mut ranked: Vec<(f32, DocumentChunk)> = scores
        .into_iter()
        .zip(entries.into_iter().map(|e| e.chunk))
        .collect();

    // Stable sort: ties keep store order.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(k);

    debug!(
        "retrieved {} chunks, best score {:?}",
        ranked.len(),
        ranked.first().map(|(score, _)| *score)
    );

    Ok(ranked
        .into_iter()
        .map(|(score, chunk)| chunk.with_score(score))
        .collect())
}

/// Map a cosine similarity to a relevance score in `[0, 1]`.
///
/// For unit vectors the Euclidean distance is `sqrt(2 - 2 cos)`; the score
/// is `1 - distance / sqrt(2)`.
pub fn relevance_score(cosine: f32) -> f32 {
    let cosine = cosine.clamp(-1.0, 1.0);
    (1.0 - (1.0 - cosine).sqrt()).clamp(0.0, 1.0)
}

/// Build a `[T, D]` tensor, or `None` for an empty matrix.
fn to_tensor(matrix: &EmbeddingMatrix) -> Result<Option<Tensor>> {
    if matrix.is_empty() {
        return Ok(None);
    }
    let shape = (matrix.num_tokens as usize, matrix.dimension as usize);
    Ok(Some(Tensor::from_slice(&matrix.data, shape, &Device::Cpu)?))
}

/// Compute the MaxSim score between a query embedding and a document
/// embedding.
///
/// query_embedding: [Q, D] where Q = query tokens, D = embedding dimension
/// doc_embedding: [T, D] where T = document tokens, D = embedding dimension
///
/// MaxSim = sum over query tokens of max(query_token . doc_token for all doc
/// tokens). With a single row on each side this is the cosine similarity.
pub fn maxsim(query_embedding: &Tensor, doc_embedding: &Tensor) -> Result<f32> {
    // Compute similarity matrix [Q, T] = query_emb @ doc_emb^T
    let sim_matrix = query_embedding.matmul(&doc_embedding.t()?)?;

    // Take max along dimension 1 (best document token per query token)
    let row_maxes = sim_matrix.max(1)?;

    Ok(row_maxes.sum_all()?.to_scalar::<f32>()?)
}
