use crate::{
    config::{EmbeddingBackend, EmbeddingConfig},
    error::{Error, Result},
    model_manager::ModelManager,
    ollama::OllamaEmbedder,
};

/// Turns text into embeddings.
///
/// Late-interaction models produce one vector per token; sentence models
/// produce a single vector. Both are represented as an [`EmbeddingMatrix`]
/// so the store and the scorer do not care which kind is in use.
pub trait Embedder {
    /// Identifier recorded in the store, used to detect a model change
    /// between indexing and querying.
    fn model_id(&self) -> String;

    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>>;

    fn embed_query(&mut self, query: &str) -> Result<EmbeddingMatrix>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn model_id(&self) -> String {
        (**self).model_id()
    }

    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>> {
        (**self).embed_documents(texts)
    }

    fn embed_query(&mut self, query: &str) -> Result<EmbeddingMatrix> {
        (**self).embed_query(query)
    }
}

/// Build the embedder selected by the configuration.
///
/// The local model is not loaded until the first text is embedded.
pub fn embedder_from_config(
    config: &EmbeddingConfig,
) -> Result<Box<dyn Embedder>> {
    Ok(match config.backend {
        EmbeddingBackend::Colbert => {
            Box::new(ModelManager::with_model_id(config.model.clone()))
        }
        EmbeddingBackend::Ollama => Box::new(OllamaEmbedder::new(config)?),
    })
}

/// A set of embedding vectors (one row per token, or a single row).
///
/// Rows are L2-normalised, so a dot product between rows is a cosine.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub num_tokens: u32,
    pub dimension: u32,
    /// Flat array of f32 values in row-major order: `data[token_idx * dimension + dim_idx]`.
    pub data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Build from a flat row-major buffer, normalising every row and
    /// dropping all-zero rows (padding).
    pub fn from_flat(dimension: usize, data: &[f32]) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(Error::Embedding(format!(
                "{} values do not form rows of dimension {dimension}",
                data.len()
            )));
        }

        let mut normalised = Vec::with_capacity(data.len());
        for row in data.chunks_exact(dimension) {
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                normalised.extend(row.iter().map(|x| x / norm));
            }
        }

        Ok(Self {
            num_tokens: (normalised.len() / dimension) as u32,
            dimension: dimension as u32,
            data: normalised,
        })
    }

    /// Build a single-row matrix from one sentence vector.
    pub fn from_vector(vector: &[f32]) -> Result<Self> {
        Self::from_flat(vector.len(), vector)
    }

    pub fn is_empty(&self) -> bool {
        self.num_tokens == 0
    }
}
