use candle_core::{Device, Tensor};
use pylate_rs::ColBERT;

use crate::{
    embedding::{Embedder, EmbeddingMatrix},
    error::Result,
};

/// Documents encoded per forward pass.
const BATCH_SIZE: usize = 32;

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// Local ColBERT embedder, loaded on first use.
pub struct ModelManager {
    model: Option<ColBERT>,
    model_id: String,
}

impl ModelManager {
    /// Creates a `ModelManager` for a HuggingFace model ID or local path.
    ///
    /// Nothing is downloaded or loaded until the first text is embedded.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&mut self) -> Result<&mut ColBERT> {
        let model = match self.model.take() {
            Some(model) => model,
            None => {
                tracing::info!("loading embedding model {}", self.model_id);
                ColBERT::from(&self.model_id)
                    .with_device(default_device())
                    .try_into()?
            }
        };
        Ok(self.model.insert(model))
    }
}

impl Embedder for ModelManager {
    fn model_id(&self) -> String {
        format!("colbert:{}", self.model_id)
    }

    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>> {
        let model = self.ensure_loaded()?;

        let mut matrices = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            // [batch_size, num_tokens, dimension]
            let embeddings = model.encode(batch, false)?;
            let (batch_size, _num_tokens, dimension) = embeddings.dims3()?;

            for i in 0..batch_size {
                let flat = tensor_to_flat_f32(&embeddings.get(i)?)?;
                matrices.push(EmbeddingMatrix::from_flat(dimension, &flat)?);
            }
        }

        Ok(matrices)
    }

    fn embed_query(&mut self, query: &str) -> Result<EmbeddingMatrix> {
        let model = self.ensure_loaded()?;
        let embeddings = model.encode(&[query.to_string()], true)?;
        // Squeeze the batch dimension: [1, Q, D] -> [Q, D]
        let embeddings = embeddings.squeeze(0)?;
        let (_num_tokens, dimension) = embeddings.dims2()?;
        EmbeddingMatrix::from_flat(dimension, &tensor_to_flat_f32(&embeddings)?)
    }
}

/// Convert a Tensor of any shape into a flat Vec<f32>.
fn tensor_to_flat_f32(tensor: &Tensor) -> Result<Vec<f32>> {
    Ok(tensor.flatten_all()?.to_vec1::<f32>()?)
}
