//! Blocking client for a local [Ollama](https://ollama.com) server.
//!
//! Used for answer generation (`/api/generate`) and, when selected, for
//! sentence embeddings (`/api/embed`).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{EmbeddingConfig, LlmConfig},
    embedding::{Embedder, EmbeddingMatrix},
    error::{Error, Result},
    llm::LanguageModel,
};

/// Texts sent per embedding request.
const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

fn http_client(timeout: std::time::Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Answering model served by Ollama.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    context_window: u32,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.request_timeout)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            context_window: config.context_window,
        })
    }
}

impl LanguageModel for OllamaClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_ctx: self.context_window,
            },
        };

        debug!(
            "sending {} character prompt to {}",
            prompt.chars().count(),
            self.model
        );

        let response: GenerateResponse = self
            .http
            .post(endpoint(&self.base_url, "api/generate"))
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        Ok(response.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Sentence-embedding model served by Ollama.
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.request_timeout)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response: EmbedResponse = self
            .http
            .post(endpoint(&self.base_url, "api/embed"))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()?
            .error_for_status()?
            .json()?;

        if response.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>> {
        let mut matrices = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            for vector in self.embed_batch(batch)? {
                matrices.push(EmbeddingMatrix::from_vector(&vector)?);
            }
        }
        Ok(matrices)
    }

    fn embed_query(&mut self, query: &str) -> Result<EmbeddingMatrix> {
        let vectors = self.embed_batch(&[query.to_string()])?;
        match vectors.first() {
            Some(vector) => EmbeddingMatrix::from_vector(vector),
            None => Err(Error::Embedding("empty embedding response".into())),
        }
    }
}
