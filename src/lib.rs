//! docchat - ask questions about your private documents with a local
//! language model.
//!
//! docchat splits text, LaTeX, Markdown, PDF and Word files into chunks,
//! embeds them with a [ColBERT](https://github.com/stanford-futuredata/ColBERT)
//! model (or an [Ollama](https://ollama.com) embedding model), keeps the
//! embeddings in a per-dataset [redb](https://github.com/cberner/redb) store
//! and answers questions by handing the most relevant chunks to a language
//! model served by Ollama.
//!
//! # Quick start
//!
//! ```no_run
//! use docchat::{
//!     Dataset, LlmConfig, OllamaClient, RagChatbot, VectorStore,
//!     config::{EmbeddingBackend, EmbeddingConfig},
//!     embedding::embedder_from_config,
//!     indexer::{IndexOptions, index_dataset},
//! };
//! use std::path::Path;
//!
//! let dataset = Dataset::new(
//!     "recipes",
//!     Path::new("data"),
//!     Path::new("local_vectorstore"),
//!     Path::new("log"),
//! )
//! .unwrap();
//! let store = VectorStore::open(&dataset.store_path().unwrap()).unwrap();
//! let mut embedder = embedder_from_config(&EmbeddingConfig::resolve(
//!     EmbeddingBackend::Colbert,
//!     None,
//!     None,
//! ))
//! .unwrap();
//! index_dataset(&dataset, &store, embedder.as_mut(), IndexOptions::default())
//!     .unwrap();
//!
//! let llm = OllamaClient::new(&LlmConfig::default()).unwrap();
//! let mut chatbot = RagChatbot::new(dataset, store, embedder, Box::new(llm));
//! let response = chatbot.query("How do I make onion soup?").unwrap();
//! println!("{}", response.formatted());
//! ```

pub mod chatbot;
pub mod chunking;
pub mod config;
pub mod dataset;
pub mod doc_id;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod llm;
pub mod loader;
pub mod model_manager;
pub mod ollama;
pub mod prompt;
pub mod query_log;
pub mod repl;
pub mod search;
pub mod store;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_support;

pub use chatbot::{FileChatbot, QueryResponse, RagChatbot};
pub use config::LlmConfig;
pub use dataset::Dataset;
pub use doc_id::DocumentId;
pub use error::{Error, Result};
pub use loader::DocumentChunk;
pub use model_manager::ModelManager;
pub use ollama::OllamaClient;
pub use store::VectorStore;
