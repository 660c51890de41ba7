//! The two ways of answering a question.
//!
//! [`RagChatbot`] retrieves context from the whole indexed dataset, while
//! [`FileChatbot`] uses every chunk of one named file. Both share the prompt
//! assembler and the language model; only the former logs its results.

use tracing::debug;

use crate::{
    config::DEFAULT_TOP_K,
    dataset::Dataset,
    embedding::Embedder,
    error::{Error, Result},
    llm::LanguageModel,
    loader::{DocumentChunk, load_file},
    prompt::assemble,
    query_log::log_results,
    search::retrieve,
    store::VectorStore,
};

/// Generated answer and where its context came from.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    /// Source path of every context chunk, in prompt order.
    pub sources: Vec<String>,
}

impl QueryResponse {
    fn new(answer: String, chunks: &[DocumentChunk]) -> Self {
        Self {
            answer,
            sources: chunks
                .iter()
                .map(|c| c.source_path().to_string())
                .collect(),
        }
    }

    /// `Response: {answer}` and `Sources: [...]` on two lines.
    pub fn formatted(&self) -> String {
        format!("Response: {}\nSources: {:?}", self.answer, self.sources)
    }
}

/// Answers questions using the most relevant chunks of an indexed dataset.
pub struct RagChatbot {
    dataset: Dataset,
    store: VectorStore,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LanguageModel>,
    top_k: usize,
    query_id: u64,
}

impl RagChatbot {
    /// The store is expected to be indexed already; the query counter
    /// starts at 0.
    pub fn new(
        dataset: Dataset,
        store: VectorStore,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn LanguageModel>,
    ) -> Self {
        Self {
            dataset,
            store,
            embedder,
            llm,
            top_k: DEFAULT_TOP_K,
            query_id: 0,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Number of queries answered so far; names the next log file.
    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Retrieve, log, prompt and answer.
    ///
    /// The log is written before the model is asked. The query counter only
    /// advances once an answer was generated, so a failed query's log is
    /// overwritten by the next one.
    pub fn query(&mut self, query: &str) -> Result<QueryResponse> {
        let results =
            retrieve(&self.store, self.embedder.as_mut(), query, self.top_k)?;

        let log_path =
            log_results(&results, self.query_id, self.dataset.log_dir())?;
        debug!("wrote {}", log_path.display());

        let prompt = assemble(&results, query);
        debug!(
            "asking {} with {} context chunk(s)",
            self.llm.name(),
            results.len()
        );
        let answer = self.llm.complete(&prompt)?;

        self.query_id += 1;
        Ok(QueryResponse::new(answer, &results))
    }
}

/// Answers questions about a single file of a dataset, no index needed.
pub struct FileChatbot {
    dataset: Dataset,
    llm: Box<dyn LanguageModel>,
    query_id: u64,
}

impl FileChatbot {
    pub fn new(dataset: Dataset, llm: Box<dyn LanguageModel>) -> Self {
        Self {
            dataset,
            llm,
            query_id: 0,
        }
    }

    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    /// Load `file` (relative to the dataset's documents folder) and ask the
    /// model with all of its chunks as context.
    pub fn query(&mut self, file: &str, query: &str) -> Result<QueryResponse> {
        let path = self.dataset.documents_dir().join(file);
        if !path.is_file() {
            return Err(Error::NotFound {
                kind: "file",
                name: path.display().to_string(),
            });
        }

        let chunks = load_file(&path)?;
        let prompt = assemble(&chunks, query);
        debug!("asking {} about {file}", self.llm.name());
        let answer = self.llm.complete(&prompt)?;

        self.query_id += 1;
        Ok(QueryResponse::new(answer, &chunks))
    }
}
