use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use docchat::{
    Dataset,
    LlmConfig,
    config::{DEFAULT_TOP_K, EmbeddingBackend, EmbeddingConfig},
    dataset::{
        DEFAULT_DOCUMENTS_FOLDER,
        DEFAULT_LOG_FOLDER,
        DEFAULT_STORE_FOLDER,
    },
    error::Result,
    indexer::IndexMode,
};

#[derive(Debug, Parser)]
#[command(
    name = "docchat",
    version,
    about = "Ask questions about your private documents with a local language model"
)]
pub struct Cli {
    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a dataset, then answer questions using its most relevant chunks
    Chat(ChatArgs),
    /// Answer questions about one file of a dataset at a time
    Summarize(SummarizeArgs),
    /// Index a dataset without starting a chat
    Index(IndexArgs),
    /// Show what is indexed for a dataset
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Shared argument groups --

#[derive(Debug, Args)]
pub struct DatasetArgs {
    /// Name of the dataset: a folder inside the documents folder
    #[arg(long, visible_alias = "data-folder", alias = "data_folder")]
    pub dataset: String,

    /// Folder holding one sub-folder per dataset
    #[arg(
        long,
        default_value = DEFAULT_DOCUMENTS_FOLDER,
        visible_alias = "root-folder",
        aliases = ["root_folder", "documents_folder"]
    )]
    pub documents_folder: PathBuf,

    /// Folder receiving one sub-folder of query logs per dataset
    #[arg(long, default_value = DEFAULT_LOG_FOLDER, alias = "log_folder")]
    pub log_folder: PathBuf,

    /// Folder holding one vector store per dataset
    #[arg(
        long,
        default_value = DEFAULT_STORE_FOLDER,
        aliases = ["store_folder", "chroma-folder", "chroma_folder"]
    )]
    pub store_folder: PathBuf,
}

impl DatasetArgs {
    pub fn resolve(&self) -> Result<Dataset> {
        Dataset::new(
            &self.dataset,
            &self.documents_folder,
            &self.store_folder,
            &self.log_folder,
        )
    }
}

#[derive(Debug, Args)]
pub struct OllamaArgs {
    /// Base URL of the Ollama server [env: DOCCHAT_OLLAMA_URL]
    #[arg(long)]
    pub ollama_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct LlmArgs {
    /// Ollama model answering the questions [env: DOCCHAT_LLM_MODEL]
    #[arg(long)]
    pub llm_model: Option<String>,
}

impl LlmArgs {
    pub fn config(&self, ollama: &OllamaArgs) -> LlmConfig {
        LlmConfig::resolve(
            self.llm_model.as_deref(),
            ollama.ollama_url.as_deref(),
        )
    }
}

#[derive(Debug, Args)]
pub struct EmbeddingArgs {
    /// Where embeddings are computed
    #[arg(long, value_enum, default_value_t)]
    pub embedding_backend: EmbeddingBackend,

    /// Embedding model ID or local path [env: DOCCHAT_EMBEDDING_MODEL]
    #[arg(long)]
    pub embedding_model: Option<String>,
}

impl EmbeddingArgs {
    pub fn config(&self, ollama: &OllamaArgs) -> EmbeddingConfig {
        EmbeddingConfig::resolve(
            self.embedding_backend,
            self.embedding_model.as_deref(),
            ollama.ollama_url.as_deref(),
        )
    }
}

// -- Chat --

#[derive(Debug, Parser)]
pub struct ChatArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub ollama: OllamaArgs,

    #[command(flatten)]
    pub llm: LlmArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    /// How to treat an existing vector store before chatting
    #[arg(long, value_enum, default_value_t)]
    pub index_mode: IndexMode,

    /// Number of chunks retrieved per question
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Print the source of every context chunk after each answer
    #[arg(long)]
    pub show_sources: bool,
}

// -- Summarize --

#[derive(Debug, Parser)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub ollama: OllamaArgs,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Print the source of every context chunk after each answer
    #[arg(long)]
    pub show_sources: bool,
}

// -- Index --

#[derive(Debug, Parser)]
pub struct IndexArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub ollama: OllamaArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    /// How to treat an existing vector store
    #[arg(long, value_enum, default_value_t)]
    pub index_mode: IndexMode,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docchat",
            &mut std::io::stdout(),
        );
    }
}
