use std::io::IsTerminal;

use clap::Parser;
use docchat::{
    FileChatbot,
    OllamaClient,
    RagChatbot,
    VectorStore,
    embedding::embedder_from_config,
    error,
    indexer::{IndexMode, IndexOptions, IndexReport, index_dataset},
    repl,
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCCHAT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Chat(args) => cmd_chat(&args)?,
        Command::Summarize(args) => cmd_summarize(&args)?,
        Command::Index(args) => cmd_index(&args)?,
        Command::Status(args) => cmd_status(&args)?,
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

fn index_options(mode: IndexMode) -> IndexOptions {
    IndexOptions {
        mode,
        progress: std::io::stderr().is_terminal(),
    }
}

fn cmd_chat(args: &cli::ChatArgs) -> error::Result<()> {
    let dataset = args.dataset.resolve()?;
    let store = VectorStore::open(&dataset.store_path()?)?;
    let mut embedder =
        embedder_from_config(&args.embedding.config(&args.ollama))?;

    let report = index_dataset(
        &dataset,
        &store,
        embedder.as_mut(),
        index_options(args.index_mode),
    )?;
    print_report(&report);

    let llm = OllamaClient::new(&args.llm.config(&args.ollama))?;
    let mut chatbot = RagChatbot::new(dataset, store, embedder, Box::new(llm))
        .with_top_k(args.top_k);

    repl::run_chat(
        &mut chatbot,
        std::io::stdin().lock(),
        std::io::stdout().lock(),
        args.show_sources,
    )
}

fn cmd_summarize(args: &cli::SummarizeArgs) -> error::Result<()> {
    let dataset = args.dataset.resolve()?;
    dataset.require_documents_dir()?;

    let llm = OllamaClient::new(&args.llm.config(&args.ollama))?;
    let mut chatbot = FileChatbot::new(dataset, Box::new(llm));

    repl::run_summarize(
        &mut chatbot,
        std::io::stdin().lock(),
        std::io::stdout().lock(),
        args.show_sources,
    )
}

fn cmd_index(args: &cli::IndexArgs) -> error::Result<()> {
    let dataset = args.dataset.resolve()?;
    let store = VectorStore::open(&dataset.store_path()?)?;
    let mut embedder =
        embedder_from_config(&args.embedding.config(&args.ollama))?;

    let report = index_dataset(
        &dataset,
        &store,
        embedder.as_mut(),
        index_options(args.index_mode),
    )?;
    print_report(&report);

    println!(
        "Dataset '{}': {} chunks in {}",
        dataset.name(),
        store.chunk_count()?,
        dataset.store_dir().display()
    );
    Ok(())
}

fn print_report(report: &IndexReport) {
    eprintln!(
        "Indexed {} files ({} chunks), {} unchanged, {} removed, {} skipped",
        report.files,
        report.chunks,
        report.unchanged,
        report.removed,
        report.skipped
    );
}

fn cmd_status(args: &cli::StatusArgs) -> error::Result<()> {
    let dataset = args.dataset.resolve()?;

    // Opening would create an empty store for a dataset never indexed.
    let (files, chunk_count, model) = match dataset.existing_store_path() {
        Some(path) => {
            let store = VectorStore::open(&path)?;
            (store.files()?, store.chunk_count()?, store.embedding_model()?)
        }
        None => (Vec::new(), 0, None),
    };

    if args.json {
        let status = serde_json::json!({
            "dataset": dataset.name(),
            "documents": dataset.documents_dir(),
            "store": dataset.store_dir(),
            "logs": dataset.log_dir(),
            "embedding_model": model,
            "files": files.len(),
            "chunks": chunk_count,
        });
        println!("{status}");
    } else {
        println!("Dataset: {}", dataset.name());
        println!("Documents: {}", dataset.documents_dir().display());
        println!("Store: {}", dataset.store_dir().display());
        println!("Logs: {}", dataset.log_dir().display());
        println!(
            "Embedding model: {}",
            model.as_deref().unwrap_or("(not indexed)")
        );
        println!("Files: {}", files.len());
        for (name, record) in &files {
            println!("  {name}: {} chunks", record.chunk_keys.len());
        }
        println!("Chunks: {chunk_count}");
    }
    Ok(())
}
