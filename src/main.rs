use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfrag::answerer::{AnswerRecord, Answerer};
use pdfrag::config::Config;
use pdfrag::indexer::Indexer;
use pdfrag::ollama::{OllamaClient, OllamaClientBuilder};
use pdfrag::store::{CollectionInfo, CollectionRef, VectorStore};
use pdfrag::utils::{default_log_path, ensure_parent_directory};
use pdfrag::{Error, doctor, tui};
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

/// pdfrag - ask questions about your PDFs, answered with cited sources
#[derive(Parser)]
#[command(name = "pdfrag")]
#[command(about = "Index PDF documents and ask questions answered from their contents")]
#[command(version)]
struct Cli {
    /// Vector store file (overrides PDFRAG_STORE)
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Open the interactive interface (default)
    Tui,
    /// Index documents into a new collection
    Index(IndexCommand),
    /// Ask a question against an indexed collection
    Ask(AskCommand),
    /// List or remove stored collections
    Collections {
        #[command(subcommand)]
        action: CollectionsCommand,
    },
    /// Check the vector store and the Ollama server
    Doctor,
}

#[derive(Parser)]
struct IndexCommand {
    /// PDF or text files to index
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,
}

#[derive(Parser)]
struct AskCommand {
    /// Collection id printed by `index`
    #[arg(short, long, value_name = "ID")]
    collection: String,

    /// Number of chunks to retrieve (default: PDFRAG_TOP_K, or 4)
    #[arg(short, long)]
    k: Option<usize>,

    /// The question to answer
    #[arg(value_name = "QUESTION")]
    question: String,
}

#[derive(Subcommand)]
enum CollectionsCommand {
    /// Show all collections, newest first
    List,
    /// Delete one collection
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Delete all but the newest collections
    Prune {
        /// Number of collections to keep
        #[arg(long, value_name = "N")]
        keep: usize,
    },
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let is_tui = matches!(cli.command, None | Some(Commands::Tui));
    init_tracing(is_tui);

    let result = run(cli);

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    match cli.command {
        None | Some(Commands::Tui) => tui::run(&config),
        Some(Commands::Index(cmd)) => handle_index(&config, &cmd),
        Some(Commands::Ask(cmd)) => handle_ask(&config, &cmd),
        Some(Commands::Collections { action }) => handle_collections(&config, &action),
        Some(Commands::Doctor) => handle_doctor(&config),
    }
}

/// Sends logs to stderr, or to the log file while the TUI owns the terminal.
fn init_tracing(tui: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if tui { "info" } else { "warn" }));

    if !tui {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    let file = default_log_path().ok().and_then(|path| {
        ensure_parent_directory(&path).ok()?;
        std::fs::File::create(path).ok()
    });
    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
}

/// User errors are problems with the supplied input; everything else is
/// internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<Error>().is_some_and(Error::is_user_error))
}

fn ollama_client(config: &Config) -> Result<Arc<OllamaClient>> {
    let client = OllamaClientBuilder::new()
        .base_url(config.ollama_host.clone())
        .model(config.chat_model.clone())
        .embedding_model(config.embedding_model.clone())
        .build()
        .context("Failed to create Ollama client")?;
    Ok(Arc::new(client))
}

fn handle_index(config: &Config, cmd: &IndexCommand) -> Result<()> {
    let indexer = Indexer::new(ollama_client(config)?, &config.store_path);
    let collection = indexer.build_index(&cmd.files)?;

    println!("Collection: {}", collection.collection_id);
    println!("Store:      {}", collection.store_location.display());
    Ok(())
}

fn handle_ask(config: &Config, cmd: &AskCommand) -> Result<()> {
    let client = ollama_client(config)?;
    let answerer = Answerer::new(client.clone(), client);
    let collection = CollectionRef::new(cmd.collection.clone(), config.store_path.clone());

    let k = cmd.k.unwrap_or(config.top_k);
    let record = answerer.answer(&cmd.question, &collection, k)?;
    print!("{}", format_answer(&record));
    Ok(())
}

/// Formats an answer and its sources for the terminal.
fn format_answer(record: &AnswerRecord) -> String {
    let mut out = String::new();
    out.push_str(record.answer());
    out.push_str("\n\nSources:\n");
    if record.sources().is_empty() {
        out.push_str("  No sources returned.\n");
    }
    for source in record.sources() {
        out.push_str(&format!("  - {source}\n"));
    }
    out
}

fn handle_collections(config: &Config, action: &CollectionsCommand) -> Result<()> {
    let location = &config.store_path;

    match action {
        CollectionsCommand::List => {
            let collections = match VectorStore::open_read_only(location)? {
                Some(store) => store.list_collections()?,
                None => Vec::new(),
            };
            if collections.is_empty() {
                println!("No collections in {}", location.display());
            }
            for info in &collections {
                println!("{}", format_collection(info));
            }
        }
        CollectionsCommand::Delete { name } => {
            let not_found = || Error::CollectionNotFound {
                collection: name.clone(),
                location: location.clone(),
            };
            if VectorStore::open_read_only(location)?.is_none() {
                return Err(not_found().into());
            }
            let mut store = VectorStore::open(location)?;
            if !store.delete_collection(name)? {
                return Err(not_found().into());
            }
            println!("Deleted {name}");
        }
        CollectionsCommand::Prune { keep } => {
            if VectorStore::open_read_only(location)?.is_none() {
                println!("Nothing to prune");
                return Ok(());
            }
            let mut store = VectorStore::open(location)?;
            let removed = store.prune(*keep)?;
            for name in &removed {
                println!("Deleted {name}");
            }
            println!("Removed {} collection(s), kept {}", removed.len(), keep);
        }
    }

    Ok(())
}

fn format_collection(info: &CollectionInfo) -> String {
    let created = info
        .created_at
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| "????-??-?? ??:??:??".to_string());
    format!(
        "{}  {}  {:>3} document(s)  {:>5} chunk(s)  {}",
        info.name, created, info.document_count, info.chunk_count, info.embedding_model
    )
}

fn handle_doctor(config: &Config) -> Result<()> {
    if !doctor::run_health_checks(config)? {
        anyhow::bail!("one or more health checks failed");
    }
    Ok(())
}
