//! # pdfqa CLI
//!
//! ## Usage
//!
//! ```bash
//! pdfqa --config ./config/pdfqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa init` | Create the SQLite database and the index directory |
//! | `pdfqa upload <path>...` | Extract, chunk, embed and index PDF files |
//! | `pdfqa ask "<question>"` | Answer a question from the indexed documents |
//! | `pdfqa list` | List uploaded documents |
//! | `pdfqa delete <doc_id>` | Delete a document and its passages |
//! | `pdfqa clear` | Delete every document |
//! | `pdfqa chunk <path>` | Preview how a PDF would be chunked |
//! | `pdfqa stats` | Document and passage counts |
//! | `pdfqa serve` | Start the HTTP API |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdfqa::{app, ask, config, documents, preview, server, upload};
use pdfqa_core::chunk::ChunkStrategy;

/// pdfqa: ask questions about your PDFs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pdfqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    about = "Ask questions about your PDFs with retrieval-augmented answers",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pdfqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and index directory. Idempotent.
    Init,

    /// Upload PDF files. Directories are searched recursively for `*.pdf`.
    Upload {
        /// Files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a question about the uploaded documents.
    Ask {
        question: String,

        /// Only search passages of this document id.
        #[arg(long = "doc")]
        doc_id: Option<String>,

        /// Number of passages to retrieve (defaults to `[retrieval].top_k`).
        #[arg(long)]
        k: Option<usize>,

        /// Print the retrieved passages after the answer.
        #[arg(long)]
        show_sources: bool,
    },

    /// List uploaded documents, most recent first.
    List,

    /// Delete a document and all of its passages.
    Delete { doc_id: String },

    /// Delete every document and passage.
    Clear,

    /// Show how a PDF would be chunked without storing anything.
    Chunk {
        path: PathBuf,

        /// Override `[chunking].strategy`: `fixed` or `semantic`.
        #[arg(long)]
        strategy: Option<ChunkStrategy>,
    },

    /// Show document and passage counts.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            app::init(&cfg).await?;
            println!(
                "Initialized database {} and index {}",
                cfg.db.path.display(),
                cfg.index.dir.display()
            );
        }
        Commands::Upload { paths } => {
            upload::run_upload(&cfg, &paths).await?;
        }
        Commands::Ask {
            question,
            doc_id,
            k,
            show_sources,
        } => {
            ask::run_ask(&cfg, &question, doc_id.as_deref(), k, show_sources).await?;
        }
        Commands::List => {
            documents::run_list(&cfg).await?;
        }
        Commands::Delete { doc_id } => {
            documents::run_delete(&cfg, &doc_id).await?;
        }
        Commands::Clear => {
            documents::run_clear(&cfg).await?;
        }
        Commands::Chunk { path, strategy } => {
            preview::run_chunk_preview(&cfg, &path, strategy).await?;
        }
        Commands::Stats => {
            documents::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            let app = app::App::open(&cfg).await?;
            server::run_server(app).await?;
        }
    }

    Ok(())
}
