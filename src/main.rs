//! # Club Assistant CLI (`club-assistant`)
//!
//! ## Usage
//!
//! ```bash
//! club-assistant --config ./config/club.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `club-assistant serve` | Build the index and start the HTTP server |
//! | `club-assistant retrieve "<question>"` | Show which documents a question retrieves |
//! | `club-assistant check` | Validate configuration and document files |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use club_assistant::config::{load_config, Config};
use club_assistant::loader::load_all;
use club_assistant::server::{run_server, AppContext};
use club_assistant::store::VectorStore;

/// Club Assistant — answers questions about the Brooklyn College Computer
/// Science Club from a fixed document set.
#[derive(Parser)]
#[command(name = "club-assistant", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional: when the file does not exist, defaults plus environment
    /// variables (`FRONTEND_URL`, `APP_DEBUG`, `HOST`, `PORT`) are used.
    #[arg(long, global = true, default_value = "./config/club.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents, build the vector index, and serve the HTTP API.
    Serve,

    /// Print the documents retrieved for a question, with scores.
    Retrieve {
        /// The question to embed and match.
        question: String,

        /// Number of documents to return (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Load configuration and documents without embedding anything.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config);

    match cli.command {
        Commands::Serve => {
            if config.server.debug {
                tracing::warn!("debug mode enabled; do not run this in production");
            }
            let ctx = AppContext::from_config(&config).await?;
            run_server(&config, ctx).await?;
        }
        Commands::Retrieve { question, k } => {
            let store = VectorStore::from_config(&config).await?;
            let k = k.unwrap_or(config.retrieval.top_k);
            for (rank, hit) in store.query(&question, k).await?.iter().enumerate() {
                println!("{}. {:.4}  {}", rank + 1, hit.score, hit.document.title());
            }
        }
        Commands::Check => {
            let documents = load_all(&config.documents.paths)?;
            println!("documents: {}", documents.len());
            println!("bind: {}", config.server.bind_addr());
            println!(
                "frontend origin: {}",
                config.server.frontend_url.as_deref().unwrap_or("(none)")
            );
            println!("llm: {} ({})", config.llm.model, config.llm.provider);
            println!(
                "embedding: {} ({})",
                config.embedding.model, config.embedding.provider
            );
        }
    }

    Ok(())
}

/// `RUST_LOG` wins when set; otherwise the debug flag picks the level.
fn init_tracing(config: &Config) {
    let default_level = if config.server.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
