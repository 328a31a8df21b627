//! # Quote Search CLI (`qs`)
//!
//! The `qs` binary builds searchable datasets of dialogue windows from
//! episodic scripts and runs semantic queries against them.
//!
//! ## Usage
//!
//! ```bash
//! qs --config ./config/qs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qs init` | Create the SQLite database and run schema migrations |
//! | `qs build <corpus>` | Window, embed, and store a configured corpus |
//! | `qs search "<query>" --dataset <name>` | Rank a dataset's windows against a query |
//! | `qs datasets` | List stored datasets |
//! | `qs delete <dataset>` | Remove a stored dataset |
//! | `qs export <dataset>` | Dump a dataset (with embeddings) as JSON |
//!
//! ## Examples
//!
//! ```bash
//! qs init
//! qs build atla --window-size 5
//! qs build atla --dialogue-only
//! qs search "honor is a gift you give yourself" --dataset atla --top-k 10
//! QS_LOG=info qs build atla
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use quote_search::{build, config, datasets, export, migrate, search};

/// Quote Search CLI: semantic search over dialogue windows from episodic scripts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/qs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "qs",
    about = "Quote Search: semantic search over dialogue windows from episodic scripts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/qs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Build a dataset from a configured corpus.
    ///
    /// Splits the corpus into episode-bounded windows, embeds every window,
    /// and stores the result as `<corpus>` (or `<corpus>_dialogue`),
    /// replacing any previous build of the same name.
    Build {
        /// Corpus name, as configured under `[corpora.<name>]`.
        corpus: String,

        /// Lines per window. Overrides `[build].window_size`.
        #[arg(long)]
        window_size: Option<usize>,

        /// Texts per embedding call. Overrides `[build].batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Drop narration and stage directions before windowing.
        #[arg(long)]
        dialogue_only: bool,

        /// Report line and window counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Clear a build lock left behind by a crashed build.
        #[arg(long)]
        force: bool,
    },

    /// Search a dataset.
    Search {
        /// The search query string.
        query: String,

        /// Dataset name (e.g. `atla`, `atla_dialogue`).
        #[arg(long)]
        dataset: String,

        /// Maximum number of results. Overrides `[retrieval].top_k`.
        #[arg(long)]
        top_k: Option<usize>,

        /// Keep results whose lines overlap a higher-ranked result.
        #[arg(long)]
        no_dedupe: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List stored datasets.
    Datasets,

    /// Delete a stored dataset and its windows.
    Delete {
        /// Dataset name.
        dataset: String,
    },

    /// Export a dataset as JSON.
    Export {
        /// Dataset name.
        dataset: String,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // QS_LOG=debug qs build atla
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Build {
            corpus,
            window_size,
            batch_size,
            dialogue_only,
            dry_run,
            force,
        } => {
            build::run_build(
                &cfg,
                &corpus,
                window_size,
                batch_size,
                dialogue_only,
                dry_run,
                force,
            )
            .await?;
        }
        Commands::Search {
            query,
            dataset,
            top_k,
            no_dedupe,
            json,
        } => {
            search::run_search(&cfg, &query, &dataset, top_k, no_dedupe, json).await?;
        }
        Commands::Datasets => {
            datasets::list_datasets(&cfg).await?;
        }
        Commands::Delete { dataset } => {
            datasets::delete_dataset(&cfg, &dataset).await?;
        }
        Commands::Export { dataset, output } => {
            export::run_export(&cfg, &dataset, output.as_deref()).await?;
        }
    }

    Ok(())
}
