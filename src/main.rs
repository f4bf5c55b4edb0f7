//! Command-line interface for workspace-synth
//!
//! # Usage Examples
//!
//! ## Generate
//! ```bash
//! # Deterministic dataset with direct and group conversations
//! workspace-synth generate \
//!   --db demo.db --seed 7 \
//!   --users 200 --channels 12 --im-channels 40 --mpim-channels 10 \
//!   --messages 5000 --files 300
//!
//! # Apply built-in record hooks during generation
//! workspace-synth generate --db demo.db --plugin redact-emails --plugin bot-titles
//! ```
//!
//! ## Export / Import
//! ```bash
//! # Full export, then an incremental follow-up driven by a state file
//! workspace-synth export --db demo.db --out exports/ --state exports/state.json
//! workspace-synth export --db demo.db --out exports-incr/ --state exports/state.json
//!
//! # Round-trip into a fresh database
//! workspace-synth import --db copy.db --source exports/ --mode fresh
//! ```
//!
//! ## Inspect
//! ```bash
//! workspace-synth stats --db demo.db
//! workspace-synth validate --db demo.db
//! ```
//!
//! ## Serve
//! ```bash
//! # Read-only HTTP projection with keyset pagination
//! workspace-synth serve --db demo.db --bind 127.0.0.1:8080
//! curl "http://127.0.0.1:8080/workspaces"
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use synth_export::{export_workspace, import_workspace, ExportOptions, ImportMode};
use synth_generator::{build_registry, generate_dataset};
use synth_store::{validate_store, Store, ValidateOptions};
use workspace_synth::{api, GenerateOpts, StoreOpts};

#[derive(Parser)]
#[command(name = "workspace-synth")]
#[command(about = "Deterministic team-workspace dataset synthesizer with embedded queryable storage")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a deterministic dataset into a SQLite database
    Generate {
        #[command(flatten)]
        store: StoreOpts,

        #[command(flatten)]
        config: GenerateOpts,

        /// Built-in record hook to apply during generation (repeatable)
        #[arg(long = "plugin", value_name = "NAME")]
        plugins: Vec<String>,

        /// Write the run summary as JSON to this path
        #[arg(long, value_name = "PATH")]
        summary_out: Option<PathBuf>,
    },

    /// Export one workspace as JSONL artifacts
    Export {
        #[command(flatten)]
        store: StoreOpts,

        /// Output directory; artifacts land in <out>/<workspace-id>/
        #[arg(long, default_value = "exports")]
        out: PathBuf,

        /// Workspace to export (defaults to the most recently created)
        #[arg(long)]
        workspace_id: Option<String>,

        /// Write .jsonl.gz artifacts instead of plain .jsonl
        #[arg(long)]
        compress: bool,

        /// Only messages with a timestamp strictly greater than this
        #[arg(long)]
        messages_after_ts: Option<i64>,

        /// Only files created strictly after this timestamp
        #[arg(long)]
        files_after_ts: Option<i64>,

        /// Watermark state file for incremental exports
        #[arg(long, value_name = "PATH")]
        state: Option<PathBuf>,
    },

    /// Import exported JSONL artifacts into a database
    Import {
        #[command(flatten)]
        store: StoreOpts,

        /// Export directory holding <workspace-id>/ subdirectories
        #[arg(long, default_value = "exports")]
        source: PathBuf,

        /// Workspace to import (defaults to the only export present)
        #[arg(long)]
        workspace_id: Option<String>,

        /// How to treat rows that already exist in the target
        #[arg(long, value_enum, default_value = "fresh")]
        mode: ImportModeArg,
    },

    /// Print a per-workspace summary (counts, channel types, max timestamps, meta)
    Stats {
        #[command(flatten)]
        store: StoreOpts,

        /// Workspace to summarize (defaults to the most recently created)
        #[arg(long)]
        workspace_id: Option<String>,

        /// Write the summary as JSON to this path instead of stdout
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Check a database for schema and provenance compatibility
    Validate {
        #[command(flatten)]
        store: StoreOpts,

        /// Workspace expected in the database
        #[arg(long)]
        workspace_id: Option<String>,
    },

    /// Serve the read-only HTTP projection
    Serve {
        #[command(flatten)]
        store: StoreOpts,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

/// Conflict handling for imports
#[derive(Clone, Debug, ValueEnum)]
enum ImportModeArg {
    /// Target database must contain no workspace yet
    Fresh,
    /// Keep existing rows, insert only the missing ones
    Append,
}

impl From<ImportModeArg> for ImportMode {
    fn from(mode: ImportModeArg) -> Self {
        match mode {
            ImportModeArg::Fresh => ImportMode::Fresh,
            ImportModeArg::Append => ImportMode::Append,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            store,
            config,
            plugins,
            summary_out,
        } => {
            run_generate(store, config, plugins, summary_out)?;
        }
        Commands::Export {
            store,
            out,
            workspace_id,
            compress,
            messages_after_ts,
            files_after_ts,
            state,
        } => {
            run_export(
                store,
                out,
                workspace_id,
                compress,
                messages_after_ts,
                files_after_ts,
                state,
            )?;
        }
        Commands::Import {
            store,
            source,
            workspace_id,
            mode,
        } => {
            run_import(store, source, workspace_id, mode)?;
        }
        Commands::Stats {
            store,
            workspace_id,
            out,
        } => {
            run_stats(store, workspace_id, out)?;
        }
        Commands::Validate {
            store,
            workspace_id,
        } => {
            run_validate(store, workspace_id)?;
        }
        Commands::Serve { store, bind } => {
            run_serve(store, bind).await?;
        }
    }

    Ok(())
}

fn run_generate(
    store_opts: StoreOpts,
    generate_opts: GenerateOpts,
    plugins: Vec<String>,
    summary_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = generate_opts.to_config();
    let registry = build_registry(&plugins).context("Failed to resolve plugins")?;

    let mut store = Store::open(&store_opts.db)
        .with_context(|| format!("Failed to open database at {}", store_opts.db.display()))?;

    let summary = generate_dataset(&mut store, &config, &registry)?;
    let rendered = serde_json::to_string_pretty(&summary)?;
    println!("{rendered}");

    if let Some(path) = summary_out {
        std::fs::write(&path, format!("{rendered}\n"))
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_export(
    store_opts: StoreOpts,
    out: PathBuf,
    workspace_id: Option<String>,
    compress: bool,
    messages_after_ts: Option<i64>,
    files_after_ts: Option<i64>,
    state: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = Store::open_read_only(&store_opts.db)
        .with_context(|| format!("Failed to open database at {}", store_opts.db.display()))?;

    let options = ExportOptions {
        workspace_id,
        compress,
        messages_after_ts,
        files_after_ts,
        state_path: state,
    };
    let report = export_workspace(&store, &out, &options)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_import(
    store_opts: StoreOpts,
    source: PathBuf,
    workspace_id: Option<String>,
    mode: ImportModeArg,
) -> anyhow::Result<()> {
    let mut store = Store::open(&store_opts.db)
        .with_context(|| format!("Failed to open database at {}", store_opts.db.display()))?;

    let report = import_workspace(&mut store, &source, workspace_id.as_deref(), mode.into())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_stats(
    store_opts: StoreOpts,
    workspace_id: Option<String>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = Store::open_read_only(&store_opts.db)
        .with_context(|| format!("Failed to open database at {}", store_opts.db.display()))?;

    let workspace_id = match workspace_id {
        Some(id) => id,
        None => store
            .latest_workspace_id()?
            .context("database has no workspace")?,
    };
    let summary = store.export_summary(&workspace_id)?;
    let rendered = serde_json::to_string_pretty(&summary)?;
    match out {
        Some(path) => std::fs::write(&path, format!("{rendered}\n"))
            .with_context(|| format!("Failed to write stats to {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn run_validate(store_opts: StoreOpts, workspace_id: Option<String>) -> anyhow::Result<()> {
    let options = ValidateOptions {
        workspace_id: workspace_id.as_deref(),
        require_workspace: true,
        tool_version: Some(env!("CARGO_PKG_VERSION")),
    };
    let report = validate_store(&store_opts.db, options);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.ok {
        anyhow::bail!("validation failed with {} error(s)", report.errors.len());
    }
    Ok(())
}

async fn run_serve(store_opts: StoreOpts, bind: String) -> anyhow::Result<()> {
    let state = api::AppState::new(store_opts.db.clone());
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(
        "Serving dataset {} on http://{}",
        store_opts.db.display(),
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
