//! Gridgate CLI
//!
//! Command-line access to an admin API: sign in, fetch resources, and query
//! or export record sets with search, filters, sorting, and paging.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and store credentials
//! gridgate login --username amy --password hunter2
//!
//! # Second page of open tasks, newest first
//! gridgate query --remote tasks/ --filter status=open --sort created:desc --page 2
//!
//! # Export every matching record to data-<date>.csv
//! gridgate export --file people.json --search am --columns name=Name,age=Age
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridgate_client::{ClientConfig, PipelineError, RequestPipeline};
use gridgate_core::{Table, default_export_filename};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

mod args;
mod records;

use args::ViewArgs;

#[derive(Parser)]
#[command(name = "gridgate")]
#[command(about = "Query and export records behind an authenticated admin API")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the returned tokens
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Forget stored tokens
    Logout,

    /// Show configuration and sign-in state
    Status,

    /// GET an API path and print the JSON response
    Fetch {
        /// Path relative to the base URL (e.g. projects/1/)
        path: String,
    },

    /// Print one page of a filtered and sorted record set
    Query {
        #[command(flatten)]
        view: ViewArgs,

        /// Page to show (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Records per page
        #[arg(long, default_value = "10")]
        page_size: NonZeroUsize,
    },

    /// Write the whole filtered and sorted record set as CSV
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Output file (defaults to data-<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Login { username, password } => login(&config, &username, &password).await,
        Commands::Logout => logout(&config).await,
        Commands::Status => status(&config).await,
        Commands::Fetch { path } => fetch(&config, &path).await,
        Commands::Query { view, page, page_size } => query(&config, &view, page, page_size).await,
        Commands::Export { view, output } => export(&config, &view, output).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => ClientConfig::load_from_path(ClientConfig::default_path()?)
            .context("Failed to load config")?,
    };
    config.apply_env_overrides();
    Ok(config)
}

fn init_logging(config: &ClientConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn pipeline(config: &ClientConfig) -> Result<RequestPipeline> {
    config.build_pipeline().context("Failed to set up the API client")
}

/// Turn an expired session into an instruction to sign in again.
pub(crate) fn session_hint(error: PipelineError) -> anyhow::Error {
    if error.is_auth_expired() {
        anyhow::Error::new(error).context("Session expired, run `gridgate login`")
    } else {
        error.into()
    }
}

async fn login(config: &ClientConfig, username: &str, password: &str) -> Result<()> {
    let pipeline = pipeline(config)?;
    let body = serde_json::json!({ "username": username, "password": password });

    let pair = pipeline.login(&body).await.context("Login failed")?;
    println!("Logged in as {}", username);
    if pair.refresh.is_none() {
        println!("  (no refresh token issued; you will need to sign in again when the session expires)");
    }
    Ok(())
}

async fn logout(config: &ClientConfig) -> Result<()> {
    pipeline(config)?.logout().await?;
    println!("Logged out");
    Ok(())
}

async fn status(config: &ClientConfig) -> Result<()> {
    let pipeline = pipeline(config)?;
    let credentials = pipeline.credentials();

    println!("Base URL:        {}", pipeline.base_url());
    println!("Credential store: {:?}", config.store);
    println!("Renewal policy:  {:?}", pipeline.renewal_policy());
    println!(
        "Access token:    {}",
        if credentials.load_access().await?.is_some() { "present" } else { "absent" }
    );
    println!(
        "Refresh token:   {}",
        if credentials.load_refresh().await?.is_some() { "present" } else { "absent" }
    );
    Ok(())
}

async fn fetch(config: &ClientConfig, path: &str) -> Result<()> {
    let pipeline = pipeline(config)?;
    let document: serde_json::Value = pipeline.get_json(path).await.map_err(session_hint)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn load_table(
    config: &ClientConfig,
    view: &ViewArgs,
    page: usize,
    page_size: NonZeroUsize,
) -> Result<Table<serde_json::Value>> {
    let records = match (&view.file, &view.remote) {
        (Some(file), _) => records::load_file(file)?,
        (None, Some(remote)) => {
            let pipeline = pipeline(config)?;
            records::load_remote(&pipeline, remote).await?
        }
        (None, None) => anyhow::bail!("one of --file or --remote is required"),
    };
    debug!("Loaded {} records", records.len());

    let columns = view.columns_for(&records);
    Ok(Table::new(records, columns, view.view_state(page, page_size)))
}

async fn query(config: &ClientConfig, view: &ViewArgs, page: usize, page_size: NonZeroUsize) -> Result<()> {
    let table = load_table(config, view, page, page_size).await?;
    let derived = table.derived_view();
    let current = table.page(&derived);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in current.items {
        let row: serde_json::Map<String, serde_json::Value> = table
            .columns()
            .iter()
            .map(|column| (column.key().to_string(), column.value(record).into()))
            .collect();
        writeln!(out, "{}", serde_json::Value::Object(row))?;
    }

    if current.items.is_empty() {
        eprintln!("No matching records");
    } else {
        eprintln!(
            "Showing {}-{} of {} (page {}/{})",
            current.first_index(),
            current.first_index() + current.items.len() - 1,
            current.total,
            current.page,
            current.page_count
        );
    }
    Ok(())
}

async fn export(config: &ClientConfig, view: &ViewArgs, output: Option<PathBuf>) -> Result<()> {
    let table = load_table(config, view, 1, NonZeroUsize::MIN).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(default_export_filename()));

    let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    let rows = table
        .export_csv(BufWriter::new(file))
        .with_context(|| format!("Failed to write {:?}", path))?;

    info!("Exported {} rows to {:?}", rows, path);
    println!("Exported {} records to {}", rows, path.display());
    Ok(())
}
