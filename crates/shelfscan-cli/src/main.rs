use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shelfscan_core::{AppConfig, ExitCode, LibraryStore};
use shelfscan_lookup::identifiers::normalize_isbn_input;
use shelfscan_lookup::{IsbnScanner, MetadataResolver, Orchestrator, Resolution, RunSummary};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelfscan",
    about = "Shelve scanned book PDFs by the ISBN printed inside them",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.config/shelfscan/config.toml.
    /// Also settable with SHELFSCAN_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (overrides SHELFSCAN_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output in JSON format.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every PDF in the input directory.
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the ISBN found in a PDF without moving it.
    Scan { pdf: PathBuf },

    /// Resolve an ISBN against the configured sources.
    Lookup { isbn: String },

    /// Apply a hand-written `path,isbn-or-directory` CSV.
    Complete { csv: PathBuf },

    /// List shelved books.
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config.
    Show,
    /// Print the config file path.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_from(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command {
        Commands::Run { input, output } => {
            if let Some(dir) = output {
                config.paths.output_dir = dir.display().to_string();
            }
            let input = input.unwrap_or_else(|| config.input_dir());
            let start = Instant::now();
            let mut orchestrator = open_orchestrator(&config)?;
            let summary = runtime
                .block_on(orchestrator.run(&input))
                .with_context(|| format!("run over {} stopped", input.display()))?;
            print_summary(&summary, start, cli.json)?;
        }

        Commands::Scan { pdf } => {
            if !pdf.is_file() {
                eprintln!("No such file: {}", pdf.display());
                exit(ExitCode::FileSystemError);
            }
            let scanner = IsbnScanner::from_config(&config.scan);
            let isbn = scanner
                .scan(&pdf)
                .with_context(|| format!("failed to scan {}", pdf.display()))?;
            match isbn {
                Some(isbn) if cli.json => print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "path": pdf, "isbn": isbn }
                }))?,
                Some(isbn) => println!("{isbn}"),
                None => {
                    eprintln!("No ISBN found in {}", pdf.display());
                    exit(ExitCode::NotFound);
                }
            }
        }

        Commands::Lookup { isbn } => {
            let Some(isbn) = normalize_isbn_input(&isbn) else {
                eprintln!("Not an ISBN: {isbn}");
                exit(ExitCode::InvalidArgs);
            };
            let resolver = MetadataResolver::from_config(&config.sources)?;
            let report = runtime.block_on(resolver.resolve(&isbn));

            match &report.resolution {
                Resolution::Resolved(record) => {
                    if cli.json {
                        print_json(&serde_json::json!({ "status": "ok", "data": record }))?;
                    } else {
                        println!("{}", serde_json::to_string_pretty(record)?);
                    }
                }
                Resolution::NoData => {
                    eprintln!("No source has data for ISBN {isbn}");
                    exit(ExitCode::NotFound);
                }
                Resolution::Unavailable => {
                    eprintln!("Sources unavailable for ISBN {isbn}: {}", report.failure_summary());
                    exit(ExitCode::NetworkError);
                }
            }
        }

        Commands::Complete { csv } => {
            if !csv.is_file() {
                eprintln!("No such file: {}", csv.display());
                exit(ExitCode::FileSystemError);
            }
            let start = Instant::now();
            let mut orchestrator = open_orchestrator(&config)?;
            let summary = runtime
                .block_on(orchestrator.complete_from_csv(&csv))
                .with_context(|| format!("completion from {} stopped", csv.display()))?;
            print_summary(&summary, start, cli.json)?;
        }

        Commands::List { limit } => {
            let store = open_store(&config)?;
            let books = store.list_books(limit)?;

            if cli.json {
                let total = store.count_books()?;
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": books, "total": total, "limit": limit }
                }))?;
            } else if books.is_empty() {
                println!("No books shelved yet. Use `shelfscan run` to process scans.");
            } else {
                for book in &books {
                    println!(
                        "{id:>5}  {isbn:<13}  {title:<40}  {author}",
                        id = book.id,
                        isbn = book.isbn,
                        title = book.title,
                        author = book.author.as_deref().unwrap_or("-"),
                    );
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    eprintln!(
                        "Config already exists at {} (use --force to overwrite)",
                        config_path.display()
                    );
                    exit(ExitCode::GeneralError);
                }
                AppConfig::default().save_to(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
            ConfigAction::Show => {
                if cli.json {
                    print_json(&serde_json::to_value(&config)?)?;
                } else {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::Path => println!("{}", config_path.display()),
        },
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SHELFSCAN_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit(code: ExitCode) -> ! {
    std::process::exit(code as i32)
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_summary(summary: &RunSummary, start: Instant, json: bool) -> Result<()> {
    let dur = start.elapsed().as_millis();
    if json {
        print_json(&serde_json::json!({
            "status": "ok",
            "data": {
                "shelved": summary.shelved,
                "quarantined": summary.quarantined,
                "deferred": summary.deferred,
                "relocated": summary.relocated,
                "failed": summary.failed,
            },
            "meta": { "duration_ms": dur }
        }))
    } else {
        println!("{summary} ({dur} ms)");
        Ok(())
    }
}

fn open_store(config: &AppConfig) -> Result<LibraryStore> {
    let db_path = config.database_path();
    let schema_path = config.schema_path();
    LibraryStore::open_with_schema(&db_path, schema_path.as_deref())
        .with_context(|| format!("failed to open library {}", db_path.display()))
}

fn open_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    Orchestrator::from_config(config).context("failed to set up pipeline")
}
