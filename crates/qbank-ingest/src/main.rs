//! qbank Ingest - question bank ingestion tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use qbank_common::logging::{init_logging, LogConfig, LogLevel};
use qbank_ingest::config::IngestConfig;
use qbank_ingest::coverage;
use qbank_ingest::source::CandidateEnumerator;
use qbank_ingest::{
    Collection, DocumentStore, Language, LeetCodeProvider, MemoryDocumentStore, PgDocumentStore,
    RecordKind, RunCoordinator, RunOptions, RunReport, SolutionDirectoryProvider,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Missing keys printed by `coverage`
const COVERAGE_PREVIEW: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "qbank-ingest")]
#[command(author, version, about = "Incremental question bank ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write to an in-memory store instead of PostgreSQL
    #[arg(long, global = true)]
    dry_run: bool,

    /// Show a progress bar per collection
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest problem metadata from the question site
    Metadata {
        /// Consider at most N questions
        #[arg(long)]
        limit: Option<usize>,

        /// Records per write
        #[arg(long)]
        batch_size: Option<usize>,

        /// Target collection (defaults to QBANK_METADATA_COLLECTION)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Ingest solution code from a local solutions tree
    Solutions {
        /// Solutions root (defaults to QBANK_SOLUTIONS_DIR)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Languages to ingest; all when omitted
        #[arg(short, long = "language")]
        languages: Vec<Language>,

        /// Consider at most N candidates per language
        #[arg(long)]
        limit: Option<usize>,

        /// Records per write
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Report which listed questions are missing from the metadata collection
    Coverage {
        /// Collection to check (defaults to QBANK_METADATA_COLLECTION)
        #[arg(long)]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::default()
        .with_level(log_level)
        .with_file_prefix("qbank-ingest")
        .merge_env()?;
    init_logging(&log_config)?;

    let config = IngestConfig::from_env(!cli.dry_run).context("Invalid configuration")?;
    let store = open_store(&config, cli.dry_run).await?;

    match cli.command {
        Command::Metadata {
            limit,
            batch_size,
            collection,
        } => {
            let provider = LeetCodeProvider::new(&config.source_url, config.http_timeout())
                .context("Failed to build HTTP client")?;
            let collection =
                Collection::metadata(collection.unwrap_or_else(|| config.metadata_collection.clone()));
            let options = run_options(&config, RecordKind::Metadata, batch_size, limit, cli.progress);

            let report = RunCoordinator::new(collection, Arc::new(provider), store)
                .with_options(options)
                .run()
                .await;
            log_report(&report);
            report.into_result()?;
        },
        Command::Solutions {
            root,
            languages,
            limit,
            batch_size,
        } => {
            let Some(root) = root.or_else(|| config.solutions_dir.clone()) else {
                bail!("No solutions root given; pass --root or set QBANK_SOLUTIONS_DIR");
            };
            let languages = if languages.is_empty() {
                Language::ALL.to_vec()
            } else {
                languages
            };
            info!(root = %root.display(), ?languages, "Ingesting solutions");

            let runs = languages.into_iter().map(|language| {
                let provider = SolutionDirectoryProvider::for_language(root.clone(), language);
                let options =
                    run_options(&config, RecordKind::Solution, batch_size, limit, cli.progress);
                RunCoordinator::new(
                    Collection::solutions(language),
                    Arc::new(provider),
                    store.clone(),
                )
                .with_options(options)
                .run()
            });
            let reports = join_all(runs).await;

            for report in &reports {
                log_report(report);
            }
            let aborted = reports.iter().filter(|r| !r.is_success()).count();
            if aborted > 0 {
                bail!("{aborted} of {} solution runs aborted", reports.len());
            }
        },
        Command::Coverage { collection } => {
            let provider = LeetCodeProvider::new(&config.source_url, config.http_timeout())
                .context("Failed to build HTTP client")?;
            let collection =
                Collection::metadata(collection.unwrap_or_else(|| config.metadata_collection.clone()));

            let expected = CandidateEnumerator::open(&provider)
                .await
                .context("Failed to list questions")?
                .map(|candidate| candidate.key);
            let report = coverage::verify(store.as_ref(), &collection, expected).await?;

            println!("{report}");
            if !report.is_complete() {
                let preview: Vec<String> = report
                    .missing
                    .iter()
                    .take(COVERAGE_PREVIEW)
                    .map(ToString::to_string)
                    .collect();
                println!("Missing: {}", preview.join(", "));
                if report.missing.len() > COVERAGE_PREVIEW {
                    println!("... and {} more", report.missing.len() - COVERAGE_PREVIEW);
                }
            }
        },
    }

    info!("Ingestion complete");
    Ok(())
}

async fn open_store(config: &IngestConfig, dry_run: bool) -> Result<Arc<dyn DocumentStore>> {
    if dry_run {
        warn!("Dry run: records are written to an in-memory store and discarded");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    }

    let Some(db) = &config.database else {
        bail!("DATABASE_URL is required unless --dry-run is given");
    };
    let store = PgDocumentStore::connect(db)
        .await
        .context("Failed to connect to database")?;
    Ok(Arc::new(store))
}

fn run_options(
    config: &IngestConfig,
    kind: RecordKind,
    batch_size: Option<usize>,
    limit: Option<usize>,
    show_progress: bool,
) -> RunOptions {
    let mut options = config.run_options(kind);
    if let Some(size) = batch_size {
        options.batch_size = size;
    }
    options.limit = limit;
    options.show_progress = show_progress;
    options
}

fn log_report(report: &RunReport) {
    let elapsed_secs = report.elapsed().num_milliseconds() as f64 / 1000.0;
    match &report.error {
        None => info!(
            collection = %report.collection,
            state = %report.final_state,
            elapsed_secs,
            "{}",
            report.stats
        ),
        Some(e) => error!(
            collection = %report.collection,
            state = %report.final_state,
            elapsed_secs,
            error = %e,
            "{}",
            report.stats
        ),
    }
}
