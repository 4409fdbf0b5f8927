//! # DreamBank CLI Application
//!
//! This module implements the command-line interface for the dreambank
//! crate: building a curated snapshot from the live site and reading
//! published snapshots back.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `curate`: Download source pages and write curated files and registries
//!   - `list`: Series available in a snapshot
//!   - `dreams`: Dream reports of one series
//!   - `info`: Metadata of one series
//!
//! Reading commands use a published version by default; `--data-dir` switches
//! them to a local curated directory verified against `--registry`.

mod telemetry;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dreambank::access::{AccessConfig, CURRENT_VERSION, Repository};
use dreambank::curation::{CurationConfig, Curator, Progress, Step, TableFormat};
use dreambank::dataset::{DetailSection, DreamRecord, strip_parens};
use dreambank::source::SourceConfig;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Scrape, curate and read DreamBank dream reports", long_about = None)]
struct Cli {
    /// Log progress details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the curated snapshot from the live site
    Curate(CurateArgs),

    /// List the series in a snapshot
    List(ListArgs),

    /// Print the dream reports of a series
    Dreams(DreamsArgs),

    /// Print the metadata of a series
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct CurateArgs {
    /// Steps to run (source, tables)
    #[arg(required = true)]
    steps: Vec<Step>,

    /// Replace existing files
    #[arg(short, long)]
    overwrite: bool,

    /// Directory for curated tables and info files
    #[arg(long, default_value = "datasets")]
    data_dir: PathBuf,

    /// Registry of downloaded source pages
    #[arg(long, default_value = "registry-source.txt")]
    source_registry: PathBuf,

    /// Registry of curated files
    #[arg(long, default_value = "registry.txt")]
    registry: PathBuf,

    /// Table format (tsv|csv)
    #[arg(short, long, default_value = "tsv")]
    format: TableFormat,

    /// Skip the further-analyses pages
    #[arg(long)]
    no_details: bool,
}

#[derive(Args, Debug)]
struct RepositoryArgs {
    /// Snapshot version
    #[arg(long = "version", default_value = CURRENT_VERSION)]
    snapshot: String,

    /// Read from a local curated directory instead of a published version
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Local registry of curated files; defaults to `registry.txt` with
    /// `--data-dir`, and to the published registry otherwise
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[command(flatten)]
    repository: RepositoryArgs,
}

#[derive(Args, Debug)]
struct DreamsArgs {
    /// Series identifier
    #[arg(required = true)]
    id: String,

    #[command(flatten)]
    repository: RepositoryArgs,

    /// Limit results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Series identifier
    #[arg(required = true)]
    id: String,

    #[command(flatten)]
    repository: RepositoryArgs,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_tracing_subscriber(cli.verbose);

    match cli.command {
        Some(Commands::Curate(args)) => curate_command(args).await?,
        Some(Commands::List(args)) => list_command(args).await?,
        Some(Commands::Dreams(args)) => dreams_command(args).await?,
        Some(Commands::Info(args)) => info_command(args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["dreambank", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn curate_command(args: CurateArgs) -> anyhow::Result<()> {
    let config = CurationConfig::builder()
        .source(SourceConfig::builder().from_env().build())
        .data_dir(args.data_dir)
        .source_registry_path(args.source_registry)
        .curated_registry_path(args.registry)
        .overwrite(args.overwrite)
        .table_format(args.format)
        .include_details(!args.no_details)
        .build();

    let (progress_sender, mut progress_receiver) = mpsc::channel::<Progress>(100);
    let curator = Curator::new(config)?.with_progress(progress_sender);

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );

    // Spawn a task to process progress updates
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(progress) = progress_receiver.recv().await {
                progress_bar.set_length(progress.total as u64);
                progress_bar.set_position(progress.done as u64);
                progress_bar.set_message(format!("{}: {}", progress.step, progress.dataset));
            }
        }
    });

    let start_time = std::time::Instant::now();
    let summary = curator.run(&args.steps).await;

    // The channel closes once the curator is dropped
    drop(curator);
    progress_handle.await?;
    close_progress(&progress_bar, summary.is_ok());
    let summary = summary?;

    println!(
        "Curated {} series in {:.1?}: {} source pages, {} dreams",
        summary.datasets,
        start_time.elapsed(),
        summary.source_files,
        summary.dreams
    );
    Ok(())
}

/// Finish the bar on success; leave it where it stopped on failure
fn close_progress(progress_bar: &ProgressBar, succeeded: bool) {
    if succeeded {
        progress_bar.finish_with_message("Curation completed");
    } else {
        progress_bar.abandon_with_message("Curation failed");
    }
}

async fn open_repository(args: &RepositoryArgs) -> anyhow::Result<Repository> {
    let repository = match &args.data_dir {
        Some(data_dir) => {
            let registry = args
                .registry
                .clone()
                .unwrap_or_else(|| PathBuf::from("registry.txt"));
            Repository::local(data_dir, &registry)
                .await
                .with_context(|| format!("Cannot open local data in {}", data_dir.display()))?
        }
        None => {
            let mut config = AccessConfig::for_version(&args.snapshot);
            config.registry_path = args.registry.clone();
            if let Some(cache_dir) = std::env::var_os("DREAMBANK_CACHE_DIR") {
                config.cache_dir = PathBuf::from(cache_dir);
            }
            Repository::open(config)
                .await
                .with_context(|| format!("Cannot open snapshot {}", args.snapshot))?
        }
    };
    info!("Opened snapshot {}", repository.version());
    Ok(repository)
}

#[instrument]
async fn list_command(args: ListArgs) -> anyhow::Result<()> {
    let repository = open_repository(&args.repository).await?;
    let ids = repository.available_datasets();

    println!("Series in {}: {}", repository.version(), ids.len());
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

#[instrument]
async fn dreams_command(args: DreamsArgs) -> anyhow::Result<()> {
    let repository = open_repository(&args.repository).await?;
    let table = repository.read_dreams(&args.id).await?;
    let limit = args.limit.unwrap_or(table.len());
    let records: Vec<&DreamRecord> = table.iter().take(limit).collect();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in records {
            match &record.date {
                Some(date) => println!("#{} ({})", record.n, strip_parens(date)),
                None => println!("#{}", record.n),
            }
            println!("{}", record.dream);
            println!();
        }
    }
    Ok(())
}

#[instrument]
async fn info_command(args: InfoArgs) -> anyhow::Result<()> {
    let repository = open_repository(&args.repository).await?;

    if args.format == "json" {
        let info = repository.read_info_map(&args.id).await?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let info = repository.read_info(&args.id).await?;
    println!("{} ({})", info.long_name, info.short_name);
    println!("Dreams: {}", info.n_dreams);
    println!("Timeframe: {}", info.timeframe);
    println!("Sex: {}", info.sex);
    println!();
    println!("{}", info.description);
    for section in &info.details {
        print_section(section, 1);
    }
    Ok(())
}

fn print_section(section: &DetailSection, depth: usize) {
    println!();
    if let Some(title) = &section.title {
        println!("{} {}", "#".repeat(depth), title);
    }
    for field in &section.fields {
        println!("{}: {}", field.name, field.value);
    }
    for paragraph in &section.paragraphs {
        println!("{}", paragraph);
    }
    for subsection in &section.subsections {
        print_section(subsection, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_progress_reports_outcome() {
        let done = ProgressBar::hidden();
        close_progress(&done, true);
        assert!(done.is_finished());
        assert_eq!(done.message(), "Curation completed");

        let failed = ProgressBar::hidden();
        failed.set_message("tables: alta");
        close_progress(&failed, false);
        assert!(failed.is_finished());
        assert_eq!(failed.message(), "Curation failed");
    }

    #[test]
    fn test_registry_is_optional() {
        let cli = Cli::parse_from(["dreambank", "list", "--version", "v0"]);
        match cli.command {
            Some(Commands::List(args)) => {
                assert_eq!(args.repository.snapshot, "v0");
                assert!(args.repository.registry.is_none());
            }
            _ => panic!("Expected list command"),
        }
    }
}
