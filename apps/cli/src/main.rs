use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use coursevault_core::{
    Config, Credentials,
    embed::OpenAiEmbedder,
    events::BusConfig,
    layout::media_blob_ref,
    media::{
        FfmpegExtractor, WhisperTranscriber, ensure_model, model::default_model_dir,
        silence_native_logs,
    },
    storage::{open_store, upload_file},
    types::MediaKind,
    vector::{PineconeClient, ensure_index},
};
use tracing_subscriber::EnvFilter;

use crate::{
    pipeline::{Services, start_pipeline},
    workers::events::{IngestionCompleted, SkippedItem},
};

mod pipeline;
mod workers;

const DEFAULT_LOG_FILTER: &str = "coursevault=info,coursevault_core=info";
const VERBOSE_LOG_FILTER: &str = "coursevault=debug,coursevault_core=debug";

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

#[derive(Parser)]
#[command(name = "coursevault")]
#[command(
    about = "Transcribe class videos, partition class documents and ingest them into a per-class vector index"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for one class upload
    Run {
        /// Class name, e.g. "Intro Bio"
        #[arg(long)]
        class: String,

        /// Video blob path (repeatable), e.g. "Intro_Bio_MP4s/lecture1.mp4"
        #[arg(long = "video")]
        videos: Vec<String>,

        /// PDF blob path (repeatable), e.g. "Intro_Bio_PDFs/syllabus.pdf"
        #[arg(long = "pdf")]
        pdfs: Vec<String>,

        /// Print the terminal event as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Upload local class files into their type folders
    Upload {
        #[arg(long)]
        class: String,

        /// Local files; .pdf and .mp4 are routed to the class folders, anything else to Other/
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Run the pipeline over the uploaded videos and PDFs
        #[arg(long)]
        ingest: bool,
    },
    /// Create the class's vector index if missing and wait until it is ready
    Provision {
        #[arg(long)]
        class: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_ref())?;

    // Validate secrets early
    let credentials = match Credentials::from_env(&config) {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Run {
            class,
            videos,
            pdfs,
            json,
        } => run(&config, &credentials, class, videos, pdfs, json).await,
        Command::Upload {
            class,
            files,
            ingest,
        } => upload(&config, &credentials, class, files, ingest).await,
        Command::Provision { class } => provision(&config, &credentials, &class).await,
    }
}

async fn upload(
    config: &Config,
    credentials: &Credentials,
    class: String,
    files: Vec<PathBuf>,
    ingest: bool,
) -> Result<()> {
    let store = open_store(config, credentials)?;
    let mut videos = Vec::new();
    let mut pdfs = Vec::new();

    for file in &files {
        let blob = media_blob_ref(&class, file);
        upload_file(store.as_ref(), file, &blob.path, true)
            .await
            .with_context(|| format!("failed to upload {}", file.display()))?;
        println!(
            "{} {} → {}",
            style("✓").green().bold(),
            file.display(),
            style(&blob.path).cyan()
        );

        match blob.kind {
            MediaKind::Video => videos.push(blob.path),
            MediaKind::Pdf => pdfs.push(blob.path),
            MediaKind::Other => {
                tracing::info!(blob = %blob.path, "not a video or PDF, left out of ingestion")
            }
        }
    }

    if ingest {
        run(config, credentials, class, videos, pdfs, false).await
    } else {
        Ok(())
    }
}

async fn provision(config: &Config, credentials: &Credentials, class: &str) -> Result<()> {
    let index = PineconeClient::new(&config.index, credentials.pinecone_api_key.clone());
    let handle = ensure_index(&index, class, &config.index).await?;

    println!(
        "{} Index {} ready {}",
        style("✓").green().bold(),
        style(&handle.name).cyan(),
        style(if handle.created { "(created)" } else { "(existing)" }).dim()
    );
    Ok(())
}

async fn run(
    config: &Config,
    credentials: &Credentials,
    class: String,
    videos: Vec<String>,
    pdfs: Vec<String>,
    json: bool,
) -> Result<()> {
    println!(
        "\n{}  {}\n",
        style("coursevault").cyan().bold(),
        style(&class).dim()
    );

    silence_native_logs();
    let model_dir = config
        .whisper
        .model_dir
        .clone()
        .unwrap_or_else(default_model_dir);
    let model_path = ensure_model(&model_dir, &config.whisper.model_name).await?;
    let speech = WhisperTranscriber::load(&model_path, config.whisper.use_gpu)?;
    println!("{} Model loaded", style("✓").green().bold());

    let services = Services {
        store: open_store(config, credentials)?,
        extractor: Arc::new(FfmpegExtractor::new()),
        speech: Arc::new(speech),
        embedder: Arc::new(OpenAiEmbedder::new(
            &config.embedding,
            credentials.openai_api_key.clone(),
            config.index.dimension as usize,
        )),
        index: Arc::new(PineconeClient::new(
            &config.index,
            credentials.pinecone_api_key.clone(),
        )),
    };

    let started = Instant::now();
    let handle = start_pipeline(BusConfig::default(), services, config).await?;
    let submitted = handle.submit(&class, videos, pdfs);
    println!("{}", style("─".repeat(60)).dim());

    let outcome = submitted.outcome.await;
    handle.shutdown();
    let outcome = outcome.context("pipeline stopped without reporting an outcome")?;

    match outcome {
        Ok(completed) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&completed)?);
            } else {
                print_summary(&completed, started.elapsed());
            }
            Ok(())
        }
        Err(failed) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&failed)?);
            }
            eprintln!(
                "{} stage {} failed after {} attempt(s): {}",
                style("Error:").red().bold(),
                style(failed.stage).yellow(),
                failed.attempts,
                failed.message
            );
            std::process::exit(1);
        }
    }
}

fn print_summary(completed: &IngestionCompleted, elapsed: Duration) {
    let summary = &completed.summary;
    let added = summary.vectors_added();

    println!(
        "{} Ingested {} document(s) into {}",
        style("✓").green().bold(),
        summary.documents.succeeded().count(),
        style(&summary.index_name).cyan()
    );
    let added_line = format!(
        "{} → {} vectors (+{})",
        summary.vectors_before, summary.vectors_after, added
    );
    if added == 0 {
        println!("{} {}", style("!").yellow().bold(), style(added_line).yellow());
    } else {
        println!("{} {}", style("✓").green().bold(), added_line);
    }

    if !completed.skipped.is_empty() {
        println!(
            "\n{} {} item(s) skipped:",
            style("!").yellow().bold(),
            completed.skipped.len()
        );
        for SkippedItem {
            stage,
            item,
            reason,
        } in &completed.skipped
        {
            println!("  {} {} {}", style(stage).dim(), item, style(reason).dim());
        }
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{} {}",
        style("Total time:").dim(),
        style(format_duration(elapsed)).cyan().bold()
    );
}
