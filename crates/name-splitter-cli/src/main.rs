use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use name_splitter::{Config, JobOptions, JobPhase, ProgressEvent, prepare_batch_jobs};
use name_splitter_runtime::{SplitUpdate, WorkerHandle, spawn_worker};
use std::path::{Path, PathBuf};

mod logger;

#[derive(Parser)]
#[command(name = "nsplit", about = "Split manuscript sheets into page images", version)]
struct Cli {
    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split one image into pages
    Run {
        /// Input image
        input: PathBuf,

        /// Config file (.json or .toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory (overrides output.out_dir)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Render only this 1-based page
        #[arg(long)]
        test_page: Option<usize>,
    },

    /// Split every image found in files and directories
    Batch {
        /// Input images and/or directories
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,

        /// Config used when an image has no config of its own
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Search directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Ignore per-image `<stem>_config` / `<stem>` config files
        #[arg(long)]
        no_auto_config: bool,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination (.json or .toml)
        output: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn log_job_progress(event: &ProgressEvent) {
    if event.phase == JobPhase::RenderPages && event.done > 0 {
        let eta = event
            .eta_seconds
            .map(|eta| format!(", eta {:.1}s", eta))
            .unwrap_or_default();
        log::info!(
            "{} {}/{} ({:.1} pages/s{})",
            event.phase,
            event.done,
            event.total,
            event.pages_per_second,
            eta
        );
    } else {
        log::debug!("{} {}/{} {}", event.phase, event.done, event.total, event.message);
    }
}

enum Event {
    Update(Option<SplitUpdate>),
    Interrupt,
}

/// Pump worker updates until the submitted task finishes; Ctrl-C cancels it
async fn wait_for_final(worker: &mut WorkerHandle) -> Result<SplitUpdate> {
    let mut cancelling = false;
    loop {
        let event = tokio::select! {
            update = worker.recv() => Event::Update(update),
            _ = tokio::signal::ctrl_c(), if !cancelling => Event::Interrupt,
        };
        match event {
            Event::Interrupt => {
                log::warn!("Interrupted, cancelling");
                worker.cancel()?;
                cancelling = true;
            }
            Event::Update(None) => bail!("Worker stopped unexpectedly"),
            Event::Update(Some(SplitUpdate::Progress { event, .. })) => log_job_progress(&event),
            Event::Update(Some(SplitUpdate::BatchProgress { progress, .. })) => {
                match &progress.job_progress {
                    Some(event) => log_job_progress(event),
                    None => log::info!(
                        "[{}/{}] {}",
                        progress.current_job,
                        progress.total_jobs,
                        progress.job_name
                    ),
                }
            }
            Event::Update(Some(update)) => return Ok(update),
        }
    }
}

async fn run_single(
    input: PathBuf,
    config: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    test_page: Option<usize>,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let options = JobOptions { out_dir, test_page };

    let mut worker = spawn_worker();
    worker.run_job(input, config, options)?;

    match wait_for_final(&mut worker).await? {
        SplitUpdate::JobComplete { result, .. } => {
            println!(
                "Split {} pages → {} ({:.2}s)",
                result.page_count,
                result.out_dir.display(),
                result.elapsed_seconds
            );
            println!("  Plan: {}", result.plan.manifest_path.display());
            if let Some(pdf) = &result.pdf_path {
                println!("  PDF: {}", pdf.display());
            }
            for warning in &result.merge_warnings {
                println!("  Warning: {}", warning);
            }
            Ok(())
        }
        SplitUpdate::Cancelled { message, .. } | SplitUpdate::Error { message, .. } => {
            bail!(message)
        }
        other => bail!("Unexpected worker update: {:?}", other),
    }
}

async fn run_many(
    paths: Vec<PathBuf>,
    config: Option<PathBuf>,
    recursive: bool,
    no_auto_config: bool,
) -> Result<()> {
    let default = load_config(config.as_deref())?;
    let jobs = prepare_batch_jobs(&paths, &default, recursive, !no_auto_config)?;
    if jobs.is_empty() {
        bail!("No PNG images found");
    }

    let mut worker = spawn_worker();
    worker.run_batch(jobs)?;

    match wait_for_final(&mut worker).await? {
        SplitUpdate::BatchComplete { report, .. } => {
            println!("Batch results:");
            for entry in &report.entries {
                match (&entry.out_dir, &entry.error) {
                    (Some(out_dir), _) => println!(
                        "  ok   {} → {} ({} pages)",
                        entry.input_image.display(),
                        out_dir.display(),
                        entry.page_count
                    ),
                    (None, error) => println!(
                        "  fail {}: {}",
                        entry.input_image.display(),
                        error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
            println!(
                "  {} succeeded, {} failed",
                report.successful_jobs, report.failed_jobs
            );
            if report.failed_jobs > 0 {
                bail!("{} of {} jobs failed", report.failed_jobs, report.total_jobs);
            }
            Ok(())
        }
        SplitUpdate::Cancelled { message, .. } | SplitUpdate::Error { message, .. } => {
            bail!(message)
        }
        other => bail!("Unexpected worker update: {:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::CliLogger::new(logger::level_from_flags(cli.verbose, cli.quiet)).init()?;

    match cli.command {
        Commands::Run {
            input,
            config,
            out_dir,
            test_page,
        } => run_single(input, config, out_dir, test_page).await?,

        Commands::Batch {
            paths,
            config,
            recursive,
            no_auto_config,
        } => run_many(paths, config, recursive, no_auto_config).await?,

        Commands::InitConfig { output } => {
            Config::default().save(&output)?;
            println!("Wrote default config → {}", output.display());
        }
    }

    Ok(())
}
