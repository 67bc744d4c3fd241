//! Batch processing
//!
//! Runs jobs one after another, each with its own config. A job that fails
//! with a job-level error is recorded and the batch moves on; any other
//! error aborts the batch.

use crate::config::Config;
use crate::job::{CancelToken, JobOptions, JobResult, ProgressEvent, run_job};
use crate::types::*;
use std::fs;
use std::path::{Path, PathBuf};

/// One image to process
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJobSpec {
    pub input_image: PathBuf,
    pub config: Config,
    /// Output directory override for this job
    pub out_dir: Option<PathBuf>,
}

impl BatchJobSpec {
    pub fn new(input_image: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            input_image: input_image.into(),
            config,
            out_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    /// 1-based index of the running job
    pub current_job: usize,
    pub total_jobs: usize,
    /// File name of the running job's input
    pub job_name: String,
    /// Progress inside the job; `None` when the job is just starting
    pub job_progress: Option<ProgressEvent>,
}

#[derive(Debug)]
pub struct BatchJobResult {
    pub input_image: PathBuf,
    pub success: bool,
    pub result: Option<JobResult>,
    pub error: Option<SplitError>,
}

impl BatchJobResult {
    fn failed(input_image: PathBuf, error: SplitError) -> Self {
        Self {
            input_image,
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug)]
pub struct BatchResult {
    pub total_jobs: usize,
    pub successful_jobs: usize,
    pub failed_jobs: usize,
    pub results: Vec<BatchJobResult>,
}

/// Batch progress callback
pub type BatchProgressCallback<'a> = &'a mut dyn FnMut(&BatchProgress);

/// Run every job in order.
///
/// Once `cancel` is set, every job that has not started is recorded as a
/// cancelled failure.
pub fn run_batch(
    jobs: &[BatchJobSpec],
    mut on_progress: Option<BatchProgressCallback<'_>>,
    cancel: Option<&CancelToken>,
) -> Result<BatchResult> {
    let total_jobs = jobs.len();
    let mut results = Vec::with_capacity(total_jobs);

    for (position, spec) in jobs.iter().enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            log::warn!(
                "Batch cancelled; skipping {} remaining job(s)",
                total_jobs - position
            );
            results.extend(jobs[position..].iter().map(|remaining| {
                BatchJobResult::failed(
                    remaining.input_image.clone(),
                    SplitError::Cancelled("Batch cancelled".into()),
                )
            }));
            break;
        }

        let current_job = position + 1;
        let job_name = spec
            .input_image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(callback) = on_progress.as_deref_mut() {
            callback(&BatchProgress {
                current_job,
                total_jobs,
                job_name: job_name.clone(),
                job_progress: None,
            });
        }

        let mut forward = |event: &ProgressEvent| {
            if let Some(callback) = on_progress.as_deref_mut() {
                callback(&BatchProgress {
                    current_job,
                    total_jobs,
                    job_name: job_name.clone(),
                    job_progress: Some(event.clone()),
                });
            }
        };
        let options = JobOptions {
            out_dir: spec.out_dir.clone(),
            test_page: None,
        };

        match run_job(
            &spec.input_image,
            &spec.config,
            &options,
            Some(&mut forward),
            cancel,
        ) {
            Ok(result) => results.push(BatchJobResult {
                input_image: spec.input_image.clone(),
                success: true,
                result: Some(result),
                error: None,
            }),
            Err(error) if error.is_job_failure() => {
                log::warn!("Job {current_job}/{total_jobs} ({job_name}) failed: {error}");
                results.push(BatchJobResult::failed(spec.input_image.clone(), error));
            }
            Err(error) => return Err(error),
        }
    }

    let successful_jobs = results.iter().filter(|r| r.success).count();
    let failed_jobs = results.len() - successful_jobs;
    log::info!("Batch finished: {successful_jobs} succeeded, {failed_jobs} failed");

    Ok(BatchResult {
        total_jobs,
        successful_jobs,
        failed_jobs,
        results,
    })
}

/// Sorted `*.png` files in `dir`, optionally descending into subdirectories
pub fn find_images_in_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    collect_images(dir, recursive, &mut images)?;
    images.sort();
    Ok(images)
}

fn collect_images(dir: &Path, recursive: bool, images: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_images(&path, recursive, images)?;
            }
        } else if is_png(&path) {
            images.push(path);
        }
    }
    Ok(())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Config for one image: `<stem>_config.*`, then `<stem>.*` next to the
/// image (toml before json), else `default`. A file that fails to load is
/// skipped.
pub fn find_config_for_image(image: &Path, default: &Config) -> Config {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut extensions = vec!["json"];
    if cfg!(feature = "toml") {
        extensions.insert(0, "toml");
    }

    for name in [format!("{stem}_config"), stem] {
        for ext in &extensions {
            let candidate = image.with_file_name(format!("{name}.{ext}"));
            if !candidate.is_file() {
                continue;
            }
            match Config::load(&candidate) {
                Ok(cfg) => {
                    log::debug!("Using {} for {}", candidate.display(), image.display());
                    return cfg;
                }
                Err(e) => log::warn!("Ignoring {}: {e}", candidate.display()),
            }
        }
    }
    default.clone()
}

/// Expand files and directories into job specs, in input order.
///
/// Directories contribute their PNG files (sorted); other paths are kept only
/// when they are PNG files.
pub fn prepare_batch_jobs(
    paths: &[PathBuf],
    default: &Config,
    recursive: bool,
    auto_config: bool,
) -> Result<Vec<BatchJobSpec>> {
    let config_for = |image: &Path| {
        if auto_config {
            find_config_for_image(image, default)
        } else {
            default.clone()
        }
    };

    let mut jobs = Vec::new();
    for path in paths {
        if path.is_dir() {
            for image in find_images_in_directory(path, recursive)? {
                let config = config_for(&image);
                jobs.push(BatchJobSpec::new(image, config));
            }
        } else if path.is_file() && is_png(path) {
            jobs.push(BatchJobSpec::new(path.clone(), config_for(path)));
        }
    }
    Ok(jobs)
}
