use std::path::PathBuf;

use name_splitter::{
    BatchJobSpec, BatchProgress, CancelToken, Config, JobOptions, ProgressEvent, SplitError,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{BatchReport, SplitCommand, SplitUpdate, TaskId, WorkerError};

type UpdateSender = mpsc::UnboundedSender<SplitUpdate>;

/// Async worker task that processes split commands and sends updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<SplitCommand>,
    update_tx: UpdateSender,
) {
    // Shared by everything submitted since the last Cancel
    let mut cancel = CancelToken::new();
    let mut previous: Option<JoinHandle<()>> = None;

    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            SplitCommand::RunJob {
                id,
                input,
                config,
                options,
            } => {
                log::debug!("Queued job {:?} for {}", id, input.display());
                let work = handle_job(
                    id,
                    input,
                    *config,
                    options,
                    cancel.clone(),
                    update_tx.clone(),
                );
                previous = Some(chain(previous.take(), work));
            }
            SplitCommand::RunBatch { id, jobs } => {
                log::debug!("Queued batch {:?} with {} jobs", id, jobs.len());
                let work = handle_batch(id, jobs, cancel.clone(), update_tx.clone());
                previous = Some(chain(previous.take(), work));
            }
            SplitCommand::Cancel => {
                log::info!("Cancelling queued and running work");
                cancel.cancel();
                cancel = CancelToken::new();
            }
        }
    }

    // Host dropped the handle; let queued work drain
    if let Some(last) = previous {
        if let Err(e) = last.await {
            log::error!("Worker task failed: {}", e);
        }
    }
}

/// Run `work` after `previous` has finished
fn chain<F>(previous: Option<JoinHandle<()>>, work: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Some(previous) = previous {
            if let Err(e) = previous.await {
                log::error!("Worker task failed: {}", e);
            }
        }
        work.await;
    })
}

async fn handle_job(
    id: TaskId,
    input: PathBuf,
    config: Config,
    options: JobOptions,
    cancel: CancelToken,
    update_tx: UpdateSender,
) {
    let progress_tx = update_tx.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let mut on_progress = |event: &ProgressEvent| {
            let _ = progress_tx.send(SplitUpdate::Progress {
                id,
                event: event.clone(),
            });
        };
        name_splitter::run_job(
            &input,
            &config,
            &options,
            Some(&mut on_progress),
            Some(&cancel),
        )
    })
    .await;

    let update = match outcome {
        Ok(Ok(result)) => {
            log::info!(
                "Job {:?} wrote {} pages to {}",
                id,
                result.page_count,
                result.out_dir.display()
            );
            SplitUpdate::JobComplete {
                id,
                result: Box::new(result),
            }
        }
        Ok(Err(e)) => failure(id, &e),
        Err(e) => join_failure(id, e.into()),
    };
    let _ = update_tx.send(update);
}

async fn handle_batch(
    id: TaskId,
    jobs: Vec<BatchJobSpec>,
    cancel: CancelToken,
    update_tx: UpdateSender,
) {
    let progress_tx = update_tx.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let mut on_progress = |progress: &BatchProgress| {
            let _ = progress_tx.send(SplitUpdate::BatchProgress {
                id,
                progress: progress.clone(),
            });
        };
        name_splitter::run_batch(&jobs, Some(&mut on_progress), Some(&cancel))
    })
    .await;

    let update = match outcome {
        Ok(Ok(result)) => {
            log::info!(
                "Batch {:?} finished: {}/{} succeeded",
                id,
                result.successful_jobs,
                result.total_jobs
            );
            SplitUpdate::BatchComplete {
                id,
                report: BatchReport::from(&result),
            }
        }
        Ok(Err(e)) => failure(id, &e),
        Err(e) => join_failure(id, e.into()),
    };
    let _ = update_tx.send(update);
}

fn failure(id: TaskId, error: &SplitError) -> SplitUpdate {
    if error.is_cancelled() {
        log::info!("Task {:?} cancelled", id);
        SplitUpdate::Cancelled {
            id,
            message: error.to_string(),
        }
    } else {
        log::error!("Task {:?} failed: {}", id, error);
        SplitUpdate::Error {
            id,
            message: error.to_string(),
        }
    }
}

fn join_failure(id: TaskId, error: WorkerError) -> SplitUpdate {
    log::error!("Task {:?} failed: {}", id, error);
    SplitUpdate::Error {
        id,
        message: error.to_string(),
    }
}
