use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

mod worker;

// Re-export types from the core library
pub use name_splitter::{
    BatchJobSpec, BatchProgress, BatchResult, CancelToken, Config, JobOptions, JobResult,
    ProgressEvent,
};

/// Commands sent from a host to the worker
#[derive(Debug)]
pub enum SplitCommand {
    RunJob {
        id: TaskId,
        input: PathBuf,
        config: Box<Config>,
        options: JobOptions,
    },
    RunBatch {
        id: TaskId,
        jobs: Vec<BatchJobSpec>,
    },
    /// Cancel all work submitted before this command
    Cancel,
}

/// Updates sent from the worker to a host
#[derive(Debug, Clone)]
pub enum SplitUpdate {
    Progress {
        id: TaskId,
        event: ProgressEvent,
    },
    BatchProgress {
        id: TaskId,
        progress: BatchProgress,
    },
    JobComplete {
        id: TaskId,
        result: Box<JobResult>,
    },
    BatchComplete {
        id: TaskId,
        report: BatchReport,
    },
    Cancelled {
        id: TaskId,
        message: String,
    },
    Error {
        id: TaskId,
        message: String,
    },
}

impl SplitUpdate {
    /// Task this update belongs to
    pub fn id(&self) -> TaskId {
        match self {
            SplitUpdate::Progress { id, .. }
            | SplitUpdate::BatchProgress { id, .. }
            | SplitUpdate::JobComplete { id, .. }
            | SplitUpdate::BatchComplete { id, .. }
            | SplitUpdate::Cancelled { id, .. }
            | SplitUpdate::Error { id, .. } => *id,
        }
    }

    /// Whether no further updates follow for this task
    pub fn is_final(&self) -> bool {
        !matches!(
            self,
            SplitUpdate::Progress { .. } | SplitUpdate::BatchProgress { .. }
        )
    }
}

/// Handle to a submitted job or batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// Per-job outcome of a finished batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReportEntry {
    pub input_image: PathBuf,
    pub success: bool,
    pub out_dir: Option<PathBuf>,
    pub page_count: usize,
    pub error: Option<String>,
}

/// Sendable summary of a [`BatchResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub total_jobs: usize,
    pub successful_jobs: usize,
    pub failed_jobs: usize,
    pub entries: Vec<BatchReportEntry>,
}

impl From<&BatchResult> for BatchReport {
    fn from(result: &BatchResult) -> Self {
        let entries = result
            .results
            .iter()
            .map(|job| BatchReportEntry {
                input_image: job.input_image.clone(),
                success: job.success,
                out_dir: job.result.as_ref().map(|r| r.out_dir.clone()),
                page_count: job.result.as_ref().map_or(0, |r| r.page_count),
                error: job.error.as_ref().map(ToString::to_string),
            })
            .collect();
        BatchReport {
            total_jobs: result.total_jobs,
            successful_jobs: result.successful_jobs,
            failed_jobs: result.failed_jobs,
            entries,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Worker has shut down")]
    Closed,
}

/// Host side of a running worker
pub struct WorkerHandle {
    command_tx: mpsc::UnboundedSender<SplitCommand>,
    update_rx: mpsc::UnboundedReceiver<SplitUpdate>,
    next_id: u64,
}

impl WorkerHandle {
    pub fn run_job(
        &mut self,
        input: impl Into<PathBuf>,
        config: Config,
        options: JobOptions,
    ) -> Result<TaskId, WorkerError> {
        let id = self.allocate_id();
        self.send(SplitCommand::RunJob {
            id,
            input: input.into(),
            config: Box::new(config),
            options,
        })?;
        Ok(id)
    }

    pub fn run_batch(&mut self, jobs: Vec<BatchJobSpec>) -> Result<TaskId, WorkerError> {
        let id = self.allocate_id();
        self.send(SplitCommand::RunBatch { id, jobs })?;
        Ok(id)
    }

    pub fn cancel(&self) -> Result<(), WorkerError> {
        self.send(SplitCommand::Cancel)
    }

    pub fn send(&self, command: SplitCommand) -> Result<(), WorkerError> {
        self.command_tx
            .send(command)
            .map_err(|_| WorkerError::Closed)
    }

    /// Next update, or `None` once the worker has stopped
    pub async fn recv(&mut self) -> Option<SplitUpdate> {
        self.update_rx.recv().await
    }

    /// Non-blocking poll, for hosts with their own event loop
    pub fn try_recv(&mut self) -> Option<SplitUpdate> {
        self.update_rx.try_recv().ok()
    }

    fn allocate_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }
}

/// Spawn the worker on the current tokio runtime.
///
/// Jobs and batches run one at a time, in submission order, on the blocking
/// thread pool. The worker stops once the handle is dropped and queued work
/// has finished.
pub fn spawn_worker() -> WorkerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker::worker_task(command_rx, update_tx));
    WorkerHandle {
        command_tx,
        update_rx,
        next_id: 0,
    }
}
