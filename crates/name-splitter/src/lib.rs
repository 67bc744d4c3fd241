pub mod batch;
pub mod config;
pub mod constants;
mod export;
pub mod job;
pub mod layout;
pub mod merge;
pub mod raster;
pub mod render;
pub mod source;
mod types;

pub use batch::{
    BatchJobResult, BatchJobSpec, BatchProgress, BatchProgressCallback, BatchResult,
    find_config_for_image, find_images_in_directory, prepare_batch_jobs, run_batch,
};
pub use config::{
    Config, GridConfig, InputConfig, LimitsConfig, MergeConfig, MergeRule, OutputConfig,
    RuleTarget,
};
pub use export::export_pdf;
pub use job::{
    CancelToken, JobOptions, JobPhase, JobResult, ProgressCallback, ProgressEvent,
    run_job, run_job_with_reader,
};
pub use layout::{CellRect, compute_cells};
pub use merge::{LayerRef, MergeResult, apply_merge_rules};
pub use raster::ImageData;
pub use render::{RenderPlan, RenderedPage, render_pages, write_plan};
pub use source::{DocumentReader, LayerKind, LayerNode, LayerPixels, RasterReader, SourceDocument};
pub use types::*;
