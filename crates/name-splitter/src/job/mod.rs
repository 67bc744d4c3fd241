//! Job orchestration
//!
//! A job runs one source document through the whole pipeline:
//! load, limits, merge, grid, plan, render and (for PDF containers) export.
//! Progress is reported before and after each stage, and the cancel token
//! is polled between stages.

mod progress;
mod select;

pub use progress::{CancelToken, JobPhase, ProgressCallback, ProgressEvent};
pub use select::select_pages;

use crate::config::{Config, LimitsConfig};
use crate::constants::OUT_DIR_SUFFIX;
use crate::export::export_pdf;
use crate::layout::compute_cells;
use crate::merge::{MergeResult, apply_merge_rules, composite_all};
use crate::render::{RenderPlan, RenderedPage, render_pages, write_plan};
use crate::source::{DocumentReader, RasterReader};
use crate::types::*;
use progress::Reporter;
use std::path::{Path, PathBuf};

/// Per-run overrides that are not part of the config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOptions {
    /// Output directory; wins over `output.out_dir`
    pub out_dir: Option<PathBuf>,
    /// Render only this 1-based page
    pub test_page: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub out_dir: PathBuf,
    pub page_count: usize,
    pub plan: RenderPlan,
    pub pages: Vec<RenderedPage>,
    pub merge_warnings: Vec<String>,
    pub elapsed_seconds: f64,
    pub pdf_path: Option<PathBuf>,
}

/// Run a job on a flat raster file.
pub fn run_job(
    input: &Path,
    cfg: &Config,
    options: &JobOptions,
    on_progress: Option<ProgressCallback<'_>>,
    cancel: Option<&CancelToken>,
) -> Result<JobResult> {
    run_job_with_reader(&RasterReader, input, cfg, options, on_progress, cancel)
}

/// Run a job, reading the source through `reader`.
pub fn run_job_with_reader(
    reader: &dyn DocumentReader,
    input: &Path,
    cfg: &Config,
    options: &JobOptions,
    on_progress: Option<ProgressCallback<'_>>,
    cancel: Option<&CancelToken>,
) -> Result<JobResult> {
    let mut reporter = Reporter::new(on_progress);
    let check_cancel = || match cancel {
        Some(token) if token.is_cancelled() => Err(SplitError::Cancelled("Job cancelled".into())),
        _ => Ok(()),
    };

    cfg.validate()?;
    check_cancel()?;

    // Load
    reporter.report(JobPhase::LoadImage, 0, 1, "Reading image");
    let document = reader.read(input)?;
    let canvas_size = (document.width, document.height);
    enforce_limits(document.width, document.height, &cfg.limits)?;
    reporter.report(JobPhase::LoadImage, 1, 1, "Image loaded");
    log::debug!(
        "Loaded {} ({}x{}, {} top-level layer(s))",
        input.display(),
        document.width,
        document.height,
        document.layers.len()
    );
    check_cancel()?;

    // Merge
    reporter.report(JobPhase::Merge, 0, 1, "Merging layers");
    let merge = if cfg.merge.has_rules() {
        apply_merge_rules(&document.layers, &cfg.merge, Some(canvas_size))
    } else {
        let image = composite_all(
            &document.layers,
            cfg.merge.include_hidden_layers,
            canvas_size,
        );
        MergeResult::single(cfg.output.primary_layer(), image)
    };
    drop(document);
    reporter.report(
        JobPhase::Merge,
        1,
        1,
        format!("Merged into {} layer(s)", merge.output_images.len()),
    );
    check_cancel()?;

    // Grid
    reporter.report(JobPhase::Grid, 0, 1, "Computing grid");
    let cells = compute_cells(canvas_size.0, canvas_size.1, &cfg.grid)?;
    let selected = select_pages(
        cells.len(),
        options.test_page,
        &cfg.output.skip_pages,
        cfg.output.odd_even,
    )?;
    reporter.report(JobPhase::Grid, 1, 1, "Grid computed");
    log::debug!(
        "{} cell(s), {} selected for rendering",
        cells.len(),
        selected.len()
    );
    check_cancel()?;

    // Plan
    let out_dir = resolve_out_dir(input, cfg, options.out_dir.as_deref());
    reporter.report(JobPhase::RenderPlan, 0, 1, "Writing plan");
    let plan = write_plan(&out_dir, canvas_size, &cells, cfg, &selected, Some(&merge))?;
    reporter.report(
        JobPhase::RenderPlan,
        1,
        1,
        format!("Plan written: {}", plan.manifest_path.display()),
    );
    check_cancel()?;

    // Render
    let total = selected.len();
    reporter.report(JobPhase::RenderPages, 0, total, "Rendering pages");
    let pages = render_pages(&out_dir, &cells, cfg, &selected, &merge, |page, done, total| {
        reporter.report(
            JobPhase::RenderPages,
            done,
            total,
            format!("Rendered page {}", page.page_number),
        );
    })?;
    reporter.report(JobPhase::RenderPages, total, total, "Pages rendered");
    check_cancel()?;

    // Export
    let pdf_path = match cfg.output.container {
        ContainerFormat::Png => None,
        ContainerFormat::Pdf => {
            reporter.report(JobPhase::Export, 0, 1, "Exporting PDF");
            let path = pdf_output_path(&out_dir);
            let dpi = match cfg.output.output_dpi {
                0 => cfg.grid.dpi,
                dpi => dpi,
            };
            export_pdf(&pages, &path, cfg.output.primary_layer(), dpi)?;
            reporter.report(
                JobPhase::Export,
                1,
                1,
                format!("PDF written: {}", path.display()),
            );
            Some(path)
        }
    };

    let elapsed_seconds = reporter.elapsed();
    log::info!(
        "Rendered {} page(s) from {} into {} in {:.2}s",
        pages.len(),
        input.display(),
        out_dir.display(),
        elapsed_seconds
    );

    Ok(JobResult {
        out_dir,
        page_count: pages.len(),
        plan,
        pages,
        merge_warnings: merge.warnings,
        elapsed_seconds,
        pdf_path,
    })
}

/// Output directory: explicit override, then `output.out_dir`, then
/// `<stem>_pages` next to the input.
pub fn resolve_out_dir(input: &Path, cfg: &Config, override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir.filter(|dir| !dir.as_os_str().is_empty()) {
        return dir.to_path_buf();
    }
    if !cfg.output.out_dir.as_os_str().is_empty() {
        return cfg.output.out_dir.clone();
    }
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{OUT_DIR_SUFFIX}"))
}

/// Fail when either source dimension exceeds `limits.max_dim_px`.
pub fn enforce_limits(width: u32, height: u32, limits: &LimitsConfig) -> Result<()> {
    match limits.on_exceed {
        OnExceed::Error if width > limits.max_dim_px || height > limits.max_dim_px => {
            Err(SplitError::LimitExceeded(format!(
                "Input size {width}x{height} exceeds limit {}px",
                limits.max_dim_px
            )))
        }
        OnExceed::Error => Ok(()),
    }
}

/// `<out_dir>/<out_dir name>.pdf`
fn pdf_output_path(out_dir: &Path) -> PathBuf {
    let name = out_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "pages".to_string());
    out_dir.join(format!("{name}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with_out_dir(out_dir: &str) -> Config {
        let mut cfg = Config::default();
        cfg.output.out_dir = PathBuf::from(out_dir);
        cfg
    }

    #[test]
    fn test_override_takes_priority() {
        let cfg = cfg_with_out_dir("/from/config");
        let dir = resolve_out_dir(Path::new("input.png"), &cfg, Some(Path::new("/override")));
        assert_eq!(dir, PathBuf::from("/override"));
    }

    #[test]
    fn test_config_out_dir_used_without_override() {
        let cfg = cfg_with_out_dir("/from/config");
        let dir = resolve_out_dir(Path::new("input.png"), &cfg, None);
        assert_eq!(dir, PathBuf::from("/from/config"));
    }

    #[test]
    fn test_out_dir_derived_from_input() {
        let cfg = cfg_with_out_dir("");
        assert_eq!(
            resolve_out_dir(Path::new("my_image.png"), &cfg, None),
            PathBuf::from("my_image_pages")
        );
        assert_eq!(
            resolve_out_dir(Path::new("/scans/ch1/p01.png"), &cfg, None),
            PathBuf::from("/scans/ch1/p01_pages")
        );
    }

    #[test]
    fn test_limits() {
        let limits = LimitsConfig {
            max_dim_px: 2000,
            ..Default::default()
        };
        assert!(enforce_limits(1000, 800, &limits).is_ok());
        assert!(enforce_limits(2000, 2000, &limits).is_ok());

        for (w, h) in [(3000, 100), (100, 3000)] {
            let err = enforce_limits(w, h, &limits).unwrap_err();
            assert!(matches!(err, SplitError::LimitExceeded(_)));
            assert!(err.to_string().contains("exceeds limit 2000px"));
        }
    }

    #[test]
    fn test_pdf_output_path() {
        assert_eq!(
            pdf_output_path(Path::new("/out/chapter1_pages")),
            PathBuf::from("/out/chapter1_pages/chapter1_pages.pdf")
        );
    }
}
