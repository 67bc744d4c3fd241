//! Shared constants for page splitting
//!
//! This module centralizes defaults and unit conversions used throughout
//! the splitting pipeline.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// PDF points per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Convert millimeters to pixels at the given resolution, rounding to the
/// nearest pixel
#[inline]
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm * dpi as f64 / MM_PER_INCH).round().max(0.0) as u32
}

/// Convert pixels to PDF points at the given resolution
#[inline]
pub fn px_to_pt(px: u32, dpi: u32) -> f32 {
    (px as f64 * POINTS_PER_INCH / dpi as f64) as f32
}

// =============================================================================
// Config Defaults
// =============================================================================

pub const CONFIG_VERSION: i64 = 1;

pub const DEFAULT_ROWS: u32 = 4;
pub const DEFAULT_COLS: u32 = 4;
pub const DEFAULT_DPI: u32 = 300;
pub const DEFAULT_MAX_DIM_PX: u32 = 30000;

pub const DEFAULT_PAGE_BASENAME: &str = "page_{page:03d}";
pub const DEFAULT_LAYER: &str = "flat";
pub const DEFAULT_RASTER_EXT: &str = "png";

/// Name of the single leaf produced when reading a flat raster
pub const FLAT_LAYER_NAME: &str = "flat";

/// Suffix appended to the input stem when no output directory is configured
pub const OUT_DIR_SUFFIX: &str = "_pages";

/// Base name of the run manifest (extension depends on the serializer)
pub const MANIFEST_STEM: &str = "plan";

// =============================================================================
// Progress
// =============================================================================

/// Lower bound on elapsed time used for speed calculation (seconds)
pub const MIN_ELAPSED_SECONDS: f64 = 0.001;
