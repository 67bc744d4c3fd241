use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Image read error: {0}")]
    ImageRead(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Cancelled: {0}")]
    Cancelled(String),
    #[error("No merged images available for rendering")]
    NoComposites,
    #[error("Manifest error: {0}")]
    Manifest(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl SplitError {
    /// Whether this error belongs to a single job and may be isolated by the
    /// batch runner. Anything else aborts the whole batch.
    pub fn is_job_failure(&self) -> bool {
        matches!(
            self,
            SplitError::Config(_)
                | SplitError::LimitExceeded(_)
                | SplitError::ImageRead(_)
                | SplitError::InvalidArgument(_)
                | SplitError::Cancelled(_)
                | SplitError::NoComposites
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SplitError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Portrait: height > width
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Paper size presets used to derive a page size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A5,
    B4,
    B5,
    /// Explicit `page_width_px`/`page_height_px` only
    Custom,
}

impl PaperSize {
    /// Get base dimensions (always portrait). `None` for `Custom`.
    pub fn dimensions_mm(self) -> Option<(f32, f32)> {
        match self {
            PaperSize::A4 => Some((210.0, 297.0)),
            PaperSize::A5 => Some((148.0, 210.0)),
            PaperSize::B4 => Some((257.0, 364.0)),
            PaperSize::B5 => Some((182.0, 257.0)),
            PaperSize::Custom => None,
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> Option<(f32, f32)> {
        let (w, h) = self.dimensions_mm()?;
        Some(match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        })
    }
}

/// Display unit attached to a stored pixel value.
///
/// Stored values are always pixels; the unit only records how the value was
/// entered so that editors can show it back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Px,
    Mm,
}

/// Cell traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridOrder {
    /// Right-to-left within top-to-bottom rows (manga reading order)
    #[default]
    RtlTtb,
    /// Left-to-right within top-to-bottom rows
    LtrTtb,
}

impl GridOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            GridOrder::RtlTtb => "rtl_ttb",
            GridOrder::LtrTtb => "ltr_ttb",
        }
    }
}

/// How rendered files are grouped on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// One directory per page, one file per layer inside
    Pages,
    /// One directory per layer, one file per page inside
    #[default]
    Layers,
}

/// Container produced in addition to the raster files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// Raster files only
    #[default]
    Png,
    /// Raster files plus a single concatenated PDF
    Pdf,
}

/// Odd/even page filter, applied after skipping pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageParity {
    #[default]
    All,
    Odd,
    Even,
}

/// What to do when the source exceeds `limits.max_dim_px`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExceed {
    #[default]
    Error,
}

/// RGBA pixel value
pub type Rgba = [u8; 4];

/// Fully transparent pixel
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
