//! Run configuration
//!
//! A [`Config`] is an immutable description of one split run. It is built
//! either by [`Config::load`] from a structured document or programmatically,
//! and in both cases checked with [`Config::validate`].

mod document;

use crate::constants::*;
use crate::render::format_page_name;
use crate::types::*;
use std::path::PathBuf;

/// Source image reference
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputConfig {
    pub image_path: PathBuf,
}

/// Grid geometry. All lengths are pixels; the unit fields are display tags.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
    pub order: GridOrder,
    pub margin_top_px: u32,
    pub margin_bottom_px: u32,
    pub margin_left_px: u32,
    pub margin_right_px: u32,
    pub margin_unit: Unit,
    pub gutter_px: u32,
    pub gutter_unit: Unit,
    pub dpi: u32,
    pub page_size_name: PaperSize,
    pub orientation: Orientation,
    /// Explicit page width; 0 derives it from `page_size_name`
    pub page_width_px: u32,
    /// Explicit page height; 0 derives it from `page_size_name`
    pub page_height_px: u32,
    pub page_size_unit: Unit,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            order: GridOrder::RtlTtb,
            margin_top_px: 0,
            margin_bottom_px: 0,
            margin_left_px: 0,
            margin_right_px: 0,
            margin_unit: Unit::Px,
            gutter_px: 0,
            gutter_unit: Unit::Px,
            dpi: DEFAULT_DPI,
            page_size_name: PaperSize::A4,
            orientation: Orientation::Portrait,
            page_width_px: 0,
            page_height_px: 0,
            page_size_unit: Unit::Px,
        }
    }
}

impl GridConfig {
    /// Set all four margins to the same value
    pub fn with_uniform_margin(mut self, margin_px: u32) -> Self {
        self.margin_top_px = margin_px;
        self.margin_bottom_px = margin_px;
        self.margin_left_px = margin_px;
        self.margin_right_px = margin_px;
        self
    }

    /// Page size in pixels: the explicit size when both dimensions are set,
    /// otherwise derived from the paper preset at `dpi`.
    pub fn page_size_px(&self) -> Option<(u32, u32)> {
        if self.page_width_px > 0 && self.page_height_px > 0 {
            return Some((self.page_width_px, self.page_height_px));
        }
        let (w_mm, h_mm) = self
            .page_size_name
            .dimensions_with_orientation(self.orientation)?;
        Some((
            mm_to_px(w_mm as f64, self.dpi),
            mm_to_px(h_mm as f64, self.dpi),
        ))
    }
}

/// What a merge rule matches against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Group(String),
    Layer(String),
}

impl RuleTarget {
    pub fn name(&self) -> &str {
        match self {
            RuleTarget::Group(name) | RuleTarget::Layer(name) => name,
        }
    }
}

/// Routes source nodes with a given name into an output bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRule {
    pub target: RuleTarget,
    pub output_layer: String,
}

impl MergeRule {
    pub fn group(name: impl Into<String>, output_layer: impl Into<String>) -> Self {
        Self {
            target: RuleTarget::Group(name.into()),
            output_layer: output_layer.into(),
        }
    }

    pub fn layer(name: impl Into<String>, output_layer: impl Into<String>) -> Self {
        Self {
            target: RuleTarget::Layer(name.into()),
            output_layer: output_layer.into(),
        }
    }
}

/// Ordered merge rules. Declaration order decides which rule wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeConfig {
    pub group_rules: Vec<MergeRule>,
    pub layer_rules: Vec<MergeRule>,
    pub include_hidden_layers: bool,
}

impl MergeConfig {
    pub fn has_rules(&self) -> bool {
        !self.group_rules.is_empty() || !self.layer_rules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    /// File/directory name pattern with a `{page}` or `{page:0Nd}` placeholder
    pub page_basename: String,
    /// Output layers, in stacking order. The first one feeds PDF export.
    pub layer_stack: Vec<String>,
    pub raster_ext: String,
    pub container: ContainerFormat,
    pub layout: OutputLayout,
    /// Resample crops to this resolution; 0 keeps source pixels
    pub output_dpi: u32,
    pub page_number_start: u32,
    /// 1-based page numbers to leave out
    pub skip_pages: Vec<u32>,
    pub odd_even: PageParity,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::new(),
            page_basename: DEFAULT_PAGE_BASENAME.to_string(),
            layer_stack: vec![DEFAULT_LAYER.to_string()],
            raster_ext: DEFAULT_RASTER_EXT.to_string(),
            container: ContainerFormat::Png,
            layout: OutputLayout::Layers,
            output_dpi: 0,
            page_number_start: 1,
            skip_pages: Vec::new(),
            odd_even: PageParity::All,
        }
    }
}

impl OutputConfig {
    /// The layer every run is guaranteed to have a slot for
    pub fn primary_layer(&self) -> &str {
        self.layer_stack
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_LAYER)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitsConfig {
    pub max_dim_px: u32,
    pub on_exceed: OnExceed,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_dim_px: DEFAULT_MAX_DIM_PX,
            on_exceed: OnExceed::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub version: i64,
    pub input: InputConfig,
    pub grid: GridConfig,
    pub merge: MergeConfig,
    pub output: OutputConfig,
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            input: InputConfig::default(),
            grid: GridConfig::default(),
            merge: MergeConfig::default(),
            output: OutputConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    /// Validate the configuration without touching the filesystem.
    ///
    /// Sign and enum-membership invariants are carried by the field types;
    /// this checks the remaining value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(config_error(format!(
                "Unsupported config version: {}",
                self.version
            )));
        }

        let grid = &self.grid;
        if grid.rows == 0 || grid.cols == 0 {
            return Err(config_error("grid.rows and grid.cols must be positive"));
        }
        if grid.dpi == 0 {
            return Err(config_error("grid.dpi must be positive"));
        }

        validate_rules("merge.group_rules", &self.merge.group_rules)?;
        validate_rules("merge.layer_rules", &self.merge.layer_rules)?;

        let output = &self.output;
        if output.layer_stack.is_empty() {
            return Err(config_error("output.layer_stack must not be empty"));
        }
        if let Some(index) = output.layer_stack.iter().position(|l| l.trim().is_empty()) {
            return Err(config_error(format!(
                "output.layer_stack[{index}] must not be empty"
            )));
        }
        if output.raster_ext.is_empty()
            || !output.raster_ext.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(config_error(format!(
                "output.raster_ext is not a valid extension: {:?}",
                output.raster_ext
            )));
        }
        let writable = image::ImageFormat::from_extension(&output.raster_ext)
            .is_some_and(|format| format.writing_enabled());
        if !writable {
            return Err(config_error(format!(
                "output.raster_ext is not a writable image format: {:?}",
                output.raster_ext
            )));
        }
        let last_index = u64::from(grid.rows) * u64::from(grid.cols) - 1;
        if last_index + u64::from(output.page_number_start) > u64::from(u32::MAX) {
            return Err(config_error(format!(
                "output.page_number_start {} is too large for a {}x{} grid",
                output.page_number_start, grid.rows, grid.cols
            )));
        }
        format_page_name(&output.page_basename, output.page_number_start)?;

        if self.limits.max_dim_px == 0 {
            return Err(config_error("limits.max_dim_px must be positive"));
        }

        Ok(())
    }
}

fn validate_rules(label: &str, rules: &[MergeRule]) -> Result<()> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.target.name().is_empty() {
            return Err(config_error(format!(
                "{label}[{index}] requires group_name or layer_name"
            )));
        }
        if rule.output_layer.trim().is_empty() {
            return Err(config_error(format!(
                "{label}[{index}].output_layer is required"
            )));
        }
    }
    Ok(())
}

pub(crate) fn config_error(message: impl Into<String>) -> SplitError {
    SplitError::Config(message.into())
}
