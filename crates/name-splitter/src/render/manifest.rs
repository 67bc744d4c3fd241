//! Run manifest (`plan.toml`, or `plan.json` as fallback)

use crate::config::Config;
use crate::constants::MANIFEST_STEM;
use crate::layout::CellRect;
use crate::merge::MergeResult;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a run manifest was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub out_dir: PathBuf,
    pub manifest_path: PathBuf,
}

/// Serialized form of a planned run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub source: SourceEntry,
    pub grid: GridEntry,
    pub output: OutputEntry,
    pub merge: MergeEntry,
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub rows: u32,
    pub cols: u32,
    pub order: GridOrder,
    pub margin_top_px: u32,
    pub margin_bottom_px: u32,
    pub margin_left_px: u32,
    pub margin_right_px: u32,
    pub gutter_px: u32,
    pub dpi: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub page_basename: String,
    pub layer_stack: Vec<String>,
    pub raster_ext: String,
    pub container: ContainerFormat,
    pub layout: OutputLayout,
    pub output_dpi: u32,
    pub page_number_start: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeEntry {
    pub unmatched: usize,
    pub warnings: Vec<String>,
    /// Output layer to number of matched references
    pub outputs: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub page_index: usize,
    pub page_number: u32,
    pub row: u32,
    pub col: u32,
    pub rect: [u32; 4],
}

impl PlanDocument {
    pub fn new(
        canvas_size: (u32, u32),
        cells: &[CellRect],
        cfg: &Config,
        selected_pages: &[usize],
        merge: Option<&MergeResult>,
    ) -> Result<Self> {
        let grid = &cfg.grid;
        let output = &cfg.output;
        let pages = selected_pages
            .iter()
            .map(|&page_index| {
                let cell = cell_at(cells, page_index)?;
                Ok(PageEntry {
                    page_index,
                    page_number: page_number(cell, output.page_number_start)?,
                    row: cell.row,
                    col: cell.col,
                    rect: cell.rect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let merge = match merge {
            Some(result) => MergeEntry {
                unmatched: result.unmatched.len(),
                warnings: result.warnings.clone(),
                outputs: result
                    .outputs
                    .iter()
                    .map(|(name, refs)| (name.clone(), refs.len()))
                    .collect(),
            },
            None => MergeEntry {
                unmatched: 0,
                warnings: Vec::new(),
                outputs: BTreeMap::new(),
            },
        };

        Ok(PlanDocument {
            source: SourceEntry {
                width: canvas_size.0,
                height: canvas_size.1,
            },
            grid: GridEntry {
                rows: grid.rows,
                cols: grid.cols,
                order: grid.order,
                margin_top_px: grid.margin_top_px,
                margin_bottom_px: grid.margin_bottom_px,
                margin_left_px: grid.margin_left_px,
                margin_right_px: grid.margin_right_px,
                gutter_px: grid.gutter_px,
                dpi: grid.dpi,
            },
            output: OutputEntry {
                page_basename: output.page_basename.clone(),
                layer_stack: output.layer_stack.clone(),
                raster_ext: output.raster_ext.clone(),
                container: output.container,
                layout: output.layout,
                output_dpi: output.output_dpi,
                page_number_start: output.page_number_start,
            },
            merge,
            pages,
        })
    }

    /// Read a manifest back, choosing the parser from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            #[cfg(feature = "toml")]
            Some("toml") => toml::from_str(&text).map_err(|e| SplitError::Manifest(e.to_string())),
            Some("json") => {
                serde_json::from_str(&text).map_err(|e| SplitError::Manifest(e.to_string()))
            }
            _ => Err(SplitError::Manifest(format!(
                "Unsupported manifest format: {}",
                path.display()
            ))),
        }
    }
}

/// Write the manifest for a planned run into `out_dir`.
///
/// The file name depends on which serializer succeeded; use the returned
/// [`RenderPlan::manifest_path`].
pub fn write_plan(
    out_dir: &Path,
    canvas_size: (u32, u32),
    cells: &[CellRect],
    cfg: &Config,
    selected_pages: &[usize],
    merge: Option<&MergeResult>,
) -> Result<RenderPlan> {
    fs::create_dir_all(out_dir)?;
    let document = PlanDocument::new(canvas_size, cells, cfg, selected_pages, merge)?;
    let (manifest_path, text) = serialize_plan(out_dir, &document)?;
    fs::write(&manifest_path, text)?;
    log::debug!("Wrote plan {}", manifest_path.display());
    Ok(RenderPlan {
        out_dir: out_dir.to_path_buf(),
        manifest_path,
    })
}

fn serialize_plan(out_dir: &Path, document: &PlanDocument) -> Result<(PathBuf, String)> {
    #[cfg(feature = "toml")]
    match toml::to_string_pretty(document) {
        Ok(text) => return Ok((out_dir.join(format!("{MANIFEST_STEM}.toml")), text)),
        Err(e) => log::debug!("TOML plan serialization failed, using JSON: {e}"),
    }

    let text =
        serde_json::to_string_pretty(document).map_err(|e| SplitError::Manifest(e.to_string()))?;
    Ok((out_dir.join(format!("{MANIFEST_STEM}.json")), text))
}

pub(crate) fn cell_at(cells: &[CellRect], page_index: usize) -> Result<&CellRect> {
    cells.get(page_index).ok_or_else(|| {
        SplitError::InvalidArgument(format!(
            "page index {page_index} out of range for {} cells",
            cells.len()
        ))
    })
}

/// Display number of a cell
pub(crate) fn page_number(cell: &CellRect, page_number_start: u32) -> Result<u32> {
    u32::try_from(cell.index)
        .ok()
        .and_then(|index| index.checked_add(page_number_start))
        .ok_or_else(|| {
            SplitError::Config(format!(
                "output.page_number_start {page_number_start} overflows page {}",
                cell.index
            ))
        })
}
