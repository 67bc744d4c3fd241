//! Plan writing and page rendering
//!
//! Each selected cell is cropped out of every output layer composite and
//! written as a raster file. Files are grouped one directory per layer
//! (`layers` layout) or one directory per page (`pages` layout).

mod manifest;
mod naming;

pub use manifest::{
    GridEntry, MergeEntry, OutputEntry, PageEntry, PlanDocument, RenderPlan, SourceEntry,
    write_plan,
};
pub use naming::format_page_name;

use crate::config::Config;
use crate::layout::CellRect;
use crate::merge::MergeResult;
use crate::raster::{ImageData, resample};
use crate::types::*;
use manifest::{cell_at, page_number};
use std::fs;
use std::path::{Path, PathBuf};

/// Files written for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 0-based cell index in render order
    pub page_index: usize,
    /// Display number used in the file name
    pub page_number: u32,
    pub page_name: String,
    /// Directory of this page's files (`pages` layout) or the output root
    /// (`layers` layout)
    pub page_dir: PathBuf,
    /// Output layer name and written file, in `layer_stack` order
    pub layer_paths: Vec<(String, PathBuf)>,
}

impl RenderedPage {
    pub fn layer_path(&self, layer: &str) -> Option<&Path> {
        self.layer_paths
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, path)| path.as_path())
    }
}

/// Crop and write every selected page for every layer of `output.layer_stack`.
///
/// A layer without a composite is written as a transparent crop. At least
/// one composite must exist. `on_page` is called after each page with the
/// page and the done/total counts.
pub fn render_pages(
    out_dir: &Path,
    cells: &[CellRect],
    cfg: &Config,
    selected_pages: &[usize],
    merge: &MergeResult,
    mut on_page: impl FnMut(&RenderedPage, usize, usize),
) -> Result<Vec<RenderedPage>> {
    if merge.output_images.is_empty() {
        return Err(SplitError::NoComposites);
    }
    fs::create_dir_all(out_dir)?;

    let output = &cfg.output;
    let total = selected_pages.len();
    let mut pages = Vec::with_capacity(total);

    for &page_index in selected_pages {
        let cell = cell_at(cells, page_index)?;
        let number = page_number(cell, output.page_number_start)?;
        let page_name = format_page_name(&output.page_basename, number)?;
        let page_dir = match output.layout {
            OutputLayout::Pages => out_dir.join(&page_name),
            OutputLayout::Layers => out_dir.to_path_buf(),
        };

        let mut layer_paths = Vec::with_capacity(output.layer_stack.len());
        for layer in &output.layer_stack {
            let cropped = match merge.output_images.get(layer) {
                Some(image) => crop_cell(image, cell),
                None => ImageData::transparent(cell.width(), cell.height()),
            };
            let cropped = rescale(cropped, cfg.grid.dpi, output.output_dpi);

            let (dir, stem) = match output.layout {
                OutputLayout::Pages => (page_dir.clone(), layer.as_str()),
                OutputLayout::Layers => (out_dir.join(layer), page_name.as_str()),
            };
            fs::create_dir_all(&dir)?;
            let path = dir.join(format!("{stem}.{}", output.raster_ext));
            cropped.save(&path)?;
            layer_paths.push((layer.clone(), path));
        }

        let rendered = RenderedPage {
            page_index,
            page_number: number,
            page_name,
            page_dir,
            layer_paths,
        };
        on_page(&rendered, pages.len() + 1, total);
        pages.push(rendered);
    }

    Ok(pages)
}

fn crop_cell(image: &ImageData, cell: &CellRect) -> ImageData {
    image.crop(
        i64::from(cell.x0),
        i64::from(cell.y0),
        i64::from(cell.x1),
        i64::from(cell.y1),
    )
}

/// Resample a crop from `source_dpi` to `output_dpi`; 0 or equal keeps it
fn rescale(image: ImageData, source_dpi: u32, output_dpi: u32) -> ImageData {
    if output_dpi == 0 || output_dpi == source_dpi || source_dpi == 0 {
        return image;
    }
    let scale = f64::from(output_dpi) / f64::from(source_dpi);
    let width = (f64::from(image.width()) * scale).round() as u32;
    let height = (f64::from(image.height()) * scale).round() as u32;
    resample(&image, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale() {
        let image = ImageData::blank(10, 20, [0, 0, 0, 255]);

        let same = rescale(image.clone(), 300, 0);
        assert_eq!((same.width(), same.height()), (10, 20));

        let half = rescale(image.clone(), 300, 150);
        assert_eq!((half.width(), half.height()), (5, 10));

        let tiny = rescale(image, 300, 1);
        assert_eq!((tiny.width(), tiny.height()), (1, 1));
    }
}
