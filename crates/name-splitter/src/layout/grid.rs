//! Grid cell calculation
//!
//! Cells are laid out inside the canvas after subtracting the four edge
//! margins and the gutters between neighbouring cells. Every column (row)
//! gets the same integer span except the last, which absorbs the whole
//! remainder, so the spans always add up to the usable extent exactly.

use crate::config::GridConfig;
use crate::types::*;

use super::{CellRect, EdgeMargins};

// =============================================================================
// Cell Computation
// =============================================================================

/// Compute the page cells of a `width` x `height` canvas, in render order.
pub fn compute_cells(width: u32, height: u32, grid: &GridConfig) -> Result<Vec<CellRect>> {
    if width == 0 || height == 0 {
        return Err(SplitError::Config(
            "Canvas width/height must be positive".to_string(),
        ));
    }
    if grid.rows == 0 || grid.cols == 0 {
        return Err(SplitError::Config(
            "grid.rows and grid.cols must be positive".to_string(),
        ));
    }

    let margins = edge_margins(grid);
    let gutter = i64::from(grid.gutter_px);
    let usable_w = i64::from(width)
        - i64::from(margins.left)
        - i64::from(margins.right)
        - (i64::from(grid.cols) - 1) * gutter;
    let usable_h = i64::from(height)
        - i64::from(margins.top)
        - i64::from(margins.bottom)
        - (i64::from(grid.rows) - 1) * gutter;
    if usable_w <= 0 || usable_h <= 0 {
        return Err(SplitError::Config(format!(
            "Grid margins/gutters exceed canvas size ({width}x{height}, usable {usable_w}x{usable_h})"
        )));
    }

    let col_widths = split_extent(usable_w as u32, grid.cols);
    let row_heights = split_extent(usable_h as u32, grid.rows);
    let col_positions = span_positions(margins.left, &col_widths, grid.gutter_px);
    let row_positions = span_positions(margins.top, &row_heights, grid.gutter_px);

    let col_order: Vec<u32> = match grid.order {
        GridOrder::RtlTtb => (0..grid.cols).rev().collect(),
        GridOrder::LtrTtb => (0..grid.cols).collect(),
    };

    let mut cells = Vec::with_capacity(grid.rows as usize * grid.cols as usize);
    for row in 0..grid.rows {
        for &col in &col_order {
            let x0 = col_positions[col as usize];
            let y0 = row_positions[row as usize];
            cells.push(CellRect {
                index: cells.len(),
                row,
                col,
                x0,
                y0,
                x1: x0 + col_widths[col as usize],
                y1: y0 + row_heights[row as usize],
            });
        }
    }
    Ok(cells)
}

/// Margins subtracted from each canvas edge.
pub fn edge_margins(grid: &GridConfig) -> EdgeMargins {
    EdgeMargins {
        top: grid.margin_top_px,
        bottom: grid.margin_bottom_px,
        left: grid.margin_left_px,
        right: grid.margin_right_px,
    }
}

/// Split `usable` pixels into `count` spans; the last span takes the remainder.
pub fn split_extent(usable: u32, count: u32) -> Vec<u32> {
    let base = usable / count;
    let remainder = usable % count;
    let mut spans = vec![base; count as usize];
    if let Some(last) = spans.last_mut() {
        *last += remainder;
    }
    spans
}

/// Start offset of each span, separated by `gutter`
fn span_positions(start: u32, spans: &[u32], gutter: u32) -> Vec<u32> {
    let mut positions = Vec::with_capacity(spans.len());
    let mut cursor = start;
    for span in spans {
        positions.push(cursor);
        cursor += span + gutter;
    }
    positions
}

// =============================================================================
// Tests
// =============================================================================
