//! Layout data types

/// One page cell on the canvas.
///
/// `index` is the render-order position and drives page numbering; `row` and
/// `col` are the geometric grid coordinates. The pixel rectangle is
/// half-open: `x0..x1`, `y0..y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl CellRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Rectangle as `[x0, y0, x1, y1]`
    pub fn rect(&self) -> [u32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// Margins actually subtracted from the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeMargins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}
