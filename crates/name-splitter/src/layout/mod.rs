//! Grid geometry for page splitting
//!
//! This module handles the geometric calculations that cut the canvas into
//! page cells:
//! - Column/row spans with remainder distribution
//! - Cell rectangles with margins and gutters
//! - Traversal order (which cell becomes which page)

mod grid;
mod types;

pub use grid::*;
pub use types::*;
