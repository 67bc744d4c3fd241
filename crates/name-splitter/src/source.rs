//! Source documents and their readers
//!
//! A [`SourceDocument`] is the canvas size plus a tree of [`LayerNode`]s.
//! Layered formats are read by external [`DocumentReader`] implementations;
//! [`RasterReader`] covers flat raster files.

use crate::constants::FLAT_LAYER_NAME;
use crate::raster::{ImageData, decode_image};
use crate::types::*;
use std::path::Path;

/// Placement of a leaf's pixels on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPixels {
    /// `[x0, y0, x1, y1]`; may extend past the canvas edges
    pub bbox: [i64; 4],
    pub image: ImageData,
}

impl LayerPixels {
    pub fn offset(&self) -> (i64, i64) {
        (self.bbox[0], self.bbox[1])
    }
}

/// One node of a layer tree. Groups never carry pixels; leaves never carry
/// children.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerNode {
    Group {
        name: String,
        visible: bool,
        children: Vec<LayerNode>,
    },
    Leaf {
        name: String,
        visible: bool,
        pixels: Option<LayerPixels>,
    },
}

impl LayerNode {
    pub fn group(name: impl Into<String>, children: Vec<LayerNode>) -> Self {
        LayerNode::Group {
            name: name.into(),
            visible: true,
            children,
        }
    }

    pub fn leaf(name: impl Into<String>, pixels: Option<LayerPixels>) -> Self {
        LayerNode::Leaf {
            name: name.into(),
            visible: true,
            pixels,
        }
    }

    /// Same node with its visibility flag replaced
    pub fn with_visible(mut self, value: bool) -> Self {
        match &mut self {
            LayerNode::Group { visible, .. } | LayerNode::Leaf { visible, .. } => {
                *visible = value
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            LayerNode::Group { name, .. } | LayerNode::Leaf { name, .. } => name,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            LayerNode::Group { visible, .. } | LayerNode::Leaf { visible, .. } => *visible,
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerNode::Group { .. } => LayerKind::Group,
            LayerNode::Leaf { .. } => LayerKind::Layer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Layer,
    Group,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<LayerNode>,
}

impl SourceDocument {
    /// Wrap a flat image as a document with one visible leaf covering the canvas
    pub fn from_image(image: ImageData) -> Self {
        let (width, height) = (image.width(), image.height());
        let bbox = [0, 0, i64::from(width), i64::from(height)];
        SourceDocument {
            width,
            height,
            layers: vec![LayerNode::leaf(
                FLAT_LAYER_NAME,
                Some(LayerPixels { bbox, image }),
            )],
        }
    }
}

/// Reads a file into a [`SourceDocument`]
pub trait DocumentReader {
    fn read(&self, path: &Path) -> Result<SourceDocument>;
}

/// Reader for flat raster files (png, jpeg, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterReader;

impl DocumentReader for RasterReader {
    fn read(&self, path: &Path) -> Result<SourceDocument> {
        let image = decode_image(path)?;
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(SourceDocument::from_image(image))
    }
}
