//! Depth-first flattening of a layer tree

use crate::source::{LayerKind, LayerNode, LayerPixels};

/// A flattened reference to one node of the layer tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    pub name: String,
    pub kind: LayerKind,
    /// Names from the root down to and including this node
    pub path: Vec<String>,
    pub visible: bool,
}

impl LayerRef {
    /// Whether `ancestor`'s path is a strict prefix of this one's
    pub fn descends_from(&self, ancestor: &LayerRef) -> bool {
        self.path.len() > ancestor.path.len() && self.path.starts_with(&ancestor.path)
    }
}

/// Flattened node plus the pixel payload of leaves
#[derive(Debug)]
pub(crate) struct FlatNode<'a> {
    pub layer: LayerRef,
    pub pixels: Option<&'a LayerPixels>,
}

/// Walk `layers` in pre-order. Invisible nodes and their subtrees are skipped
/// unless `include_hidden` is set.
pub(crate) fn flatten_layers(layers: &[LayerNode], include_hidden: bool) -> Vec<FlatNode<'_>> {
    let mut nodes = Vec::new();
    let mut path = Vec::new();
    for layer in layers {
        walk(layer, include_hidden, &mut path, &mut nodes);
    }
    nodes
}

fn walk<'a>(
    node: &'a LayerNode,
    include_hidden: bool,
    path: &mut Vec<String>,
    nodes: &mut Vec<FlatNode<'a>>,
) {
    if !include_hidden && !node.is_visible() {
        return;
    }
    path.push(node.name().to_string());
    let pixels = match node {
        LayerNode::Leaf { pixels, .. } => pixels.as_ref(),
        LayerNode::Group { .. } => None,
    };
    nodes.push(FlatNode {
        layer: LayerRef {
            name: node.name().to_string(),
            kind: node.kind(),
            path: path.clone(),
            visible: node.is_visible(),
        },
        pixels,
    });
    if let LayerNode::Group { children, .. } = node {
        for child in children {
            walk(child, include_hidden, path, nodes);
        }
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<LayerNode> {
        vec![
            LayerNode::group(
                "A",
                vec![
                    LayerNode::leaf("a1", None),
                    LayerNode::group("B", vec![LayerNode::leaf("b1", None)]).with_visible(false),
                ],
            ),
            LayerNode::leaf("top", None),
        ]
    }

    fn names(nodes: &[FlatNode<'_>]) -> Vec<String> {
        nodes.iter().map(|n| n.layer.path.join("/")).collect()
    }

    #[test]
    fn test_preorder_skips_hidden_subtree() {
        let layers = tree();
        let nodes = flatten_layers(&layers, false);
        assert_eq!(names(&nodes), vec!["A", "A/a1", "top"]);
    }

    #[test]
    fn test_preorder_includes_hidden() {
        let layers = tree();
        let nodes = flatten_layers(&layers, true);
        assert_eq!(names(&nodes), vec!["A", "A/a1", "A/B", "A/B/b1", "top"]);
        assert!(!nodes[2].layer.visible);
        assert_eq!(nodes[2].layer.kind, LayerKind::Group);
    }

    #[test]
    fn test_descends_from() {
        let layers = tree();
        let nodes = flatten_layers(&layers, true);
        assert!(nodes[3].layer.descends_from(&nodes[0].layer));
        assert!(!nodes[0].layer.descends_from(&nodes[0].layer));
        assert!(!nodes[4].layer.descends_from(&nodes[0].layer));
    }
}
