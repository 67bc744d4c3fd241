//! Rule-based layer merging
//!
//! Layers are flattened depth-first and each node is matched by exact name
//! against the group rules (for groups) or layer rules (for leaves). The
//! first rule in declaration order wins. Rules that never match are reported
//! as warnings, not errors.
//!
//! Group membership is decided from name paths, so two sibling groups with
//! the same name are indistinguishable: a rule matching one of them also
//! attributes the other's leaves to the bucket.

mod flatten;

pub use flatten::LayerRef;

use crate::config::{MergeConfig, MergeRule};
use crate::raster::{ImageData, composite_layers};
use crate::source::{LayerKind, LayerNode};
use flatten::{FlatNode, flatten_layers};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    /// Output layer name to the references routed into it
    pub outputs: BTreeMap<String, Vec<LayerRef>>,
    pub unmatched: Vec<LayerRef>,
    pub warnings: Vec<String>,
    /// Composited bucket images; only filled when a canvas size was given
    pub output_images: BTreeMap<String, ImageData>,
}

impl MergeResult {
    /// Result holding a single ready-made composite
    pub fn single(output_layer: impl Into<String>, image: ImageData) -> Self {
        let output_layer = output_layer.into();
        MergeResult {
            outputs: BTreeMap::from([(output_layer.clone(), Vec::new())]),
            output_images: BTreeMap::from([(output_layer, image)]),
            ..Default::default()
        }
    }
}

/// Route the nodes of `layers` into output buckets.
///
/// With `canvas_size`, every bucket also gets a composite of its leaves:
/// directly matched leaves plus leaves under a matched group, in flattened
/// order. Buckets without any leaf pixels get no image.
pub fn apply_merge_rules(
    layers: &[LayerNode],
    cfg: &MergeConfig,
    canvas_size: Option<(u32, u32)>,
) -> MergeResult {
    let nodes = flatten_layers(layers, cfg.include_hidden_layers);

    let mut outputs: BTreeMap<String, Vec<LayerRef>> = BTreeMap::new();
    let mut unmatched = Vec::new();
    // Bucket assigned to each flattened node, by position
    let mut assigned: Vec<Option<&str>> = Vec::with_capacity(nodes.len());

    for node in &nodes {
        let rules = match node.layer.kind {
            LayerKind::Group => &cfg.group_rules,
            LayerKind::Layer => &cfg.layer_rules,
        };
        match match_rule(&node.layer.name, rules) {
            Some(rule) => {
                outputs
                    .entry(rule.output_layer.clone())
                    .or_default()
                    .push(node.layer.clone());
                assigned.push(Some(rule.output_layer.as_str()));
            }
            None => {
                unmatched.push(node.layer.clone());
                assigned.push(None);
            }
        }
    }

    let mut warnings = unused_rule_warnings(
        "merge.group_rules",
        &cfg.group_rules,
        &outputs,
        LayerKind::Group,
    );
    warnings.extend(unused_rule_warnings(
        "merge.layer_rules",
        &cfg.layer_rules,
        &outputs,
        LayerKind::Layer,
    ));
    for warning in &warnings {
        log::warn!("{warning}");
    }

    let output_images = match canvas_size {
        Some(size) => outputs
            .keys()
            .filter_map(|bucket| {
                composite_bucket(bucket, &nodes, &assigned, size).map(|img| (bucket.clone(), img))
            })
            .collect(),
        None => BTreeMap::new(),
    };

    MergeResult {
        outputs,
        unmatched,
        warnings,
        output_images,
    }
}

/// Composite every visible leaf (or every leaf, with `include_hidden`) into
/// one canvas-sized image.
pub fn composite_all(
    layers: &[LayerNode],
    include_hidden: bool,
    canvas_size: (u32, u32),
) -> ImageData {
    let nodes = flatten_layers(layers, include_hidden);
    composite_layers(
        canvas_size,
        nodes
            .iter()
            .filter_map(|node| node.pixels)
            .map(|pixels| (&pixels.image, pixels.offset())),
    )
}

fn match_rule<'r>(name: &str, rules: &'r [MergeRule]) -> Option<&'r MergeRule> {
    rules.iter().find(|rule| rule.target.name() == name)
}

fn unused_rule_warnings(
    label: &str,
    rules: &[MergeRule],
    outputs: &BTreeMap<String, Vec<LayerRef>>,
    kind: LayerKind,
) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| {
            let target = rule.target.name();
            !outputs
                .values()
                .flatten()
                .any(|layer| layer.kind == kind && layer.name == target)
        })
        .map(|rule| format!("{label}: no match for {}", rule.target.name()))
        .collect()
}

fn composite_bucket(
    bucket: &str,
    nodes: &[FlatNode<'_>],
    assigned: &[Option<&str>],
    canvas_size: (u32, u32),
) -> Option<ImageData> {
    let groups: Vec<&LayerRef> = nodes
        .iter()
        .zip(assigned)
        .filter(|(node, slot)| node.layer.kind == LayerKind::Group && **slot == Some(bucket))
        .map(|(node, _)| &node.layer)
        .collect();

    let members: Vec<_> = nodes
        .iter()
        .zip(assigned)
        .filter_map(|(node, slot)| {
            let pixels = node.pixels?;
            let direct = node.layer.kind == LayerKind::Layer && *slot == Some(bucket);
            let inherited = groups.iter().any(|group| node.layer.descends_from(group));
            (direct || inherited).then_some(pixels)
        })
        .collect();

    if members.is_empty() {
        return None;
    }
    Some(composite_layers(
        canvas_size,
        members.iter().map(|pixels| (&pixels.image, pixels.offset())),
    ))
}
