//src/layout.rs

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::resolve::MAX_LINEAGE_DEPTH;
use crate::tree::{NodeIndex, TaxonTree, TreeNode};
use crate::types::{LayoutKind, Point, Span};

/// Distances used to turn depth and spans into coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSpacing {
    /// Distance between consecutive depths (x step when linear, ring step when circular).
    pub level_gap: f64,
    /// Breadth of one leaf slot in linear layouts.
    pub leaf_gap: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self { level_gap: 120.0, leaf_gap: 24.0 }
    }
}

/// Splits `parent` among children in proportion to their leaf counts,
/// left to right. The last child ends exactly at `parent.end`.
fn subdivide(parent: Span, parent_leaves: usize, child_leaves: &[usize]) -> Vec<Span> {
    let mut spans = Vec::with_capacity(child_leaves.len());
    let mut cursor = parent.start;
    for (i, &leaves) in child_leaves.iter().enumerate() {
        let end = if i + 1 == child_leaves.len() {
            parent.end
        } else {
            cursor + parent.width() * leaves as f64 / parent_leaves as f64
        };
        spans.push(Span { start: cursor, end });
        cursor = end;
    }
    spans
}

/// Assigns span, position and (for circular layouts) angle and radius to
/// every node.
///
/// Linear: depth runs along x, siblings share y in leaf units, and the root
/// sits at the centre of the breadth axis. Circular: depth is the radius,
/// the root owns the full turn and sits at the origin.
pub fn layout(tree: &mut TaxonTree, discipline: LayoutKind, spacing: &LayoutSpacing) {
    let leaves = tree.leaf_counts();
    let root_span = match discipline {
        LayoutKind::Linear => Span { start: 0.0, end: leaves[TaxonTree::ROOT] as f64 },
        LayoutKind::Circular => Span { start: 0.0, end: TAU },
    };

    let mut stack: Vec<(NodeIndex, Span)> = vec![(TaxonTree::ROOT, root_span)];
    while let Some((idx, span)) = stack.pop() {
        let children = tree.node(idx).children.clone();
        let child_leaves: Vec<usize> = children.iter().map(|&c| leaves[c]).collect();
        let child_spans = subdivide(span, leaves[idx], &child_leaves);

        let node = &mut tree.nodes_mut()[idx];
        debug_assert!(node.depth <= MAX_LINEAGE_DEPTH + 1, "depth {} beyond lineage bound", node.depth);
        node.span = span;
        place(node, discipline, spacing);

        stack.extend(children.into_iter().zip(child_spans).rev());
    }

    log::debug!("Laid out {} nodes ({discipline:?}, {} leaves)", tree.len(), leaves[TaxonTree::ROOT]);
}

fn place(node: &mut TreeNode, discipline: LayoutKind, spacing: &LayoutSpacing) {
    match discipline {
        LayoutKind::Linear => {
            node.position = Point {
                x: node.depth as f64 * spacing.level_gap,
                y: node.span.mid() * spacing.leaf_gap,
            };
            node.angle = None;
            node.radius = None;
        }
        LayoutKind::Circular => {
            let (angle, radius) = if node.parent.is_none() {
                (0.0, 0.0)
            } else {
                (node.span.mid(), node.depth as f64 * spacing.level_gap)
            };
            node.position = Point { x: radius * angle.cos(), y: radius * angle.sin() };
            node.angle = Some(angle);
            node.radius = Some(radius);
        }
    }
}
