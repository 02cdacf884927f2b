//src/emphasis.rs

use serde::{Deserialize, Serialize};

use crate::tree::TaxonTree;
use crate::types::{Continuity, ScaleMode};

/// Label colours from the least to the most abundant class.
pub const PALETTE: [&str; 7] = [
    "#8F00FF", // violet
    "#4B0082", // indigo
    "#0000FF", // blue
    "#00FF00", // green
    "#FFFF00", // yellow
    "#FF7F00", // orange
    "#FF0000", // red
];

/// How emphasis turns into label size and colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmphasisStyle {
    /// Number of size classes on the halving ladder (discontinuous mode).
    pub classes: usize,
    pub font_min: f64,
    pub font_max: f64,
}

impl Default for EmphasisStyle {
    fn default() -> Self {
        Self { classes: PALETTE.len(), font_min: 12.0, font_max: 30.0 }
    }
}

impl EmphasisStyle {
    /// Linear interpolation between `font_min` and `font_max`.
    pub fn font_size(&self, factor: f64) -> f64 {
        self.font_min + factor.clamp(0.0, 1.0) * (self.font_max - self.font_min)
    }

    pub fn color(&self, class: usize) -> &'static str {
        let top = self.classes.saturating_sub(1).max(1);
        let slot = class.min(top) * (PALETTE.len() - 1) / top;
        PALETTE[slot]
    }
}

/// Position of `value` on the halving ladder: with `n` classes the top
/// class holds values `>= 1/2`, the next `>= 1/4`, and so on; class 0 holds
/// whatever falls below `2^-(n-1)`.
pub fn halving_class(value: f64, classes: usize) -> usize {
    let mut threshold = 0.5;
    for class in (1..classes).rev() {
        if value >= threshold {
            return class;
        }
        threshold /= 2.0;
    }
    0
}

/// The importance number of every node (indexed like `tree.nodes()`).
pub fn scaled_values(tree: &TaxonTree, scale: ScaleMode) -> Vec<f64> {
    let values = tree.nodes().iter().map(|n| n.aggregated_value);
    match scale {
        ScaleMode::Absolute => {
            let total = tree.root().aggregated_value;
            if total > 0.0 {
                values.map(|v| v / total).collect()
            } else {
                values.map(|_| 0.0).collect()
            }
        }
        ScaleMode::Relative => {
            let (min, max) = values
                .clone()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if max > min {
                values.map(|v| (v - min) / (max - min)).collect()
            } else {
                values.map(|_| 0.5).collect()
            }
        }
    }
}

/// Sets emphasis, emphasis class, font size and colour on every node.
///
/// `scale` picks the number, `continuity` picks how that number becomes a
/// label size: continuous interpolates, discontinuous snaps to the class.
pub fn map_emphasis(tree: &mut TaxonTree, scale: ScaleMode, continuity: Continuity, style: &EmphasisStyle) {
    let scaled = scaled_values(tree, scale);
    let top = style.classes.saturating_sub(1).max(1) as f64;

    for (node, &emphasis) in tree.nodes_mut().iter_mut().zip(&scaled) {
        let class = halving_class(emphasis, style.classes);
        let factor = match continuity {
            Continuity::Continuous => emphasis,
            Continuity::Discontinuous => class as f64 / top,
        };
        node.emphasis = emphasis;
        node.emphasis_class = class;
        node.font_size = style.font_size(factor);
        node.color = style.color(class);
    }

    log::debug!("Mapped emphasis ({scale:?}, {continuity:?}) over {} nodes", scaled.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::taxdb::Taxonomy;
    use crate::testing::{sample_records, sample_taxonomy};
    use crate::tree::build;
    use crate::types::{InfoMode, TaxonRecord};

    fn star_tree() -> TaxonTree {
        let mut taxonomy = Taxonomy::new();
        taxonomy
            .insert(1, 1, "root", "no rank")
            .insert(10, 1, "A", "species")
            .insert(11, 1, "B", "species")
            .insert(12, 1, "C", "species");
        let records = vec![TaxonRecord::new(10, 10.0), TaxonRecord::new(11, 5.0), TaxonRecord::new(12, 5.0)];
        let chains = resolve([10, 11, 12], &taxonomy).unwrap();
        build(&records, &chains, InfoMode::Count, &taxonomy).unwrap()
    }

    fn sample_tree() -> TaxonTree {
        let taxonomy = sample_taxonomy();
        let records = sample_records();
        let chains = resolve(records.iter().map(|r| r.id), &taxonomy).unwrap();
        build(&records, &chains, InfoMode::Count, &taxonomy).unwrap()
    }

    #[test]
    fn absolute_emphasis_is_share_of_root() {
        for continuity in [Continuity::Continuous, Continuity::Discontinuous] {
            let mut tree = star_tree();
            map_emphasis(&mut tree, ScaleMode::Absolute, continuity, &EmphasisStyle::default());
            assert_eq!(tree.get(1).unwrap().emphasis, 1.0);
            assert_eq!(tree.get(10).unwrap().emphasis, 0.5);
            assert_eq!(tree.get(11).unwrap().emphasis, 0.25);
            assert_eq!(tree.get(12).unwrap().emphasis, 0.25);
        }
    }

    #[test]
    fn relative_emphasis_spans_zero_to_one() {
        let mut tree = star_tree();
        map_emphasis(&mut tree, ScaleMode::Relative, Continuity::Continuous, &EmphasisStyle::default());
        // values 20, 10, 5, 5 -> min 5, max 20
        assert_eq!(tree.get(1).unwrap().emphasis, 1.0);
        assert_eq!(tree.get(10).unwrap().emphasis, 5.0 / 15.0);
        assert_eq!(tree.get(11).unwrap().emphasis, 0.0);
    }

    #[test]
    fn equal_values_map_to_one_half() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.insert(1, 1, "root", "no rank").insert(2, 1, "only", "species");
        let records = vec![TaxonRecord::new(2, 7.0)];
        let chains = resolve([2], &taxonomy).unwrap();
        let mut tree = build(&records, &chains, InfoMode::Count, &taxonomy).unwrap();

        for continuity in [Continuity::Continuous, Continuity::Discontinuous] {
            map_emphasis(&mut tree, ScaleMode::Relative, continuity, &EmphasisStyle::default());
            assert!(tree.nodes().iter().all(|n| n.emphasis == 0.5));
        }
    }

    #[test]
    fn emphasis_never_decreases_with_value() {
        for scale in [ScaleMode::Absolute, ScaleMode::Relative] {
            for continuity in [Continuity::Continuous, Continuity::Discontinuous] {
                let mut tree = sample_tree();
                map_emphasis(&mut tree, scale, continuity, &EmphasisStyle::default());
                for a in tree.nodes() {
                    for b in tree.nodes() {
                        if a.aggregated_value > b.aggregated_value {
                            assert!(a.emphasis >= b.emphasis);
                            assert!(a.emphasis_class >= b.emphasis_class);
                            assert!(a.font_size >= b.font_size);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn halving_ladder_matches_the_thresholds() {
        assert_eq!(halving_class(1.0, 7), 6);
        assert_eq!(halving_class(0.5, 7), 6);
        assert_eq!(halving_class(0.3, 7), 5);
        assert_eq!(halving_class(0.125, 7), 4);
        assert_eq!(halving_class(0.07, 7), 3);
        assert_eq!(halving_class(0.04, 7), 2);
        assert_eq!(halving_class(0.02, 7), 1);
        assert_eq!(halving_class(0.001, 7), 0);
        assert_eq!(halving_class(0.9, 1), 0);
    }

    #[test]
    fn discontinuous_sizes_are_distinct_steps() {
        let style = EmphasisStyle::default();
        let mut tree = sample_tree();
        map_emphasis(&mut tree, ScaleMode::Absolute, Continuity::Discontinuous, &style);

        let root = tree.root();
        assert_eq!(root.font_size, style.font_max);
        assert_eq!(root.color, "#FF0000");

        // 1386 holds 10 of 80 = 0.125 -> class 4 of 0..=6
        let bacillus = tree.get(1386).unwrap();
        assert_eq!(bacillus.emphasis_class, 4);
        assert_eq!(bacillus.font_size, style.font_size(4.0 / 6.0));
        assert_eq!(bacillus.color, "#FFFF00");
    }

    #[test]
    fn continuous_sizes_interpolate() {
        let style = EmphasisStyle { classes: 7, font_min: 10.0, font_max: 20.0 };
        let mut tree = star_tree();
        map_emphasis(&mut tree, ScaleMode::Absolute, Continuity::Continuous, &style);
        assert_eq!(tree.get(10).unwrap().font_size, 15.0);
        assert_eq!(tree.get(11).unwrap().font_size, 12.5);
    }

    #[test]
    fn palette_stretches_over_fewer_classes() {
        let style = EmphasisStyle { classes: 3, ..EmphasisStyle::default() };
        assert_eq!(style.color(0), PALETTE[0]);
        assert_eq!(style.color(1), PALETTE[3]);
        assert_eq!(style.color(2), PALETTE[6]);
    }
}
