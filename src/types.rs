//src/types.rs

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// NCBI-style numeric taxon identifier.
pub type TaxId = u32;

/// Id given to the synthetic root that joins disjoint lineages.
pub const SYNTHETIC_ROOT: TaxId = 0;

/// One line of the input table.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonRecord {
    pub id: TaxId,
    /// Absolute count, or a ratio, depending on [`InfoMode`].
    pub value: f64,
    /// Needed only when the ratio must be derived from a raw count.
    pub total_population: Option<f64>,
}

impl TaxonRecord {
    pub fn new(id: TaxId, value: f64) -> Self {
        Self { id, value, total_population: None }
    }

    pub fn with_total(id: TaxId, value: f64, total_population: f64) -> Self {
        Self { id, value, total_population: Some(total_population) }
    }
}

/// What the value column of the input holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoMode {
    Count,
    #[default]
    Ratio,
}

/// Which number stands for a node's importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Share of the whole tree.
    #[default]
    Absolute,
    /// Min-max normalized over the nodes of this tree.
    Relative,
}

/// How the importance number becomes a visual step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Continuity {
    Continuous,
    #[default]
    Discontinuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Circular,
    Linear,
}

/// What to do with a record whose taxid cannot be resolved or whose value is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    #[default]
    Skip,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Allocated extent of a subtree: leaf units for linear layouts, radians for circular ones.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// A finished tree node, as handed to a render adapter.
///
/// Carries everything needed to draw the node, its edge to the parent and
/// its label without touching the tree again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: TaxId,
    pub name: String,
    pub rank: String,
    pub parent_id: Option<TaxId>,
    pub depth: usize,
    pub raw_value: f64,
    pub aggregated_value: f64,
    /// `aggregated_value` over the root's aggregated value.
    pub share: f64,
    pub emphasis: f64,
    pub emphasis_class: usize,
    pub font_size: f64,
    pub color: String,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub span: Span,
}
