//src/tree.rs

use ahash::AHashMap;

use crate::error::{Result, TaxonError};
use crate::resolve::{lowest_common_ancestor, Chain, Chains};
use crate::taxdb::TaxonomyLookup;
use crate::types::{InfoMode, NodeRecord, Point, Span, TaxId, TaxonRecord, SYNTHETIC_ROOT};

/// Index of a node inside a [`TaxonTree`].
pub type NodeIndex = usize;

/// One node of the induced tree.
///
/// Value fields are filled by the builder; emphasis and style by
/// [`crate::emphasis`]; position and span by [`crate::layout`].
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: TaxId,
    pub name: String,
    pub rank: String,
    pub parent: Option<NodeIndex>,
    /// Children in order of first appearance in the input.
    pub children: Vec<NodeIndex>,
    pub depth: usize,
    /// Value from the node's own input record(s); 0 when it has none.
    pub raw_value: f64,
    /// `raw_value` plus the aggregated values of all children.
    pub aggregated_value: f64,
    pub emphasis: f64,
    pub emphasis_class: usize,
    pub font_size: f64,
    pub color: &'static str,
    pub position: Point,
    pub angle: Option<f64>,
    pub radius: Option<f64>,
    pub span: Span,
}

impl TreeNode {
    fn new(id: TaxId, name: String, rank: String, parent: Option<NodeIndex>, depth: usize) -> Self {
        Self {
            id,
            name,
            rank,
            parent,
            children: Vec::new(),
            depth,
            raw_value: 0.0,
            aggregated_value: 0.0,
            emphasis: 0.0,
            emphasis_class: 0,
            font_size: 0.0,
            color: "",
            position: Point::default(),
            angle: None,
            radius: None,
            span: Span::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed rooted tree. The root is always index 0.
#[derive(Debug, Clone)]
pub struct TaxonTree {
    nodes: Vec<TreeNode>,
    index: AHashMap<TaxId, NodeIndex>,
}

impl TaxonTree {
    pub const ROOT: NodeIndex = 0;

    fn with_root(root: TreeNode) -> Self {
        let mut index = AHashMap::new();
        index.insert(root.id, Self::ROOT);
        Self { nodes: vec![root], index }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[Self::ROOT]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true: a tree always has its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIndex) -> &TreeNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [TreeNode] {
        &mut self.nodes
    }

    pub fn index_of(&self, taxid: TaxId) -> Option<NodeIndex> {
        self.index.get(&taxid).copied()
    }

    pub fn get(&self, taxid: TaxId) -> Option<&TreeNode> {
        self.index_of(taxid).map(|idx| &self.nodes[idx])
    }

    /// Node indices in pre-order, children visited in their stable order.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            // Reversed so the first child is popped first.
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }

    /// Finds or creates `taxid` as a child of `parent`.
    fn attach<L: TaxonomyLookup + ?Sized>(&mut self, parent: NodeIndex, taxid: TaxId, lookup: &L) -> NodeIndex {
        if let Some(&idx) = self.index.get(&taxid) {
            assert_eq!(
                self.nodes[idx].parent,
                Some(parent),
                "taxid {taxid} reached through two different parents"
            );
            return idx;
        }

        let idx = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(TreeNode::new(taxid, name_for(taxid, lookup), rank_for(taxid, lookup), Some(parent), depth));
        self.nodes[parent].children.push(idx);
        self.index.insert(taxid, idx);
        idx
    }

    /// Sums every node's `raw_value` with its descendants' in one bottom-up pass.
    pub fn aggregate(&mut self) {
        let order = self.preorder();
        for node in &mut self.nodes {
            node.aggregated_value = node.raw_value;
        }
        // Reverse pre-order visits every child before its parent.
        for &idx in order.iter().rev() {
            let value = self.nodes[idx].aggregated_value;
            assert!(value >= 0.0, "negative aggregated value {value} at taxid {}", self.nodes[idx].id);
            if let Some(parent) = self.nodes[idx].parent {
                self.nodes[parent].aggregated_value += value;
            }
        }
    }

    /// Number of leaves below (or at) each node, indexed like [`Self::nodes`].
    pub fn leaf_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.nodes.len()];
        for &idx in self.preorder().iter().rev() {
            let node = &self.nodes[idx];
            counts[idx] = if node.is_leaf() {
                1
            } else {
                node.children.iter().map(|&c| counts[c]).sum()
            };
        }
        counts
    }

    /// Finished node records in pre-order (parents before children).
    pub fn records(&self) -> Vec<NodeRecord> {
        let total = self.root().aggregated_value;
        self.preorder()
            .into_iter()
            .map(|idx| {
                let node = &self.nodes[idx];
                NodeRecord {
                    id: node.id,
                    name: node.name.clone(),
                    rank: node.rank.clone(),
                    parent_id: node.parent.map(|p| self.nodes[p].id),
                    depth: node.depth,
                    raw_value: node.raw_value,
                    aggregated_value: node.aggregated_value,
                    share: if total > 0.0 { node.aggregated_value / total } else { 0.0 },
                    emphasis: node.emphasis,
                    emphasis_class: node.emphasis_class,
                    font_size: node.font_size,
                    color: node.color.to_string(),
                    position: node.position,
                    angle: node.angle,
                    radius: node.radius,
                    span: node.span,
                }
            })
            .collect()
    }
}

fn name_for<L: TaxonomyLookup + ?Sized>(taxid: TaxId, lookup: &L) -> String {
    lookup.name_of(taxid).unwrap_or("Unknown").to_string()
}

fn rank_for<L: TaxonomyLookup + ?Sized>(taxid: TaxId, lookup: &L) -> String {
    lookup.rank_of(taxid).unwrap_or("no rank").to_string()
}

/// The value a record contributes to its own node.
///
/// - `Count`: the value itself.
/// - `Ratio` with a total population: `value / total`.
/// - `Ratio` without one: the value is already a ratio and must lie in `(0, 1]`.
pub fn raw_value(record: &TaxonRecord, mode: InfoMode) -> Result<f64> {
    let id = record.id;
    if !record.value.is_finite() || record.value <= 0.0 {
        return Err(TaxonError::InvalidValue { id, value: record.value });
    }

    match (mode, record.total_population) {
        (InfoMode::Count, _) => Ok(record.value),
        (InfoMode::Ratio, Some(total)) => {
            if !total.is_finite() || total <= 0.0 {
                return Err(TaxonError::InvalidValue { id, value: total });
            }
            Ok(record.value / total)
        }
        (InfoMode::Ratio, None) if record.value <= 1.0 => Ok(record.value),
        (InfoMode::Ratio, None) => Err(TaxonError::MissingTotal(id)),
    }
}

/// Merges resolved lineages into one aggregated [`TaxonTree`].
pub struct TreeBuilder<'a, L: TaxonomyLookup + ?Sized> {
    lookup: &'a L,
    mode: InfoMode,
    trim_shared_lineage: bool,
}

impl<'a, L: TaxonomyLookup + ?Sized> TreeBuilder<'a, L> {
    pub fn new(lookup: &'a L, mode: InfoMode) -> Self {
        Self { lookup, mode, trim_shared_lineage: false }
    }

    /// Root the tree at the lowest common ancestor of all inputs instead of
    /// the taxonomy root.
    pub fn trim_shared_lineage(mut self, trim: bool) -> Self {
        self.trim_shared_lineage = trim;
        self
    }

    /// Builds the tree. Every record is validated and must have a chain; on
    /// failure nothing is built.
    pub fn build(&self, records: &[TaxonRecord], chains: &Chains) -> Result<TaxonTree> {
        // 1) Validate everything up front
        let mut valued: Vec<(&Chain, f64)> = Vec::with_capacity(records.len());
        for record in records {
            let value = raw_value(record, self.mode)?;
            let chain = chains.get(&record.id).ok_or(TaxonError::UnknownTaxon(record.id))?;
            valued.push((chain, value));
        }

        // 2) Pick the root
        let lineages: Vec<&Chain> = valued.iter().map(|(chain, _)| *chain).collect();
        let shared_root = self.shared_root(&lineages);
        let mut tree = TaxonTree::with_root(match shared_root {
            Some(root_id) => TreeNode::new(
                root_id,
                name_for(root_id, self.lookup),
                rank_for(root_id, self.lookup),
                None,
                0,
            ),
            None => TreeNode::new(SYNTHETIC_ROOT, "root".to_string(), "no rank".to_string(), None, 0),
        });

        // 3) Merge chains, root to leaf, in input order
        for (chain, value) in &valued {
            // Everything up to and including a shared root is already in the tree.
            let skip = shared_root
                .and_then(|root_id| chain.iter().position(|&t| t == root_id))
                .map_or(0, |pos| pos + 1);

            let mut current = TaxonTree::ROOT;
            for &taxid in &chain[skip..] {
                current = tree.attach(current, taxid, self.lookup);
            }
            if tree.nodes[current].raw_value > 0.0 {
                log::debug!("taxid {} listed more than once; adding values", tree.nodes[current].id);
            }
            tree.nodes[current].raw_value += value;
        }

        // 4) Bottom-up sums
        tree.aggregate();

        log::info!(
            "Built tree with {} nodes from {} records (root {} = {:.4})",
            tree.len(),
            records.len(),
            tree.root().id,
            tree.root().aggregated_value
        );
        Ok(tree)
    }

    /// The taxid every lineage passes through that becomes the tree root:
    /// the common taxonomy root, or the lowest common ancestor when trimming.
    /// `None` means the lineages are disjoint (or absent) and a synthetic
    /// root joins them.
    fn shared_root(&self, lineages: &[&Chain]) -> Option<TaxId> {
        if self.trim_shared_lineage {
            return lowest_common_ancestor(lineages.iter().copied());
        }
        let first = lineages.first()?[0];
        lineages.iter().all(|chain| chain[0] == first).then_some(first)
    }
}

/// Shorthand for `TreeBuilder::new(lookup, mode).build(records, chains)`.
pub fn build<L: TaxonomyLookup + ?Sized>(
    records: &[TaxonRecord],
    chains: &Chains,
    mode: InfoMode,
    lookup: &L,
) -> Result<TaxonTree> {
    TreeBuilder::new(lookup, mode).build(records, chains)
}
