// src/lib.rs
pub mod config;
pub mod emphasis;
pub mod error;
pub mod input;
pub mod layout;
pub mod render;
pub mod resolve;
pub mod taxdb;
pub mod tree;
pub mod types;

#[cfg(test)]
mod testing;

use ahash::AHashMap;

use crate::config::TreeConfig;
use crate::emphasis::map_emphasis;
use crate::error::{Result, TaxonError};
use crate::layout::layout;
use crate::render::{render_tree, HtmlDocument, JsonRecords, TsvReport};
use crate::resolve::resolve_lenient;
use crate::taxdb::TaxonomyLookup;
use crate::tree::{raw_value, TaxonTree, TreeBuilder};
use crate::types::{LayoutKind, NodeRecord, TaxId, TaxonRecord, UnknownPolicy};

/// Everything one run produces. Documents are generated on demand from the
/// node records.
pub struct TaxonTreeResults {
    /// The aggregated, emphasized and positioned tree.
    pub tree: TaxonTree,

    /// Pre-order records handed to render adapters.
    pub node_records: Vec<NodeRecord>,

    /// Records dropped under [`UnknownPolicy::Skip`], one entry per failure.
    pub skipped: Vec<TaxonError>,

    pub layout: LayoutKind,
}

impl TaxonTreeResults {
    /// Node records as a JSON array
    pub fn get_json(&self) -> Result<String> {
        render_tree(&self.node_records, &mut JsonRecords::default())
    }

    /// Indented tab-separated report
    pub fn get_report(&self) -> Result<String> {
        render_tree(&self.node_records, &mut TsvReport::default())
    }

    /// Standalone HTML document
    pub fn get_html(&self, title: &str) -> Result<String> {
        render_tree(&self.node_records, &mut HtmlDocument::new(title, self.layout))
    }
}

/// Runs resolve -> merge/aggregate -> emphasis -> layout over `records`.
///
/// Records that cannot be resolved or carry invalid values are skipped with
/// a warning or abort the run, per `config.on_unknown`. An aborted run
/// returns the offending record's error and no tree.
pub fn build_taxon_tree<L: TaxonomyLookup + ?Sized>(
    records: &[TaxonRecord],
    lookup: &L,
    config: &TreeConfig,
) -> Result<TaxonTreeResults> {
    config.validate()?;

    // 1. Resolve lineages
    let (chains, failures) = resolve_lenient(records.iter().map(|r| r.id), lookup);
    let mut unresolved: AHashMap<TaxId, TaxonError> = failures
        .into_iter()
        .filter_map(|err| err.taxid().map(|id| (id, err)))
        .collect();

    // 2. Keep valid, resolvable records in input order
    let mut kept = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for record in records {
        let failure = match raw_value(record, config.info) {
            Err(err) => Some(err),
            Ok(_) => unresolved.remove(&record.id),
        };
        let failure = match failure {
            Some(err) => err,
            None if chains.contains_key(&record.id) => {
                kept.push(record.clone());
                continue;
            }
            // Same unresolved taxid listed again; already handled.
            None => continue,
        };

        match config.on_unknown {
            UnknownPolicy::Abort => return Err(failure),
            UnknownPolicy::Skip => {
                log::warn!("Skipping record: {failure}");
                skipped.push(failure);
            }
        }
    }

    if kept.is_empty() && !records.is_empty() {
        log::warn!("None of the {} input records could be used; the tree is a lone root", records.len());
    }

    // 3. Merge and aggregate
    let mut tree = TreeBuilder::new(lookup, config.info)
        .trim_shared_lineage(config.trim_shared_lineage)
        .build(&kept, &chains)?;

    // 4. Emphasis, 5. layout
    map_emphasis(&mut tree, config.scale, config.continuity, &config.style);
    layout(&mut tree, config.layout, &config.spacing);

    let node_records = tree.records();
    log::info!(
        "{} tree ready: {} nodes, {} records used, {} skipped",
        match config.layout {
            LayoutKind::Circular => "Circular",
            LayoutKind::Linear => "Linear",
        },
        node_records.len(),
        kept.len(),
        skipped.len()
    );

    Ok(TaxonTreeResults {
        tree,
        node_records,
        skipped,
        layout: config.layout,
    })
}
