//src/resolve.rs

use ahash::{AHashMap, AHashSet};

use crate::error::{Result, TaxonError};
use crate::taxdb::TaxonomyLookup;
use crate::types::{TaxId, SYNTHETIC_ROOT};

/// Upper bound on ancestor steps for one lineage; also bounds tree depth.
pub const MAX_LINEAGE_DEPTH: usize = 128;

/// Ordered path `[root, ..., taxid]`.
pub type Chain = Vec<TaxId>;

/// taxid -> its ancestor chain.
pub type Chains = AHashMap<TaxId, Chain>;

/// Walks `parent_of` from `taxid` up to its root.
///
/// A parent that the taxonomy does not know ends the walk, the same way a
/// missing parent does when climbing for an LCA. Taxid 0 is reserved for the
/// synthetic root and never resolves.
pub fn resolve_chain<L: TaxonomyLookup + ?Sized>(taxid: TaxId, lookup: &L) -> Result<Chain> {
    if taxid == SYNTHETIC_ROOT || !lookup.contains(taxid) {
        return Err(TaxonError::UnknownTaxon(taxid));
    }

    let mut lineage = vec![taxid];
    let mut current = taxid;
    while let Some(parent) = lookup.parent_of(current) {
        if parent == SYNTHETIC_ROOT || !lookup.contains(parent) {
            log::debug!("taxid {current} points at unknown parent {parent}; treating it as a root");
            break;
        }
        if lineage.len() > MAX_LINEAGE_DEPTH {
            return Err(TaxonError::TaxonomyCycle { id: taxid, depth: MAX_LINEAGE_DEPTH });
        }
        lineage.push(parent);
        current = parent;
    }

    lineage.reverse();
    Ok(lineage)
}

/// Resolves every id, aborting on the first failure.
pub fn resolve<I, L>(ids: I, lookup: &L) -> Result<Chains>
where
    I: IntoIterator<Item = TaxId>,
    L: TaxonomyLookup + ?Sized,
{
    let mut chains = Chains::new();
    for taxid in ids {
        if chains.contains_key(&taxid) {
            continue;
        }
        let chain = resolve_chain(taxid, lookup)?;
        chains.insert(taxid, chain);
    }
    Ok(chains)
}

/// Resolves every id, collecting failures instead of stopping at them.
/// Failures come back in input order, one per distinct failing id.
pub fn resolve_lenient<I, L>(ids: I, lookup: &L) -> (Chains, Vec<TaxonError>)
where
    I: IntoIterator<Item = TaxId>,
    L: TaxonomyLookup + ?Sized,
{
    let mut chains = Chains::new();
    let mut failed = AHashSet::new();
    let mut failures = Vec::new();

    for taxid in ids {
        if chains.contains_key(&taxid) || failed.contains(&taxid) {
            continue;
        }
        match resolve_chain(taxid, lookup) {
            Ok(chain) => {
                chains.insert(taxid, chain);
            }
            Err(err) => {
                failed.insert(taxid);
                failures.push(err);
            }
        }
    }
    (chains, failures)
}

/// Lowest common ancestor of two lineages, or `None` if they share no root.
pub fn lca(a: &[TaxId], b: &[TaxId]) -> Option<TaxId> {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .last()
        .map(|(x, _)| *x)
}

/// Deepest taxid shared by every chain. `None` when there are no chains or
/// they hang from different roots.
pub fn lowest_common_ancestor<'a, I>(chains: I) -> Option<TaxId>
where
    I: IntoIterator<Item = &'a Chain>,
{
    let mut iter = chains.into_iter();
    let first = iter.next()?;
    let mut shared: &[TaxId] = first;

    for chain in iter {
        let candidate = lca(shared, chain)?;
        let depth = shared.iter().position(|&t| t == candidate)?;
        shared = &shared[..=depth];
    }

    shared.last().copied()
}
