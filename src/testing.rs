//! Synthetic taxonomies shared by the unit tests.

use crate::taxdb::Taxonomy;
use crate::types::TaxonRecord;

/// ```text
/// 1 root
/// ├── 2 Bacteria
/// │   ├── 1224 Proteobacteria
/// │   │   ├── 561 Escherichia
/// │   │   │   └── 562 Escherichia coli
/// │   │   └── 590 Salmonella
/// │   │       └── 28901 Salmonella enterica
/// │   └── 1239 Firmicutes
/// │       └── 1386 Bacillus
/// └── 2759 Eukaryota
///     └── 9606 Homo sapiens
/// ```
pub fn sample_taxonomy() -> Taxonomy {
    let mut taxonomy = Taxonomy::new();
    taxonomy
        .insert(1, 1, "root", "no rank")
        .insert(2, 1, "Bacteria", "superkingdom")
        .insert(1224, 2, "Proteobacteria", "phylum")
        .insert(561, 1224, "Escherichia", "genus")
        .insert(562, 561, "Escherichia coli", "species")
        .insert(590, 1224, "Salmonella", "genus")
        .insert(28901, 590, "Salmonella enterica", "species")
        .insert(1239, 2, "Firmicutes", "phylum")
        .insert(1386, 1239, "Bacillus", "genus")
        .insert(2759, 1, "Eukaryota", "superkingdom")
        .insert(9606, 2759, "Homo sapiens", "species");
    taxonomy
}

pub fn sample_records() -> Vec<TaxonRecord> {
    vec![
        TaxonRecord::new(562, 40.0),
        TaxonRecord::new(28901, 20.0),
        TaxonRecord::new(1386, 10.0),
        TaxonRecord::new(9606, 5.0),
        TaxonRecord::new(1224, 5.0),
    ]
}
