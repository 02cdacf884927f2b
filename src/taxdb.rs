//src/taxdb.rs

use ahash::AHashMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use crate::input::open_text;
use crate::types::TaxId;

pub type ParentMap = AHashMap<TaxId, TaxId>;
pub type NameMap = AHashMap<TaxId, String>;
pub type RankMap = AHashMap<TaxId, String>;

/// Read-only view of a taxonomy, consistent for a whole run.
pub trait TaxonomyLookup {
    fn contains(&self, taxid: TaxId) -> bool;

    /// Parent of `taxid`, or `None` for a root (or an unknown taxid).
    fn parent_of(&self, taxid: TaxId) -> Option<TaxId>;

    fn name_of(&self, taxid: TaxId) -> Option<&str>;

    fn rank_of(&self, _taxid: TaxId) -> Option<&str> {
        None
    }
}

/// In-memory taxonomy built from a taxDB file, an NCBI dump, or by hand.
#[derive(Debug, Default, Clone)]
pub struct Taxonomy {
    parents: ParentMap,
    names: NameMap,
    ranks: RankMap,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(parents: ParentMap, names: NameMap, ranks: RankMap) -> Self {
        Self { parents, names, ranks }
    }

    /// Adds or replaces one taxon. A root is recorded as its own parent.
    pub fn insert(
        &mut self,
        taxid: TaxId,
        parent: TaxId,
        name: impl Into<String>,
        rank: impl Into<String>,
    ) -> &mut Self {
        self.parents.insert(taxid, parent);
        self.names.insert(taxid, name.into());
        self.ranks.insert(taxid, rank.into());
        self
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Loads a taxonomy from `path`:
    /// - a directory is read as an NCBI taxdump (`nodes.dmp` + `names.dmp`)
    /// - a file is read as a Kraken-style taxDB
    ///
    /// Either may be gzipped.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let taxonomy = if path.is_dir() {
            load_ncbi_dump(path)?
        } else {
            let (parents, names, ranks) = parse_taxdb(path)?;
            Self::from_maps(parents, names, ranks)
        };
        log::info!("Loaded taxonomy with {} taxa from {}", taxonomy.len(), path.display());
        Ok(taxonomy)
    }
}

impl TaxonomyLookup for Taxonomy {
    fn contains(&self, taxid: TaxId) -> bool {
        self.parents.contains_key(&taxid)
    }

    fn parent_of(&self, taxid: TaxId) -> Option<TaxId> {
        match self.parents.get(&taxid) {
            Some(&parent) if parent != taxid && parent != 0 => Some(parent),
            _ => None,
        }
    }

    fn name_of(&self, taxid: TaxId) -> Option<&str> {
        self.names.get(&taxid).map(String::as_str)
    }

    fn rank_of(&self, taxid: TaxId) -> Option<&str> {
        self.ranks.get(&taxid).map(String::as_str)
    }
}

/// Parses a taxDB file in the format:
/// ```text
/// <taxid>\t<parentid>\t<taxname>\t<rank>
/// ```
/// Returns:
/// - a `ParentMap` mapping child_taxid -> parent_taxid
/// - a `NameMap` mapping taxid -> taxname
/// - a `RankMap` mapping taxid -> rank
pub fn parse_taxdb<P: AsRef<Path>>(filepath: P) -> io::Result<(ParentMap, NameMap, RankMap)> {
    let reader = open_text(filepath)?;

    let mut parent_map = ParentMap::new();
    let mut name_map = NameMap::new();
    let mut rank_map = RankMap::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        // e.g. "2\t1\tEukaryota\tdomain"
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 4 {
            log::debug!("taxDB line {}: expected 4 fields, skipping", line_no + 1);
            continue;
        }

        let (Ok(taxid), Ok(parentid)) = (parts[0].trim().parse::<TaxId>(), parts[1].trim().parse::<TaxId>())
        else {
            log::debug!("taxDB line {}: non-numeric taxid, skipping", line_no + 1);
            continue;
        };

        if taxid != 0 {
            parent_map.insert(taxid, parentid);
            name_map.insert(taxid, parts[2].trim().to_string());
            rank_map.insert(taxid, parts[3].trim().to_string());
        }
    }
    Ok((parent_map, name_map, rank_map))
}

/// Splits one `.dmp` row (`a\t|\tb\t|\t...\t|`) into trimmed fields.
fn dmp_fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\n', '\r'])
        .trim_end_matches('|')
        .split('|')
        .map(str::trim)
        .collect()
}

/// Parses NCBI `nodes.dmp`: `taxid | parent | rank | ...`.
pub fn parse_ncbi_nodes<P: AsRef<Path>>(filepath: P) -> io::Result<(ParentMap, RankMap)> {
    let reader = open_text(filepath)?;
    let mut parent_map = ParentMap::new();
    let mut rank_map = RankMap::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let fields = dmp_fields(&line);
        if fields.len() < 3 {
            log::debug!("nodes.dmp line {}: expected 3+ fields, skipping", line_no + 1);
            continue;
        }
        let (Ok(taxid), Ok(parent)) = (fields[0].parse::<TaxId>(), fields[1].parse::<TaxId>()) else {
            log::debug!("nodes.dmp line {}: non-numeric taxid, skipping", line_no + 1);
            continue;
        };
        if taxid != 0 {
            parent_map.insert(taxid, parent);
            rank_map.insert(taxid, fields[2].to_string());
        }
    }
    Ok((parent_map, rank_map))
}

/// Parses NCBI `names.dmp`, keeping only `scientific name` entries.
pub fn parse_ncbi_names<P: AsRef<Path>>(filepath: P) -> io::Result<NameMap> {
    let reader = open_text(filepath)?;
    let mut name_map = NameMap::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let fields = dmp_fields(&line);
        if fields.len() < 4 || fields[3] != "scientific name" {
            continue;
        }
        if let Some(taxid) = fields[0].parse::<TaxId>().ok().filter(|&t| t != 0) {
            name_map.insert(taxid, fields[1].to_string());
        }
    }
    Ok(name_map)
}

/// Finds `<stem>` or `<stem>.gz` inside `dir`.
fn dump_file(dir: &Path, stem: &str) -> io::Result<PathBuf> {
    let plain = dir.join(stem);
    if plain.is_file() {
        return Ok(plain);
    }
    let gz = dir.join(format!("{stem}.gz"));
    if gz.is_file() {
        return Ok(gz);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found in {}", stem, dir.display()),
    ))
}

/// Loads an extracted NCBI taxdump directory.
pub fn load_ncbi_dump<P: AsRef<Path>>(dir: P) -> io::Result<Taxonomy> {
    let dir = dir.as_ref();
    let (parents, ranks) = parse_ncbi_nodes(dump_file(dir, "nodes.dmp")?)?;
    let names = parse_ncbi_names(dump_file(dir, "names.dmp")?)?;
    Ok(Taxonomy::from_maps(parents, names, ranks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;

    const TAXDB: &str = "1\t1\troot\tno rank\n\
                         2\t1\tBacteria\tsuperkingdom\n\
                         561\t2\tEscherichia\tgenus\n\
                         broken line\n\
                         562\t561\tEscherichia coli\tspecies\n";

    #[test]
    fn parses_kraken_taxdb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxDB");
        fs::write(&path, TAXDB).unwrap();

        let taxonomy = Taxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.len(), 4);
        assert_eq!(taxonomy.parent_of(562), Some(561));
        assert_eq!(taxonomy.parent_of(1), None, "self-parented root has no parent");
        assert_eq!(taxonomy.name_of(562), Some("Escherichia coli"));
        assert_eq!(taxonomy.rank_of(561), Some("genus"));
        assert!(!taxonomy.contains(9606));
    }

    #[test]
    fn parses_gzipped_taxdb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxDB.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(TAXDB.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let taxonomy = Taxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.parent_of(2), Some(1));
    }

    #[test]
    fn loads_ncbi_dump_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("nodes.dmp"),
            "0\t|\t0\t|\tno rank\t|\t\t|\n\
             1\t|\t1\t|\tno rank\t|\t\t|\n\
             2\t|\t131567\t|\tsuperkingdom\t|\t\t|\n\
             131567\t|\t1\t|\tno rank\t|\t\t|\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("names.dmp"),
            "0\t|\tunclassified\t|\t\t|\tscientific name\t|\n\
             1\t|\tall\t|\t\t|\tsynonym\t|\n\
             1\t|\troot\t|\t\t|\tscientific name\t|\n\
             2\t|\tBacteria\t|\tBacteria <bacteria>\t|\tscientific name\t|\n\
             131567\t|\tcellular organisms\t|\t\t|\tscientific name\t|\n",
        )
        .unwrap();

        let taxonomy = Taxonomy::load(dir.path()).unwrap();
        assert_eq!(taxonomy.len(), 3);
        assert_eq!(taxonomy.parent_of(2), Some(131567));
        assert_eq!(taxonomy.name_of(1), Some("root"));
        assert_eq!(taxonomy.rank_of(2), Some("superkingdom"));
        // 0 is reserved for the synthetic root
        assert!(!taxonomy.contains(0));
        assert_eq!(taxonomy.name_of(0), None);
    }

    #[test]
    fn missing_dump_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ncbi_dump(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
