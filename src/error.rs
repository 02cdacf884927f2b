//src/error.rs

use thiserror::Error;

use crate::types::TaxId;

#[derive(Error, Debug)]
pub enum TaxonError {
    #[error("taxid {0} is not present in the taxonomy")]
    UnknownTaxon(TaxId),

    #[error("lineage of taxid {id} exceeds {depth} ancestors (cycle or malformed taxonomy)")]
    TaxonomyCycle { id: TaxId, depth: usize },

    #[error("taxid {id} has a non-positive or non-finite value: {value}")]
    InvalidValue { id: TaxId, value: f64 },

    #[error("taxid {0} needs a total population to derive its ratio")]
    MissingTotal(TaxId),

    #[error("no valid taxids found in the input data")]
    NoValidTaxa,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl TaxonError {
    /// True for failures that concern a single input record, where the
    /// caller may choose to skip the record instead of aborting the run.
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            TaxonError::UnknownTaxon(_)
                | TaxonError::TaxonomyCycle { .. }
                | TaxonError::InvalidValue { .. }
                | TaxonError::MissingTotal(_)
        )
    }

    /// The offending taxid of a per-record failure.
    pub fn taxid(&self) -> Option<TaxId> {
        match self {
            TaxonError::UnknownTaxon(id) | TaxonError::MissingTotal(id) => Some(*id),
            TaxonError::TaxonomyCycle { id, .. } | TaxonError::InvalidValue { id, .. } => Some(*id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaxonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_level_errors_carry_their_taxid() {
        let err = TaxonError::UnknownTaxon(9606);
        assert!(err.is_per_record());
        assert_eq!(err.taxid(), Some(9606));
        assert!(err.to_string().contains("9606"));

        let err = TaxonError::InvalidValue { id: 562, value: -1.0 };
        assert!(err.is_per_record());
        assert_eq!(err.taxid(), Some(562));
    }

    #[test]
    fn ambient_errors_are_not_per_record() {
        let err = TaxonError::Config("bad".into());
        assert!(!err.is_per_record());
        assert_eq!(err.taxid(), None);
        assert!(!TaxonError::NoValidTaxa.is_per_record());

        let err: TaxonError = std::fmt::Error.into();
        assert!(matches!(err, TaxonError::Fmt(_)));
        assert!(!err.is_per_record());
    }
}
