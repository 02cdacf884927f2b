//src/config.rs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::emphasis::EmphasisStyle;
use crate::error::{Result, TaxonError};
use crate::layout::LayoutSpacing;
use crate::types::{Continuity, InfoMode, LayoutKind, ScaleMode, UnknownPolicy};

/// Every switch the pipeline reads. Missing keys take their defaults.
///
/// ```toml
/// info = "count"
/// scale = "relative"
/// layout = "linear"
///
/// [style]
/// font_max = 36.0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    pub info: InfoMode,
    pub scale: ScaleMode,
    pub continuity: Continuity,
    pub layout: LayoutKind,
    pub on_unknown: UnknownPolicy,
    pub trim_shared_lineage: bool,
    pub style: EmphasisStyle,
    pub spacing: LayoutSpacing,
}

impl TreeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| TaxonError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Rejects values the emphasis mapper or layout engine cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.style.classes == 0 {
            return Err(TaxonError::Config("style.classes must be at least 1".into()));
        }
        if !(self.style.font_min > 0.0 && self.style.font_min <= self.style.font_max) {
            return Err(TaxonError::Config(format!(
                "style.font_min ({}) must be positive and not above style.font_max ({})",
                self.style.font_min, self.style.font_max
            )));
        }
        if !(self.spacing.level_gap > 0.0 && self.spacing.leaf_gap > 0.0) {
            return Err(TaxonError::Config("spacing gaps must be positive".into()));
        }
        Ok(())
    }
}
