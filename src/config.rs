//! Resolver configuration and per-call resolution switches.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use crate::data::filter::FilterMethod;
use crate::data::codebook::Codebook;
use crate::error::Result;

/// Settings owned by an [`Isomme`](crate::Isomme) collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum recursion depth of a single resolution.
    pub max_depth: usize,
    /// Filter variant used for filter-on-demand.
    pub filter_method: FilterMethod,
    /// Codebook replacing the bundled one. Must be installed before the first
    /// code is validated.
    pub codebook: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            filter_method: FilterMethod::default(),
            codebook: None,
        }
    }
}

impl ResolverConfig {
    /// Load from a JSON file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Install the configured codebook process-wide. Fails if another
    /// codebook has already been used for validation.
    pub fn install_codebook(&self) -> Result<()> {
        match &self.codebook {
            Some(path) => Codebook::install(Codebook::from_path(path)?),
            None => Ok(()),
        }
    }
}

/// Which resolution strategies a lookup may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub filter: bool,
    pub calculate: bool,
    pub differentiate: bool,
    pub integrate: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            filter: true,
            calculate: true,
            differentiate: true,
            integrate: true,
        }
    }
}

impl ResolveOptions {
    /// Defaults used by [`Isomme::get_channels`](crate::Isomme::get_channels):
    /// no derivation by differentiation or integration.
    pub fn collection() -> Self {
        Self {
            differentiate: false,
            integrate: false,
            ..Self::default()
        }
    }

    /// Only channels already present in the collection.
    pub fn existing_only() -> Self {
        Self {
            filter: false,
            calculate: false,
            differentiate: false,
            integrate: false,
        }
    }

    pub fn with_filter(mut self, filter: bool) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_calculate(mut self, calculate: bool) -> Self {
        self.calculate = calculate;
        self
    }

    pub fn with_differentiate(mut self, differentiate: bool) -> Self {
        self.differentiate = differentiate;
        self
    }

    pub fn with_integrate(mut self, integrate: bool) -> Self {
        self.integrate = integrate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ResolverConfig = serde_json::from_str(r#"{"filter_method": "SaeJ211"}"#).unwrap();
        assert_eq!(config.filter_method, FilterMethod::SaeJ211);
        assert_eq!(config.max_depth, 32);
        assert!(config.codebook.is_none());
    }

    #[test]
    fn test_collection_options() {
        let options = ResolveOptions::collection();
        assert!(options.filter && options.calculate);
        assert!(!options.differentiate && !options.integrate);
    }
}
