use std::path::Path;
use std::sync::OnceLock;

use log::error;
use serde::{Deserialize, Serialize};

use super::pattern::glob_match;
use crate::error::{Error, Result};

/// Codebook shipped with the crate.
const BUNDLED: &str = include_str!("../../data/channel_codes.json");

static GLOBAL: OnceLock<Codebook> = OnceLock::new();

// ---------------------------------------------------------------------------
// Codebook – admissible values per code field
// ---------------------------------------------------------------------------

/// One admissible value (or glob of values) for a code field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebookEntry {
    pub pattern: String,
    pub description: String,
    #[serde(default)]
    pub default_unit: Option<String>,
}

/// All entries for one field of the channel code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebookElement {
    /// Field key, e.g. `main_location`.
    pub field: String,
    /// Display name, e.g. `Main Location`.
    pub name: String,
    pub entries: Vec<CodebookEntry>,
}

/// Static per-field admissibility table consulted by code validation.
///
/// Loaded once per process: either installed explicitly with
/// [`Codebook::install`] or taken from the bundled `channel_codes.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    pub elements: Vec<CodebookElement>,
}

impl Codebook {
    pub fn from_json(text: &str) -> Result<Self> {
        let codebook: Codebook = serde_json::from_str(text)?;
        if codebook.elements.is_empty() {
            return Err(Error::Codebook("codebook contains no elements".into()));
        }
        Ok(codebook)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// The process-wide codebook.
    pub fn global() -> &'static Codebook {
        GLOBAL.get_or_init(|| {
            Codebook::from_json(BUNDLED).unwrap_or_else(|e| {
                error!("Bundled codebook unusable: {e}");
                Codebook::default()
            })
        })
    }

    /// Replace the bundled codebook. Only possible before the first lookup,
    /// unless the codebook in use is identical.
    pub fn install(codebook: Codebook) -> Result<()> {
        if GLOBAL.get() == Some(&codebook) {
            return Ok(());
        }
        GLOBAL
            .set(codebook)
            .map_err(|_| Error::Codebook("a different codebook is already in use".into()))
    }

    pub fn element(&self, field: &str) -> Option<&CodebookElement> {
        self.elements.iter().find(|e| e.field == field)
    }

    /// First entry of `field` whose pattern matches `value`.
    pub fn lookup(&self, field: &str, value: &str) -> Option<&CodebookEntry> {
        self.element(field)?
            .entries
            .iter()
            .find(|entry| glob_match(value, &entry.pattern))
    }

    /// A field value is admissible if it is pure wildcard or matches an entry.
    pub fn admits(&self, field: &str, value: &str) -> bool {
        value.chars().all(|c| c == '?') || self.lookup(field, value).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_parses() {
        let codebook = Codebook::from_json(BUNDLED).unwrap();
        assert!(codebook.element("main_location").is_some());
        assert_eq!(
            codebook.lookup("physical_dimension", "AC").unwrap().default_unit.as_deref(),
            Some("g0")
        );
    }

    #[test]
    fn test_admits() {
        let codebook = Codebook::from_json(BUNDLED).unwrap();
        assert!(codebook.admits("main_location", "HEAD"));
        assert!(codebook.admits("main_location", "????"));
        assert!(!codebook.admits("main_location", "ZZZZ"));
        assert!(codebook.admits("fine_location_2", "3C"));
    }

    #[test]
    fn test_reinstalling_active_codebook() {
        let active = Codebook::global().clone();
        assert!(Codebook::install(active.clone()).is_ok());

        let mut other = active;
        other.elements.truncate(1);
        assert!(matches!(Codebook::install(other), Err(Error::Codebook(_))));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(Codebook::from_json(r#"{"elements": []}"#).is_err());
    }
}
