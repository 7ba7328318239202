use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::pattern::glob_match;

// ---------------------------------------------------------------------------
// MetadataValue – a single info value
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value as found in channel and test headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "NOVALUE"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`; numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<usize> for MetadataValue {
    fn from(v: usize) -> Self {
        MetadataValue::Integer(v as i64)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl<T: Into<MetadataValue>> From<Option<T>> for MetadataValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(MetadataValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Info – ordered multimap of labelled values
// ---------------------------------------------------------------------------

/// Ordered label → value list. Duplicate labels are allowed and insertion
/// order is significant; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Info {
    entries: Vec<(String, MetadataValue)>,
}

impl Info {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Append an entry, keeping any existing entries with the same label.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<MetadataValue>) -> &mut Self {
        self.entries.push((label.into(), value.into()));
        self
    }

    /// Replace the first entry with this exact label, or append if absent.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<MetadataValue>) -> &mut Self {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
        self
    }

    /// Append `value` to an existing entry as `"old; value"`, or create it.
    pub fn append_to(&mut self, label: &str, value: impl Into<MetadataValue>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == label) {
            Some(entry) => entry.1 = MetadataValue::String(format!("{}; {}", entry.1, value)),
            None => self.entries.push((label.to_string(), value)),
        }
        self
    }

    pub fn extend(&mut self, other: &Info) -> &mut Self {
        self.entries.extend(other.entries.iter().cloned());
        self
    }

    /// First value whose label equals or glob-matches one of `labels`, or
    /// (tried per label) regex-matches from the start of the label.
    ///
    /// Labels are tried in order, so earlier labels take precedence.
    pub fn get(&self, labels: &[&str]) -> Option<&MetadataValue> {
        labels.iter().find_map(|label| {
            let regex = Regex::new(&format!("^(?:{label})")).ok();
            self.entries
                .iter()
                .find(|(key, _)| {
                    key == label
                        || glob_match(key, label)
                        || regex.as_ref().is_some_and(|r| r.is_match(key))
                })
                .map(|(_, v)| v)
        })
    }

    /// All values whose label glob-matches `label`.
    pub fn get_all(&self, label: &str) -> Vec<&MetadataValue> {
        self.entries
            .iter()
            .filter(|(key, _)| glob_match(key, label))
            .map(|(_, v)| v)
            .collect()
    }

    pub fn get_f64(&self, labels: &[&str]) -> Option<f64> {
        self.get(labels).and_then(MetadataValue::as_f64)
    }
}

impl FromIterator<(String, MetadataValue)> for Info {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Info {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_keep_order() {
        let mut info = Info::new();
        info.push("Data source", "Test")
            .push("Data source", "Calculation")
            .push("Sampling interval", 1e-4);
        assert_eq!(info.len(), 3);
        assert_eq!(info.get(&["Data source"]), Some(&MetadataValue::from("Test")));
        assert_eq!(info.get_all("Data source").len(), 2);
    }

    #[test]
    fn test_glob_and_regex_lookup() {
        let mut info = Info::new();
        info.push("Name of channel 001", "11HEAD0000H3ACXA")
            .push("Name of channel 002", "11HEAD0000H3ACYA");
        assert_eq!(
            info.get(&["Name of channel 00?"]).and_then(|v| v.as_str()),
            Some("11HEAD0000H3ACXA")
        );
        assert_eq!(
            info.get(&[r"Name of channel \d+2"]).and_then(|v| v.as_str()),
            Some("11HEAD0000H3ACYA")
        );
        assert!(info.get(&["Missing", "Also missing"]).is_none());
    }

    #[test]
    fn test_append_to() {
        let mut info = Info::new();
        info.append_to("Calculation History", "abs(x)");
        info.append_to("Calculation History", "x^2");
        assert_eq!(
            info.get(&["Calculation History"]).and_then(|v| v.as_str()),
            Some("abs(x); x^2")
        );
    }

    #[test]
    fn test_numeric_strings() {
        let mut info = Info::new();
        info.push("Sampling interval", "0.0001");
        assert_eq!(info.get_f64(&["Sampling interval"]), Some(1e-4));
    }
}
