//! Canonical action unit feature schema

use serde::{Deserialize, Serialize};

/// Schema identifier for the reference feature list
pub const SCHEMA_VERSION: &str = "au.features.v1";

/// The 32 action unit columns every shipped model was trained on.
///
/// `_r` columns are intensities, `_c` columns are presence indicators.
pub const REFERENCE_AU_FEATURES: [&str; 32] = [
    "AU02_r", "AU04_r", "AU05_r", "AU06_r", "AU07_r", "AU09_r", "AU10_r", "AU12_r", "AU14_r",
    "AU15_r", "AU17_r", "AU20_r", "AU25_r", "AU26_r", "AU45_r", "AU01_c", "AU02_c", "AU04_c",
    "AU05_c", "AU06_c", "AU07_c", "AU09_c", "AU10_c", "AU12_c", "AU14_c", "AU15_c", "AU20_c",
    "AU23_c", "AU25_c", "AU26_c", "AU28_c", "AU45_c",
];

/// Prefix shared by all action unit columns
pub const AU_COLUMN_PREFIX: &str = "AU";

/// Fixed, ordered list of feature names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::reference()
    }
}

impl FeatureSchema {
    /// The reference 32-feature schema
    pub fn reference() -> Self {
        Self {
            names: REFERENCE_AU_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build a schema from an explicit name list. Names are trimmed and
    /// duplicates after the first occurrence are dropped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        }
        Self { names: out }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// Whether a (trimmed) column name looks like an action unit column
pub fn is_au_column(name: &str) -> bool {
    name.trim().starts_with(AU_COLUMN_PREFIX)
}
