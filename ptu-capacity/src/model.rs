//! Core identifiers shared across discovery and the capacity matrix.

use std::fmt;

/// An Azure region code, always lowercase (e.g. `eastus`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region(String);

impl Region {
    /// Creates a region, trimming and lowercasing the code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Region {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Identity of a model/version pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelKey {
    pub name: String,
    pub version: String,
}

impl ModelKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.version)
    }
}

/// A PTU-capable model observed in one region's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSighting {
    pub region: Region,
    pub name: String,
    pub version: String,
    pub min_ptus: u32,
}

impl ModelSighting {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.name.clone(), self.version.clone())
    }
}

/// A deduplicated PTU-capable model/version across all regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSku {
    pub name: String,
    pub version: String,
    /// Minimum provisioned throughput units for one deployment.
    pub min_ptus: u32,
    /// Regions whose listing reported this model, in first-seen order.
    pub regions: Vec<Region>,
}

impl ModelSku {
    pub fn new(name: impl Into<String>, version: impl Into<String>, min_ptus: u32) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            min_ptus,
            regions: Vec::new(),
        }
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.name.clone(), self.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_normalization() {
        assert_eq!(Region::new(" EastUS ").as_str(), "eastus");
        assert_eq!(Region::from("WestEurope"), Region::new("westeurope"));
        assert!(Region::new("  ").is_empty());
    }

    #[test]
    fn test_region_ordering_is_lexicographic() {
        let mut regions = vec![Region::new("westus"), Region::new("brazilsouth"), Region::new("eastus")];
        regions.sort();
        let codes: Vec<&str> = regions.iter().map(Region::as_str).collect();
        assert_eq!(codes, vec!["brazilsouth", "eastus", "westus"]);
    }

    #[test]
    fn test_model_key_display() {
        assert_eq!(ModelKey::new("gpt-4o", "2024-05-13").to_string(), "gpt-4o_2024-05-13");
    }
}
