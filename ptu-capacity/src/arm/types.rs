//! Wire types for the Cognitive Services management endpoints.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! payloads is ignored. Optional fields default rather than fail so that a
//! single odd descriptor cannot break a whole listing.

use serde::Deserialize;

/// One page of a paginated ARM list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// A resource SKU descriptor from the subscription-wide SKU listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSku {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

/// A model offered in one region.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelDescriptor {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub model: Option<ModelInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub skus: Vec<ModelSkuInfo>,
}

/// A deployment SKU a model supports (e.g. `Standard`, `ProvisionedManaged`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelSkuInfo {
    pub name: String,
    #[serde(default)]
    pub capacity: Option<SkuCapacity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkuCapacity {
    #[serde(default)]
    pub minimum: Option<u32>,
    #[serde(default)]
    pub maximum: Option<u32>,
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub default: Option<u32>,
}

/// Available capacity for one model in one location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelCapacityEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub properties: CapacityProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityProperties {
    #[serde(default)]
    pub available_capacity: Option<i64>,
}

impl ModelCapacityEntry {
    /// Available units, with negative or missing values read as zero.
    pub fn available(&self) -> u32 {
        self.properties
            .available_capacity
            .map(|units| u32::try_from(units.max(0)).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}

/// The ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
