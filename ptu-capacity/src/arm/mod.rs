//! Azure Resource Manager access for Cognitive Services.
//!
//! [`CapacityApi`] is the seam the discovery and matrix stages are written
//! against; [`ManagementClient`] implements it over HTTP with bearer tokens
//! for [`crate::auth::MANAGEMENT_SCOPE`], following `nextLink` pagination on
//! every listing.

mod api;
mod client;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{ApiError, CapacityApi, OPENAI_KIND, PTU_SKU_NAME};
pub use client::{ManagementClient, DEFAULT_MANAGEMENT_ENDPOINT};
pub use types::{
    CapacityProperties, ModelCapacityEntry, ModelDescriptor, ModelInfo, ModelSkuInfo, Page,
    ResourceSku, SkuCapacity,
};
