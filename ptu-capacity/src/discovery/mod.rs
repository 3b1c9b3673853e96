//! Region and model discovery.
//!
//! Discovery runs in two stages. Region discovery reads the subscription's
//! resource SKUs and yields the set of regions offering the target account
//! kind. Model discovery then lists every region concurrently and keeps the
//! models that can be deployed with provisioned throughput.
//!
//! Region discovery failing is fatal. A single region's model listing
//! failing is not; the region is reported in
//! [`ModelDiscovery::failed_regions`] and the rest continue.

mod models;
mod regions;

use thiserror::Error;

use crate::arm::ApiError;

pub use models::{
    discover_models, list_region, merge_listings, sightings_from_models, ListingFailure,
    ModelDiscovery, RegionListing,
};
pub use regions::{discover_regions, regions_from_skus};

/// Errors that stop discovery.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DiscoveryError {
    #[error("failed to list resource SKUs: {0}")]
    Regions(#[source] ApiError),
}
