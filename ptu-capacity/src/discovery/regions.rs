//! Region discovery from the subscription's resource SKU listing.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::DiscoveryError;
use crate::arm::{CapacityApi, ResourceSku};
use crate::model::Region;

/// Whether a SKU descriptor belongs to the target account kind.
///
/// Descriptors without a kind are kept.
fn matches_kind(sku: &ResourceSku, target_kind: &str) -> bool {
    sku.kind
        .as_deref()
        .map_or(true, |kind| kind.eq_ignore_ascii_case(target_kind))
}

/// Extracts the region set from SKU descriptors.
///
/// Each matching descriptor contributes its first location; descriptors
/// with no locations are skipped.
pub fn regions_from_skus(skus: &[ResourceSku], target_kind: &str) -> BTreeSet<Region> {
    skus.iter()
        .filter(|sku| matches_kind(sku, target_kind))
        .filter_map(|sku| sku.locations.first())
        .map(Region::new)
        .filter(|region| !region.is_empty())
        .collect()
}

/// Lists every region where the subscription can use `target_kind`.
///
/// Any listing failure is fatal.
pub async fn discover_regions<A: CapacityApi>(
    api: &A,
    target_kind: &str,
) -> Result<BTreeSet<Region>, DiscoveryError> {
    let skus = api
        .list_resource_skus()
        .await
        .map_err(DiscoveryError::Regions)?;

    let regions = regions_from_skus(&skus, target_kind);
    debug!(descriptors = skus.len(), "Scanned resource SKUs");
    info!(count = regions.len(), kind = target_kind, "Discovered regions");
    Ok(regions)
}
