//! PTU-capable model discovery across regions.

use std::collections::{BTreeSet, HashMap};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::arm::{CapacityApi, ModelDescriptor, PTU_SKU_NAME};
use crate::model::{ModelKey, ModelSighting, ModelSku, Region};

/// A region whose model listing could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFailure {
    pub region: Region,
    pub reason: String,
}

/// Outcome of listing one region.
pub type RegionListing = Result<Vec<ModelSighting>, ListingFailure>;

/// Merged result of listing every region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDiscovery {
    /// Distinct model/versions in first-seen order.
    pub models: Vec<ModelSku>,
    /// Regions skipped because their listing failed.
    pub failed_regions: Vec<ListingFailure>,
    /// Number of regions whose listing succeeded.
    pub regions_listed: usize,
}

/// Extracts PTU sightings from one region's model listing.
///
/// Keeps descriptors of `target_kind` that offer the provisioned SKU. A
/// missing minimum is read as zero.
pub fn sightings_from_models(
    region: &Region,
    models: &[ModelDescriptor],
    target_kind: &str,
) -> Vec<ModelSighting> {
    models
        .iter()
        .filter(|descriptor| {
            descriptor
                .kind
                .as_deref()
                .is_some_and(|kind| kind.eq_ignore_ascii_case(target_kind))
        })
        .filter_map(|descriptor| descriptor.model.as_ref())
        .filter_map(|model| {
            let sku = model.skus.iter().find(|sku| sku.name == PTU_SKU_NAME)?;
            let min_ptus = sku
                .capacity
                .as_ref()
                .and_then(|capacity| capacity.minimum)
                .unwrap_or(0);
            Some(ModelSighting {
                region: region.clone(),
                name: model.name.clone(),
                version: model.version.clone(),
                min_ptus,
            })
        })
        .collect()
}

/// Lists one region, turning an API error into a [`ListingFailure`].
pub async fn list_region<A: CapacityApi>(api: &A, region: &Region, target_kind: &str) -> RegionListing {
    match api.list_models(region).await {
        Ok(models) => Ok(sightings_from_models(region, &models, target_kind)),
        Err(e) => Err(ListingFailure {
            region: region.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Merges per-region listings into distinct model/versions.
///
/// Listings are consumed in the order given. The first sighting of a
/// model/version fixes its position; later sightings add their region.
/// Differing minimums for one model/version resolve to the largest.
pub fn merge_listings(listings: Vec<RegionListing>) -> ModelDiscovery {
    let mut discovery = ModelDiscovery::default();
    let mut index: HashMap<ModelKey, usize> = HashMap::new();

    for listing in listings {
        let sightings = match listing {
            Ok(sightings) => sightings,
            Err(failure) => {
                discovery.failed_regions.push(failure);
                continue;
            }
        };
        discovery.regions_listed += 1;

        for sighting in sightings {
            let key = sighting.key();
            match index.get(&key) {
                Some(&position) => {
                    let sku = &mut discovery.models[position];
                    if sighting.min_ptus != sku.min_ptus {
                        debug!(
                            model = %key,
                            region = %sighting.region,
                            seen = sku.min_ptus,
                            other = sighting.min_ptus,
                            "Minimum PTUs differ between regions"
                        );
                        sku.min_ptus = sku.min_ptus.max(sighting.min_ptus);
                    }
                    if !sku.regions.contains(&sighting.region) {
                        sku.regions.push(sighting.region);
                    }
                }
                None => {
                    index.insert(key, discovery.models.len());
                    let mut sku = ModelSku::new(sighting.name, sighting.version, sighting.min_ptus);
                    sku.regions.push(sighting.region);
                    discovery.models.push(sku);
                }
            }
        }
    }

    discovery
}

/// Lists models in every region concurrently and merges the results.
///
/// At most `max_concurrency` listings run at once (`None` or zero means one
/// per region). A failing region is logged and reported in
/// [`ModelDiscovery::failed_regions`]; it never aborts the others.
pub async fn discover_models<A: CapacityApi>(
    api: &A,
    regions: &BTreeSet<Region>,
    target_kind: &str,
    max_concurrency: Option<usize>,
) -> ModelDiscovery {
    let limit = max_concurrency
        .filter(|limit| *limit > 0)
        .unwrap_or(regions.len())
        .max(1);

    let listings: Vec<RegionListing> = stream::iter(regions.iter())
        .map(|region| list_region(api, region, target_kind))
        .buffered(limit)
        .collect()
        .await;

    for failure in listings.iter().filter_map(|listing| listing.as_ref().err()) {
        warn!(region = %failure.region, reason = %failure.reason, "Skipping region: model listing failed");
    }

    let discovery = merge_listings(listings);
    info!(
        models = discovery.models.len(),
        regions = discovery.regions_listed,
        failed = discovery.failed_regions.len(),
        "Discovered PTU models"
    );
    discovery
}
