//! Concurrent capacity queries reduced into a dense matrix.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::policy::FailurePolicy;
use super::types::{CapacityMatrix, MatrixError, MatrixRow, RegionalCapacity};
use crate::arm::{ApiError, CapacityApi, ModelCapacityEntry, PTU_SKU_NAME};
use crate::model::{ModelKey, ModelSku, Region};

/// A model left out of the matrix under [`FailurePolicy::SkipFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModel {
    pub key: ModelKey,
    pub reason: String,
}

/// Result of a matrix build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub matrix: CapacityMatrix,
    pub skipped: Vec<SkippedModel>,
}

/// Normalizes one capacity response into per-region units.
///
/// Only provisioned entries count. Locations are lowercased; when a
/// location appears more than once the last entry wins.
pub fn normalize_capacity(entries: &[ModelCapacityEntry]) -> RegionalCapacity {
    entries
        .iter()
        .filter(|entry| entry.name == PTU_SKU_NAME)
        .map(|entry| (Region::new(&entry.location), entry.available()))
        .filter(|(region, _)| !region.is_empty())
        .collect()
}

/// Sorted union of every region that reported capacity plus `known`.
pub fn region_union<'a, I>(capacities: I, known: &BTreeSet<Region>) -> Vec<Region>
where
    I: IntoIterator<Item = &'a RegionalCapacity>,
{
    capacities
        .into_iter()
        .flat_map(|capacity| capacity.keys().cloned())
        .chain(known.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Builds the dense matrix from models and their capacities.
///
/// Columns are the sorted union of reported regions and `known`. Rows
/// follow the order of `results`; regions a model did not report are
/// filled with zero.
pub fn densify(
    results: &[(&ModelSku, RegionalCapacity)],
    known: &BTreeSet<Region>,
) -> Result<CapacityMatrix, MatrixError> {
    let regions = region_union(results.iter().map(|(_, capacity)| capacity), known);

    let rows = results
        .iter()
        .map(|(sku, capacity)| MatrixRow {
            name: sku.name.clone(),
            version: sku.version.clone(),
            min_ptus: sku.min_ptus,
            capacities: regions
                .iter()
                .map(|region| capacity.get(region).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    CapacityMatrix::new(regions, rows)
}

/// Queries capacity for every model and assembles the matrix.
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    max_concurrency: Option<usize>,
    policy: FailurePolicy,
    known_regions: BTreeSet<Region>,
}

impl MatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps in-flight capacity queries. Zero means unbounded.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = (limit > 0).then_some(limit);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Regions that always get a column, even if no model reports them.
    pub fn with_known_regions(mut self, regions: BTreeSet<Region>) -> Self {
        self.known_regions = regions;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Runs one capacity query per model and reduces the results.
    ///
    /// Queries run concurrently; results are gathered in model order and
    /// only merged once all of them have completed.
    pub async fn build<A: CapacityApi>(
        &self,
        api: &A,
        models: &[ModelSku],
    ) -> Result<BuildReport, MatrixError> {
        let limit = self.max_concurrency.unwrap_or(models.len()).max(1);
        debug!(models = models.len(), limit, "Querying model capacities");

        let outcomes: Vec<(&ModelSku, Result<RegionalCapacity, ApiError>)> = stream::iter(models)
            .map(|sku| async move { (sku, query_capacity(api, sku).await) })
            .buffered(limit)
            .collect()
            .await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();

        for (sku, outcome) in outcomes {
            match outcome {
                Ok(capacity) => results.push((sku, capacity)),
                Err(source) if self.policy.skips_failures() => {
                    warn!(model = %sku.key(), error = %source, "Skipping model: capacity query failed");
                    skipped.push(SkippedModel {
                        key: sku.key(),
                        reason: source.to_string(),
                    });
                }
                Err(source) => {
                    return Err(MatrixError::CapacityQuery {
                        key: sku.key(),
                        source,
                    })
                }
            }
        }

        let matrix = densify(&results, &self.known_regions)?;
        info!(
            models = matrix.rows().len(),
            regions = matrix.regions().len(),
            skipped = skipped.len(),
            "Built capacity matrix"
        );

        Ok(BuildReport { matrix, skipped })
    }
}

async fn query_capacity<A: CapacityApi>(api: &A, sku: &ModelSku) -> Result<RegionalCapacity, ApiError> {
    let entries = api.model_capacities(&sku.name, &sku.version).await?;
    let capacity = normalize_capacity(&entries);
    debug!(model = %sku.key(), regions = capacity.len(), "Received capacity");
    Ok(capacity)
}
