//! In-memory [`CapacityApi`] for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::api::{ApiError, CapacityApi, OPENAI_KIND, PTU_SKU_NAME};
use super::types::{
    CapacityProperties, ModelCapacityEntry, ModelDescriptor, ModelInfo, ModelSkuInfo,
    ResourceSku, SkuCapacity,
};
use crate::model::Region;

pub struct MockCapacityApi {
    skus: Result<Vec<ResourceSku>, ApiError>,
    models: HashMap<Region, Result<Vec<ModelDescriptor>, ApiError>>,
    capacities: HashMap<(String, String), Result<Vec<ModelCapacityEntry>, ApiError>>,
    capacity_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A PTU-capable model descriptor of the OpenAI kind.
pub fn ptu_model(name: &str, version: &str, minimum: Option<u32>) -> ModelDescriptor {
    ModelDescriptor {
        kind: Some(OPENAI_KIND.to_string()),
        model: Some(ModelInfo {
            name: name.to_string(),
            version: version.to_string(),
            format: Some(OPENAI_KIND.to_string()),
            skus: vec![ModelSkuInfo {
                name: PTU_SKU_NAME.to_string(),
                capacity: Some(SkuCapacity {
                    minimum,
                    ..SkuCapacity::default()
                }),
            }],
        }),
    }
}

/// A capacity entry for the PTU SKU.
pub fn ptu_capacity(location: &str, units: i64) -> ModelCapacityEntry {
    ModelCapacityEntry {
        name: PTU_SKU_NAME.to_string(),
        location: location.to_string(),
        properties: CapacityProperties {
            available_capacity: Some(units),
        },
    }
}

pub fn api_failure(message: &str) -> ApiError {
    ApiError::Status {
        url: "mock://".to_string(),
        status: 500,
        message: message.to_string(),
    }
}

impl MockCapacityApi {
    pub fn new() -> Self {
        Self {
            skus: Ok(Vec::new()),
            models: HashMap::new(),
            capacities: HashMap::new(),
            capacity_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_skus(mut self, skus: Result<Vec<ResourceSku>, ApiError>) -> Self {
        self.skus = skus;
        self
    }

    pub fn with_models(mut self, region: &str, models: Vec<ModelDescriptor>) -> Self {
        self.models.insert(Region::new(region), Ok(models));
        self
    }

    pub fn with_failing_region(mut self, region: &str, message: &str) -> Self {
        self.models.insert(Region::new(region), Err(api_failure(message)));
        self
    }

    pub fn with_capacity(mut self, name: &str, version: &str, entries: Vec<ModelCapacityEntry>) -> Self {
        self.capacities
            .insert((name.to_string(), version.to_string()), Ok(entries));
        self
    }

    pub fn with_failing_capacity(mut self, name: &str, version: &str, message: &str) -> Self {
        self.capacities.insert(
            (name.to_string(), version.to_string()),
            Err(api_failure(message)),
        );
        self
    }

    pub fn capacity_calls(&self) -> usize {
        self.capacity_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CapacityApi for MockCapacityApi {
    async fn list_resource_skus(&self) -> Result<Vec<ResourceSku>, ApiError> {
        self.skus.clone()
    }

    async fn list_models(&self, region: &Region) -> Result<Vec<ModelDescriptor>, ApiError> {
        self.models.get(region).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn model_capacities(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<ModelCapacityEntry>, ApiError> {
        self.capacity_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.capacities
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
