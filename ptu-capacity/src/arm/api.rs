//! The management operations the pipeline depends on.

use std::future::Future;

use thiserror::Error;

use super::types::{ModelCapacityEntry, ModelDescriptor, ResourceSku};
use crate::auth::CredentialError;
use crate::http::HttpError;
use crate::model::Region;

/// Account kind whose regions and models are tracked.
pub const OPENAI_KIND: &str = "OpenAI";

/// Deployment SKU name for provisioned throughput.
pub const PTU_SKU_NAME: &str = "ProvisionedManaged";

/// Errors from management API calls.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("failed to parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("listing at {url} still had more results after {pages} pages")]
    PageLimit { url: String, pages: usize },
}

/// Read-only view of the Cognitive Services management plane.
///
/// Implementations return every page of a listing; filtering is left to
/// the caller.
pub trait CapacityApi: Send + Sync {
    /// Lists all resource SKU descriptors for the subscription.
    fn list_resource_skus(
        &self,
    ) -> impl Future<Output = Result<Vec<ResourceSku>, ApiError>> + Send;

    /// Lists the models offered in `region`.
    fn list_models(
        &self,
        region: &Region,
    ) -> impl Future<Output = Result<Vec<ModelDescriptor>, ApiError>> + Send;

    /// Lists available capacity per location for a model/version.
    fn model_capacities(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<Vec<ModelCapacityEntry>, ApiError>> + Send;
}
