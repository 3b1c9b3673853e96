//! The end-to-end export: discover, build, serialize, store.
//!
//! One run is stateless. Regions are discovered fresh, every region is
//! listed for PTU-capable models, capacity is queried per model, and the
//! resulting CSV replaces the previous object in the store. Any fatal error
//! aborts the run before anything is written.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::arm::{ApiError, CapacityApi, OPENAI_KIND};
use crate::auth::{subscription_from_token, CredentialError, TokenCredential, MANAGEMENT_SCOPE};
use crate::discovery::{discover_models, discover_regions, DiscoveryError, ListingFailure};
use crate::matrix::{to_csv, CapacityMatrix, CsvError, FailurePolicy, MatrixBuilder, MatrixError, SkippedModel};
use crate::model::Region;
use crate::sink::{CapacityStore, SinkError, DEFAULT_BLOB_NAME};

/// Fatal export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] CredentialError),

    #[error("region discovery failed: {0}")]
    RegionDiscovery(#[source] DiscoveryError),

    #[error("capacity query failed: {0}")]
    CapacityQuery(#[source] MatrixError),

    #[error("failed to serialize capacity matrix: {0}")]
    Serialization(#[from] CsvError),

    #[error("failed to store capacity matrix: {0}")]
    SinkWrite(#[source] SinkError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<DiscoveryError> for ExportError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::Regions(ApiError::Credential(source)) => Self::Authentication(source),
            other => Self::RegionDiscovery(other),
        }
    }
}

impl From<MatrixError> for ExportError {
    fn from(e: MatrixError) -> Self {
        match e {
            MatrixError::CapacityQuery {
                source: ApiError::Credential(source),
                ..
            } => Self::Authentication(source),
            other => Self::CapacityQuery(other),
        }
    }
}

impl From<SinkError> for ExportError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::Credential(source) => Self::Authentication(source),
            other => Self::SinkWrite(other),
        }
    }
}

/// Knobs for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub target_kind: String,
    /// Maximum in-flight requests per fan-out; `None` is unbounded.
    pub max_concurrency: Option<usize>,
    pub failure_policy: FailurePolicy,
    /// Object key the CSV is stored under.
    pub blob_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            target_kind: OPENAI_KIND.to_string(),
            max_concurrency: None,
            failure_policy: FailurePolicy::FailFast,
            blob_name: DEFAULT_BLOB_NAME.to_string(),
        }
    }
}

/// What an export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub matrix: CapacityMatrix,
    /// Regions returned by region discovery.
    pub discovered_regions: usize,
    pub failed_regions: Vec<ListingFailure>,
    pub skipped_models: Vec<SkippedModel>,
    pub destination: String,
    pub bytes_written: usize,
    pub elapsed: Duration,
}

impl ExportReport {
    pub fn regions(&self) -> &[Region] {
        self.matrix.regions()
    }

    pub fn model_count(&self) -> usize {
        self.matrix.rows().len()
    }

    /// Whether any region or model was left out.
    pub fn is_partial(&self) -> bool {
        !self.failed_regions.is_empty() || !self.skipped_models.is_empty()
    }
}

/// Resolves the subscription to query.
///
/// A configured id wins; otherwise it is read from the management token's
/// resource id claim.
pub async fn resolve_subscription<T: TokenCredential>(
    credential: &T,
    configured: Option<&str>,
) -> Result<String, CredentialError> {
    if let Some(id) = configured.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    let token = credential.token(MANAGEMENT_SCOPE).await?;
    match token.subscription.as_deref() {
        Some(id) => Ok(id.to_string()),
        None => subscription_from_token(&token),
    }
}

/// The matrix and what was left out of it.
#[derive(Debug, Clone, Default)]
pub struct CapacitySnapshot {
    pub matrix: CapacityMatrix,
    pub discovered_regions: usize,
    pub failed_regions: Vec<ListingFailure>,
    pub skipped_models: Vec<SkippedModel>,
}

/// Runs discovery and the matrix build without storing anything.
pub async fn collect_capacity<A: CapacityApi>(
    api: &A,
    options: &ExportOptions,
) -> Result<CapacitySnapshot, ExportError> {
    let regions = discover_regions(api, &options.target_kind).await?;
    let discovery = discover_models(api, &regions, &options.target_kind, options.max_concurrency).await;

    let builder = MatrixBuilder::new()
        .with_max_concurrency(options.max_concurrency.unwrap_or(0))
        .with_policy(options.failure_policy)
        .with_known_regions(regions.clone());
    let report = builder.build(api, &discovery.models).await?;

    Ok(CapacitySnapshot {
        matrix: report.matrix,
        discovered_regions: regions.len(),
        failed_regions: discovery.failed_regions,
        skipped_models: report.skipped,
    })
}

/// Runs a full export and stores the CSV under `options.blob_name`.
pub async fn export_capacity<A: CapacityApi, S: CapacityStore>(
    api: &A,
    store: &S,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    if options.blob_name.trim().is_empty() {
        return Err(ExportError::Config("blob name cannot be empty".to_string()));
    }
    let started = Instant::now();

    let snapshot = collect_capacity(api, options).await?;

    for failure in &snapshot.failed_regions {
        warn!(region = %failure.region, reason = %failure.reason, "Region missing from export");
    }
    for skipped in &snapshot.skipped_models {
        warn!(model = %skipped.key, reason = %skipped.reason, "Model missing from export");
    }

    let csv = to_csv(&snapshot.matrix)?;
    let bytes_written = csv.len();
    store.put(&options.blob_name, csv.into_bytes()).await?;

    let report = ExportReport {
        matrix: snapshot.matrix,
        discovered_regions: snapshot.discovered_regions,
        failed_regions: snapshot.failed_regions,
        skipped_models: snapshot.skipped_models,
        destination: store.describe(&options.blob_name),
        bytes_written,
        elapsed: started.elapsed(),
    };

    info!(
        models = report.model_count(),
        regions = report.regions().len(),
        destination = %report.destination,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Export complete"
    );
    Ok(report)
}
