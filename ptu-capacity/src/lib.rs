//! PTU capacity tracker
//!
//! Discovers where Azure OpenAI models can be deployed with provisioned
//! throughput, queries how much capacity each region has left, and publishes
//! the result as a CSV matrix: one row per model/version, one column per
//! region.
//!
//! The pipeline is split into stages that can be driven independently:
//!
//! - [`discovery`] finds regions and PTU-capable models
//! - [`matrix`] queries capacity and builds the dense table
//! - [`sink`] stores the serialized table
//! - [`export`] wires the stages into a single run
//!
//! Remote access goes through the [`arm::CapacityApi`] and
//! [`http::AsyncHttpClient`] traits so every stage can run against
//! in-memory fakes.

pub mod arm;
pub mod auth;
pub mod config;
pub mod discovery;
pub mod export;
pub mod http;
pub mod logging;
pub mod matrix;
pub mod model;
pub mod sink;

pub use export::{export_capacity, ExportError, ExportOptions, ExportReport};
pub use model::{ModelKey, ModelSku, Region};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
