//! Capacity matrix construction and its CSV form.
//!
//! [`MatrixBuilder`] fans out one capacity query per discovered model,
//! waits for all of them, then reduces the per-model results into a
//! [`CapacityMatrix`]: one row per model in discovery order, one column per
//! region sorted ascending, zero wherever a model reported nothing.

mod builder;
pub mod csv;
mod policy;
mod types;

pub use builder::{densify, normalize_capacity, region_union, BuildReport, MatrixBuilder, SkippedModel};
pub use self::csv::{parse_csv, to_csv, CsvError};
pub use policy::FailurePolicy;
pub use types::{CapacityMatrix, MatrixError, MatrixRow, RegionalCapacity};
