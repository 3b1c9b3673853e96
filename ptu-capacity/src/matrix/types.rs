//! The dense model × region capacity table.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::arm::ApiError;
use crate::model::{ModelKey, Region};

/// Available PTU capacity per region for one model.
///
/// A region absent from the map is unknown, not zero, until the matrix is
/// densified.
pub type RegionalCapacity = BTreeMap<Region, u32>;

/// One model/version row of the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub name: String,
    pub version: String,
    pub min_ptus: u32,
    /// One cell per matrix region, in region order.
    pub capacities: Vec<u32>,
}

impl MatrixRow {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.name.clone(), self.version.clone())
    }
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("capacity query failed for {key}: {source}")]
    CapacityQuery {
        key: ModelKey,
        #[source]
        source: ApiError,
    },

    #[error("row {row} has {actual} capacity cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("region columns must be unique and sorted ascending")]
    UnsortedRegions,
}

/// Rectangular capacity table.
///
/// Regions are unique and sorted ascending; every row has exactly one cell
/// per region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityMatrix {
    regions: Vec<Region>,
    rows: Vec<MatrixRow>,
}

impl CapacityMatrix {
    /// Creates a matrix, validating the shape.
    pub fn new(regions: Vec<Region>, rows: Vec<MatrixRow>) -> Result<Self, MatrixError> {
        if regions.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MatrixError::UnsortedRegions);
        }
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.capacities.len() != regions.len())
        {
            return Err(MatrixError::Ragged {
                row,
                expected: regions.len(),
                actual: cells.capacities.len(),
            });
        }
        Ok(Self { regions, rows })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total columns in the tabular form: name, version, minimum, regions.
    pub fn column_count(&self) -> usize {
        3 + self.regions.len()
    }

    pub fn row(&self, name: &str, version: &str) -> Option<&MatrixRow> {
        self.rows
            .iter()
            .find(|row| row.name == name && row.version == version)
    }

    /// Capacity of a model in a region; `None` if either is not in the matrix.
    pub fn capacity(&self, name: &str, version: &str, region: &Region) -> Option<u32> {
        let column = self.regions.binary_search(region).ok()?;
        self.row(name, version).map(|row| row.capacities[column])
    }

    /// Keeps only the given regions (those present), preserving order.
    pub fn select_regions(&self, wanted: &[Region]) -> CapacityMatrix {
        let columns: Vec<usize> = self
            .regions
            .iter()
            .enumerate()
            .filter(|(_, region)| wanted.contains(region))
            .map(|(column, _)| column)
            .collect();

        let regions = columns.iter().map(|&c| self.regions[c].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| MatrixRow {
                capacities: columns.iter().map(|&c| row.capacities[c]).collect(),
                ..row.clone()
            })
            .collect();

        CapacityMatrix { regions, rows }
    }
}
