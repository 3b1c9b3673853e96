//! CSV form of the capacity matrix.
//!
//! ```text
//! Model Name,Model Version,Min PTUs Needed,brazilsouth,eastus,westus
//! gpt-x,1.0,50,5,10,0
//! ```

use thiserror::Error;

use super::types::{CapacityMatrix, MatrixError, MatrixRow};
use crate::model::Region;

pub const MODEL_NAME_HEADER: &str = "Model Name";
pub const MODEL_VERSION_HEADER: &str = "Model Version";
pub const MIN_PTUS_HEADER: &str = "Min PTUs Needed";

const FIXED_HEADERS: [&str; 3] = [MODEL_NAME_HEADER, MODEL_VERSION_HEADER, MIN_PTUS_HEADER];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV output: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8")]
    Utf8,

    #[error("expected header column {column} to be '{expected}', found '{found}'")]
    Header {
        column: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: '{value}' in column '{column}' is not a whole number")]
    Number {
        line: u64,
        column: String,
        value: String,
    },

    #[error("invalid matrix: {0}")]
    Matrix(#[from] MatrixError),
}

/// Serializes the matrix with a header row and `\n` line endings.
///
/// Fields containing commas, quotes or newlines are quoted.
pub fn to_csv(matrix: &CapacityMatrix) -> Result<String, CsvError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let header = FIXED_HEADERS
        .iter()
        .copied()
        .chain(matrix.regions().iter().map(Region::as_str));
    writer.write_record(header)?;

    for row in matrix.rows() {
        let mut record = Vec::with_capacity(matrix.column_count());
        record.push(row.name.clone());
        record.push(row.version.clone());
        record.push(row.min_ptus.to_string());
        record.extend(row.capacities.iter().map(u32::to_string));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Flush(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| CsvError::Utf8)
}

/// Parses a whole-number cell, accepting a trailing `.0`.
fn parse_cell(value: &str) -> Option<u32> {
    let value = value.trim();
    value.parse::<u32>().ok().or_else(|| {
        let float = value.parse::<f64>().ok()?;
        (float >= 0.0 && float.fract() == 0.0 && float <= f64::from(u32::MAX)).then_some(float as u32)
    })
}

/// Reads a serialized matrix back.
pub fn parse_csv(data: &str) -> Result<CapacityMatrix, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers = reader.headers()?.clone();
    for (column, expected) in FIXED_HEADERS.iter().enumerate() {
        let found = headers.get(column).unwrap_or_default();
        if found != *expected {
            return Err(CsvError::Header {
                column,
                expected,
                found: found.to_string(),
            });
        }
    }
    let regions: Vec<Region> = headers.iter().skip(FIXED_HEADERS.len()).map(Region::new).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());

        let mut numbers = Vec::with_capacity(record.len().saturating_sub(2));
        for (column, value) in record.iter().enumerate().skip(2) {
            let number = parse_cell(value).ok_or_else(|| CsvError::Number {
                line,
                column: headers.get(column).unwrap_or_default().to_string(),
                value: value.to_string(),
            })?;
            numbers.push(number);
        }

        let mut numbers = numbers.into_iter();
        rows.push(MatrixRow {
            name: record.get(0).unwrap_or_default().to_string(),
            version: record.get(1).unwrap_or_default().to_string(),
            min_ptus: numbers.next().unwrap_or(0),
            capacities: numbers.collect(),
        });
    }

    Ok(CapacityMatrix::new(regions, rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CapacityMatrix {
        CapacityMatrix::new(
            vec![Region::new("brazilsouth"), Region::new("eastus"), Region::new("westus")],
            vec![
                MatrixRow {
                    name: "gpt-x".to_string(),
                    version: "1.0".to_string(),
                    min_ptus: 50,
                    capacities: vec![5, 10, 0],
                },
                MatrixRow {
                    name: "model, with comma".to_string(),
                    version: "2024-05-13".to_string(),
                    min_ptus: 100,
                    capacities: vec![0, 0, 300],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_serialized_layout() {
        let text = to_csv(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Model Name,Model Version,Min PTUs Needed,brazilsouth,eastus,westus"
        );
        assert_eq!(lines[1], "gpt-x,1.0,50,5,10,0");
        assert_eq!(lines[2], "\"model, with comma\",2024-05-13,100,0,0,300");
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_parse_restores_cells() {
        let matrix = sample();
        let parsed = parse_csv(&to_csv(&matrix).unwrap()).unwrap();
        assert_eq!(parsed, matrix);
    }

    #[test]
    fn test_empty_matrix_is_header_only() {
        let text = to_csv(&CapacityMatrix::default()).unwrap();
        assert_eq!(text, "Model Name,Model Version,Min PTUs Needed\n");

        let parsed = parse_csv(&text).unwrap();
        assert!(parsed.is_empty());
        assert!(parsed.regions().is_empty());
    }

    #[test]
    fn test_parse_accepts_float_formatted_integers() {
        let text = "Model Name,Model Version,Min PTUs Needed,eastus\ngpt-x,1.0,50.0,25.0\n";
        let matrix = parse_csv(text).unwrap();
        assert_eq!(matrix.rows()[0].min_ptus, 50);
        assert_eq!(matrix.rows()[0].capacities, vec![25]);
    }

    #[test]
    fn test_parse_rejects_unexpected_header() {
        let err = parse_csv("Name,Version,Min,eastus\n").unwrap_err();
        assert!(matches!(err, CsvError::Header { column: 0, .. }));
    }

    #[test]
    fn test_parse_rejects_non_numeric_cell() {
        let text = "Model Name,Model Version,Min PTUs Needed,eastus\ngpt-x,1.0,50,lots\n";
        match parse_csv(text).unwrap_err() {
            CsvError::Number { column, value, .. } => {
                assert_eq!(column, "eastus");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let text = "Model Name,Model Version,Min PTUs Needed,eastus,westus\ngpt-x,1.0,50,1,2\nshort,1,50,1\n";
        assert!(parse_csv(text).is_err());
    }
}
