//! Show command - display the stored capacity matrix.

use chrono::{DateTime, Local, Utc};
use clap::Args;
use ptu_capacity::matrix::csv::{MIN_PTUS_HEADER, MODEL_NAME_HEADER, MODEL_VERSION_HEADER};
use ptu_capacity::matrix::{parse_csv, to_csv, CapacityMatrix};
use ptu_capacity::sink::CapacityStore;
use ptu_capacity::Region;
use tracing::warn;

use super::common::{build_credential, build_http, build_store, load_config, StorageArgs};
use crate::error::CliError;

#[derive(Debug, Clone, Default, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Only show these regions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Print CSV instead of a table
    #[arg(long)]
    pub csv: bool,
}

/// Run the show command.
pub async fn run(args: ShowArgs) -> Result<(), CliError> {
    let mut config = load_config()?;
    args.storage.apply(&mut config);

    let http = build_http(&config.http)?;
    let store = build_store(&config, http, || build_credential(&config))?;
    let key = config.storage.blob_name.as_str();

    let Some(blob) = store.get(key).await? else {
        println!("No capacity data yet at {}.", store.describe(key));
        println!("Run 'ptu-capacity export' to create it.");
        return Ok(());
    };

    let matrix = parse_csv(&blob.text_lossy())?;
    let matrix = filter_regions(&matrix, &args.regions);

    if args.csv {
        print!("{}", to_csv(&matrix)?);
        return Ok(());
    }

    if matrix.is_empty() {
        println!("No PTU-capable models in stored data.");
    } else {
        print!("{}", render_table(&matrix));
    }
    println!();
    println!("Source:       {}", store.describe(key));
    if let Some(modified) = blob.last_modified {
        println!("Last updated: {}", format_timestamp(modified));
    }
    Ok(())
}

/// Narrows the matrix to the requested regions; an empty request keeps all.
fn filter_regions(matrix: &CapacityMatrix, requested: &[String]) -> CapacityMatrix {
    let wanted: Vec<Region> = requested
        .iter()
        .map(|name| Region::new(name))
        .filter(|region| !region.is_empty())
        .collect();
    if wanted.is_empty() {
        return matrix.clone();
    }

    for region in &wanted {
        if !matrix.regions().contains(region) {
            warn!(region = %region, "Region not present in stored data");
        }
    }
    matrix.select_regions(&wanted)
}

/// Formats the matrix as a right-aligned text table.
fn render_table(matrix: &CapacityMatrix) -> String {
    let mut header: Vec<String> = vec![
        MODEL_NAME_HEADER.to_string(),
        MODEL_VERSION_HEADER.to_string(),
        MIN_PTUS_HEADER.to_string(),
    ];
    header.extend(matrix.regions().iter().map(|r| r.to_string()));

    let rows: Vec<Vec<String>> = matrix
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![
                row.name.clone(),
                row.version.clone(),
                row.min_ptus.to_string(),
            ];
            cells.extend(row.capacities.iter().map(u32::to_string));
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|column| {
            rows.iter()
                .map(|cells| cells[column].len())
                .chain(std::iter::once(header[column].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for cells in std::iter::once(&header).chain(rows.iter()) {
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(column, cell)| {
                // Text columns left-aligned, numbers right-aligned
                if column < 2 {
                    format!("{:<width$}", cell, width = widths[column])
                } else {
                    format!("{:>width$}", cell, width = widths[column])
                }
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}
