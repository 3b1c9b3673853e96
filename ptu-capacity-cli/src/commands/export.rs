//! Export command - refresh the stored capacity matrix.

use std::sync::Arc;

use clap::Args;
use ptu_capacity::arm::ManagementClient;
use ptu_capacity::config::ConfigFile;
use ptu_capacity::export::{
    collect_capacity, export_capacity, resolve_subscription, ExportOptions, ExportReport,
};
use ptu_capacity::matrix::{to_csv, FailurePolicy};
use tracing::info;

use super::common::{build_credential, build_http, build_store, load_config, StorageArgs};
use crate::error::CliError;

#[derive(Debug, Clone, Default, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Subscription to query (defaults to the token's subscription)
    #[arg(long)]
    pub subscription: Option<String>,

    /// Resource kind whose regions are queried
    #[arg(long)]
    pub kind: Option<String>,

    /// Maximum concurrent requests per stage (0 = unbounded)
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Leave out models whose capacity query fails instead of aborting
    #[arg(long)]
    pub skip_failed: bool,

    /// Print the CSV to stdout instead of storing it
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    fn apply(&self, config: &mut ConfigFile) {
        self.storage.apply(config);
        if let Some(subscription) = &self.subscription {
            config.azure.subscription_id = Some(subscription.clone());
        }
        if let Some(kind) = &self.kind {
            config.azure.target_kind = kind.clone();
        }
        if let Some(limit) = self.max_concurrency {
            config.pipeline.max_concurrency = limit;
        }
        if self.skip_failed {
            config.pipeline.failure_policy = FailurePolicy::SkipFailed;
        }
    }
}

/// Export options from resolved settings.
fn export_options(config: &ConfigFile) -> ExportOptions {
    ExportOptions {
        target_kind: config.azure.target_kind.clone(),
        max_concurrency: Some(config.pipeline.max_concurrency).filter(|&limit| limit > 0),
        failure_policy: config.pipeline.failure_policy,
        blob_name: config.storage.blob_name.clone(),
    }
}

/// Run the export command.
pub async fn run(args: ExportArgs) -> Result<(), CliError> {
    let mut config = load_config()?;
    args.apply(&mut config);

    let http = build_http(&config.http)?;
    let credential = build_credential(&config)?;
    let options = export_options(&config);

    info!("Refreshing PTU data");
    let subscription =
        resolve_subscription(&credential, config.azure.subscription_id.as_deref()).await?;
    info!(
        subscription = %subscription,
        credential = config.azure.credential.as_str(),
        "Using subscription"
    );

    let api = ManagementClient::new(http.clone(), Arc::clone(&credential), subscription)
        .with_endpoint(config.azure.management_endpoint.as_str());

    if args.dry_run {
        let snapshot = collect_capacity(&api, &options).await?;
        print!("{}", to_csv(&snapshot.matrix)?);
        return Ok(());
    }

    let store = build_store(&config, http, || Ok(Arc::clone(&credential)))?;
    let report = export_capacity(&api, &store, &options).await?;
    info!("Data refresh complete");

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ExportReport) {
    println!("Export complete");
    println!("  Models:      {}", report.model_count());
    println!(
        "  Regions:     {} ({} discovered)",
        report.regions().len(),
        report.discovered_regions
    );
    println!("  Written:     {} bytes", report.bytes_written);
    println!("  Destination: {}", report.destination);
    println!("  Elapsed:     {:.1}s", report.elapsed.as_secs_f64());

    if report.is_partial() {
        println!();
        println!("Partial export:");
        for failure in &report.failed_regions {
            println!("  region {} not listed: {}", failure.region, failure.reason);
        }
        for skipped in &report.skipped_models {
            println!("  model {} skipped: {}", skipped.key, skipped.reason);
        }
    }
}
