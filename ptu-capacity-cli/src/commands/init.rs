//! Init command - initialize configuration file.

use std::path::Path;

use clap::Args;
use ptu_capacity::config::{config_file_path, ConfigFile, StorageBackend};

use super::common::BackendArg;
use crate::error::CliError;

#[derive(Debug, Clone, Default, Args)]
pub struct InitArgs {
    /// Storage account to record
    #[arg(long)]
    pub account: Option<String>,

    /// Container to record
    #[arg(long)]
    pub container: Option<String>,

    /// Subscription to record
    #[arg(long)]
    pub subscription: Option<String>,

    /// Storage backend to record
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Replace an existing file with defaults
    #[arg(long)]
    pub force: bool,
}

/// Run the init command.
pub fn run(args: InitArgs) -> Result<(), CliError> {
    let path = config_file_path();
    let created = init_at(&path, &args)?;

    if created {
        println!("Created configuration file: {}", path.display());
    } else {
        println!("Updated configuration file: {}", path.display());
    }
    println!();
    println!("Edit this file to customize ptu-capacity settings.");
    println!("STORAGE_ACCOUNT, STORAGE_CONTAINER and AZURE_SUBSCRIPTION_ID override it,");
    println!("and CLI arguments override both.");
    Ok(())
}

/// Writes the file at `path`, keeping existing values unless `force` is set.
///
/// Returns whether the file was newly created.
fn init_at(path: &Path, args: &InitArgs) -> Result<bool, CliError> {
    let exists = path.exists();
    let mut config = if exists && !args.force {
        ConfigFile::load_from(path)?
    } else {
        ConfigFile::default()
    };

    if let Some(account) = &args.account {
        config.storage.account = Some(account.clone());
    }
    if let Some(container) = &args.container {
        config.storage.container = Some(container.clone());
    }
    if let Some(subscription) = &args.subscription {
        config.azure.subscription_id = Some(subscription.clone());
    }
    if let Some(backend) = args.backend {
        config.storage.backend = StorageBackend::from(backend);
    }

    config.save_to(path)?;
    Ok(!exists)
}
