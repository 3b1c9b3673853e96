//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use ptu_capacity::auth::{ChainedCredential, CredentialKind};
use ptu_capacity::config::{ConfigFile, HttpSettings, StorageBackend};
use ptu_capacity::http::{ReqwestClient, RetryPolicy, RetryingClient};
use ptu_capacity::sink::{AzureBlobStore, FileStore, StoreBackend};

use crate::error::CliError;

/// HTTP stack used for every remote call.
pub type Http = RetryingClient<ReqwestClient>;

/// Shared credential chain.
pub type Credential = Arc<ChainedCredential>;

/// Store selected from configuration.
pub type Store = StoreBackend<Http, Credential>;

/// Storage backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum BackendArg {
    /// Azure Blob Storage
    Blob,
    /// Local directory
    File,
}

impl From<BackendArg> for StorageBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Blob => StorageBackend::Blob,
            BackendArg::File => StorageBackend::File,
        }
    }
}

/// Credential source selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum CredentialArg {
    /// Environment token, then managed identity, then Azure CLI
    Default,
    /// AZURE_ACCESS_TOKEN only
    Env,
    /// Managed identity only
    ManagedIdentity,
    /// `az account get-access-token` only
    Cli,
}

impl From<CredentialArg> for CredentialKind {
    fn from(arg: CredentialArg) -> Self {
        match arg {
            CredentialArg::Default => CredentialKind::Default,
            CredentialArg::Env => CredentialKind::Environment,
            CredentialArg::ManagedIdentity => CredentialKind::ManagedIdentity,
            CredentialArg::Cli => CredentialKind::AzureCli,
        }
    }
}

/// Storage flags shared by `export` and `show`.
#[derive(Debug, Clone, Default, Args)]
pub struct StorageArgs {
    /// Where the matrix is stored
    #[arg(long, value_enum, visible_alias = "sink")]
    pub backend: Option<BackendArg>,

    /// Storage account name (blob backend)
    #[arg(long)]
    pub account: Option<String>,

    /// Container name (blob backend)
    #[arg(long)]
    pub container: Option<String>,

    /// Output directory (file backend)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Object name the CSV is stored under
    #[arg(long)]
    pub blob_name: Option<String>,

    /// Credential source for Azure calls
    #[arg(long, value_enum)]
    pub credential: Option<CredentialArg>,
}

impl StorageArgs {
    /// Applies flags over file and environment settings.
    pub fn apply(&self, config: &mut ConfigFile) {
        // CLI takes precedence, then env, then config file
        if let Some(backend) = self.backend {
            config.storage.backend = backend.into();
        }
        if let Some(account) = &self.account {
            config.storage.account = Some(account.clone());
        }
        if let Some(container) = &self.container {
            config.storage.container = Some(container.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.storage.directory = dir.clone();
            // Naming a directory implies the file backend unless stated otherwise.
            if self.backend.is_none() {
                config.storage.backend = StorageBackend::File;
            }
        }
        if let Some(name) = &self.blob_name {
            config.storage.blob_name = name.clone();
        }
        if let Some(credential) = self.credential {
            config.azure.credential = credential.into();
        }
    }
}

/// Loads the config file with environment overrides applied.
pub fn load_config() -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load()?)
}

/// Builds the retrying HTTP client from settings.
pub fn build_http(settings: &HttpSettings) -> Result<Http, CliError> {
    let client = ReqwestClient::with_timeout(settings.timeout_secs)?;
    Ok(RetryingClient::new(
        client,
        RetryPolicy::exponential(settings.max_attempts),
    ))
}

/// Builds the credential chain for the configured source.
pub fn build_credential(config: &ConfigFile) -> Result<Credential, CliError> {
    Ok(Arc::new(ChainedCredential::for_kind(config.azure.credential)?))
}

/// Opens the configured store.
///
/// The credential is only requested for the blob backend.
pub fn build_store(
    config: &ConfigFile,
    http: Http,
    credential: impl FnOnce() -> Result<Credential, CliError>,
) -> Result<Store, CliError> {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::File => Ok(StoreBackend::File(FileStore::new(&storage.directory))),
        StorageBackend::Blob => {
            let account = storage.account.as_deref().ok_or_else(|| {
                CliError::Config(
                    "Blob storage requires an account. \
                     Set STORAGE_ACCOUNT, storage.account in config.ini, or use --account"
                        .to_string(),
                )
            })?;
            let container = storage.container.clone().ok_or_else(|| {
                CliError::Config(
                    "Blob storage requires a container. \
                     Set STORAGE_CONTAINER, storage.container in config.ini, or use --container"
                        .to_string(),
                )
            })?;
            let store = AzureBlobStore::new(http, credential()?, account, container)?;
            Ok(StoreBackend::Blob(store))
        }
    }
}
