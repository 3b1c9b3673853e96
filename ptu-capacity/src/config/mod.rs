//! Configuration file management.
//!
//! Settings live in an INI file under the user's configuration directory
//! (`~/.config/ptu-capacity/config.ini` on Linux). Missing files and keys
//! fall back to defaults. `STORAGE_ACCOUNT`, `STORAGE_CONTAINER` and
//! `AZURE_SUBSCRIPTION_ID` override the file, and command-line flags
//! override both.

mod file;
mod keys;

pub use file::{
    config_dir, config_file_path, default_data_dir, AzureSettings, ConfigError, ConfigFile,
    HttpSettings, LoggingSettings, PipelineSettings, StorageBackend, StorageSettings,
    STORAGE_ACCOUNT_ENV, STORAGE_CONTAINER_ENV, SUBSCRIPTION_ID_ENV,
};
pub use keys::ConfigKey;
