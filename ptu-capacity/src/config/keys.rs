//! Addressable `section.key` settings for `config get|set|unset|list`.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{
    parse_backend, parse_credential, parse_number, parse_policy, ConfigError, ConfigFile,
};

/// Every setting stored in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    AzureSubscriptionId,
    AzureTargetKind,
    AzureCredential,
    AzureManagementEndpoint,
    StorageBackend,
    StorageAccount,
    StorageContainer,
    StorageBlobName,
    StorageDirectory,
    PipelineMaxConcurrency,
    PipelineFailurePolicy,
    HttpTimeoutSecs,
    HttpMaxAttempts,
    LoggingLevel,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 15] = [
    ConfigKey::AzureSubscriptionId,
    ConfigKey::AzureTargetKind,
    ConfigKey::AzureCredential,
    ConfigKey::AzureManagementEndpoint,
    ConfigKey::StorageBackend,
    ConfigKey::StorageAccount,
    ConfigKey::StorageContainer,
    ConfigKey::StorageBlobName,
    ConfigKey::StorageDirectory,
    ConfigKey::PipelineMaxConcurrency,
    ConfigKey::PipelineFailurePolicy,
    ConfigKey::HttpTimeoutSecs,
    ConfigKey::HttpMaxAttempts,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    pub fn section(&self) -> &'static str {
        match self {
            Self::AzureSubscriptionId
            | Self::AzureTargetKind
            | Self::AzureCredential
            | Self::AzureManagementEndpoint => "azure",
            Self::StorageBackend
            | Self::StorageAccount
            | Self::StorageContainer
            | Self::StorageBlobName
            | Self::StorageDirectory => "storage",
            Self::PipelineMaxConcurrency | Self::PipelineFailurePolicy => "pipeline",
            Self::HttpTimeoutSecs | Self::HttpMaxAttempts => "http",
            Self::LoggingLevel | Self::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            Self::AzureSubscriptionId => "subscription_id",
            Self::AzureTargetKind => "target_kind",
            Self::AzureCredential => "credential",
            Self::AzureManagementEndpoint => "management_endpoint",
            Self::StorageBackend => "backend",
            Self::StorageAccount => "account",
            Self::StorageContainer => "container",
            Self::StorageBlobName => "blob_name",
            Self::StorageDirectory => "directory",
            Self::PipelineMaxConcurrency => "max_concurrency",
            Self::PipelineFailurePolicy => "failure_policy",
            Self::HttpTimeoutSecs => "timeout_secs",
            Self::HttpMaxAttempts => "max_attempts",
            Self::LoggingLevel => "level",
            Self::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as it would appear in the file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::AzureSubscriptionId => config.azure.subscription_id.clone().unwrap_or_default(),
            Self::AzureTargetKind => config.azure.target_kind.clone(),
            Self::AzureCredential => config.azure.credential.as_str().to_string(),
            Self::AzureManagementEndpoint => config.azure.management_endpoint.clone(),
            Self::StorageBackend => config.storage.backend.as_str().to_string(),
            Self::StorageAccount => config.storage.account.clone().unwrap_or_default(),
            Self::StorageContainer => config.storage.container.clone().unwrap_or_default(),
            Self::StorageBlobName => config.storage.blob_name.clone(),
            Self::StorageDirectory => config.storage.directory.display().to_string(),
            Self::PipelineMaxConcurrency => config.pipeline.max_concurrency.to_string(),
            Self::PipelineFailurePolicy => config.pipeline.failure_policy.as_str().to_string(),
            Self::HttpTimeoutSecs => config.http.timeout_secs.to_string(),
            Self::HttpMaxAttempts => config.http.max_attempts.to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validates and stores `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let name = self.name();
        match self {
            Self::AzureSubscriptionId => config.azure.subscription_id = optional(value),
            Self::AzureTargetKind => {
                config.azure.target_kind = required(&name, value)?;
            }
            Self::AzureCredential => config.azure.credential = parse_credential(&name, value)?,
            Self::AzureManagementEndpoint => {
                config.azure.management_endpoint = required(&name, value)?;
            }
            Self::StorageBackend => config.storage.backend = parse_backend(&name, value)?,
            Self::StorageAccount => config.storage.account = optional(value),
            Self::StorageContainer => config.storage.container = optional(value),
            Self::StorageBlobName => config.storage.blob_name = required(&name, value)?,
            Self::StorageDirectory => {
                config.storage.directory = PathBuf::from(required(&name, value)?);
            }
            Self::PipelineMaxConcurrency => {
                config.pipeline.max_concurrency = parse_number(&name, value)?;
            }
            Self::PipelineFailurePolicy => {
                config.pipeline.failure_policy = parse_policy(&name, value)?;
            }
            Self::HttpTimeoutSecs => config.http.timeout_secs = parse_number(&name, value)?,
            Self::HttpMaxAttempts => config.http.max_attempts = parse_number(&name, value)?,
            Self::LoggingLevel => config.logging.level = required(&name, value)?,
            Self::LoggingDirectory => config.logging.directory = optional(value).map(PathBuf::from),
        }
        Ok(())
    }
}

fn required(key: &str, value: &str) -> Result<String, ConfigError> {
    optional(value).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "value cannot be empty".to_string(),
    })
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::FailurePolicy;

    #[test]
    fn test_every_key_parses_from_its_name() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            "storage.bucket".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_then_get() {
        let mut config = ConfigFile::default();

        ConfigKey::PipelineFailurePolicy
            .set(&mut config, "skip_failed")
            .unwrap();
        ConfigKey::StorageAccount.set(&mut config, "acct").unwrap();
        ConfigKey::HttpTimeoutSecs.set(&mut config, "45").unwrap();

        assert_eq!(config.pipeline.failure_policy, FailurePolicy::SkipFailed);
        assert_eq!(ConfigKey::StorageAccount.get(&config), "acct");
        assert_eq!(ConfigKey::HttpTimeoutSecs.get(&config), "45");
    }

    #[test]
    fn test_clearing_optional_value() {
        let mut config = ConfigFile::default();
        ConfigKey::AzureSubscriptionId.set(&mut config, "sub").unwrap();
        ConfigKey::AzureSubscriptionId.set(&mut config, "").unwrap();
        assert_eq!(config.azure.subscription_id, None);
        assert_eq!(ConfigKey::AzureSubscriptionId.get(&config), "");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::HttpMaxAttempts.set(&mut config, "-1").is_err());
        assert!(ConfigKey::StorageBlobName.set(&mut config, "  ").is_err());
        assert!(ConfigKey::AzureCredential.set(&mut config, "password").is_err());
    }

    #[test]
    fn test_keys_grouped_by_section() {
        let sections: Vec<&str> = ConfigKey::all().iter().map(|k| k.section()).collect();
        let mut deduped = sections.clone();
        deduped.dedup();
        assert_eq!(deduped, vec!["azure", "storage", "pipeline", "http", "logging"]);
    }
}
