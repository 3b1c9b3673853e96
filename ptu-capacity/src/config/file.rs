//! INI configuration file.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::arm::{DEFAULT_MANAGEMENT_ENDPOINT, OPENAI_KIND};
use crate::auth::CredentialKind;
use crate::http::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS};
use crate::matrix::FailurePolicy;
use crate::sink::DEFAULT_BLOB_NAME;

/// Environment variable overriding `storage.account`.
pub const STORAGE_ACCOUNT_ENV: &str = "STORAGE_ACCOUNT";
/// Environment variable overriding `storage.container`.
pub const STORAGE_CONTAINER_ENV: &str = "STORAGE_CONTAINER";
/// Environment variable overriding `azure.subscription_id`.
pub const SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Where the matrix is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Blob,
    File,
}

impl StorageBackend {
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "blob" | "azure" => Some(Self::Blob),
            "file" | "local" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::File => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AzureSettings {
    /// Overrides the subscription read from the token claims.
    pub subscription_id: Option<String>,
    pub target_kind: String,
    pub credential: CredentialKind,
    pub management_endpoint: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            subscription_id: None,
            target_kind: OPENAI_KIND.to_string(),
            credential: CredentialKind::Default,
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub account: Option<String>,
    pub container: Option<String>,
    pub blob_name: String,
    /// Output directory for the file backend.
    pub directory: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Blob,
            account: None,
            container: None,
            blob_name: DEFAULT_BLOB_NAME.to_string(),
            directory: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineSettings {
    /// Maximum in-flight requests per fan-out; 0 is unbounded.
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    /// Attempts per request, including the first.
    pub max_attempts: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    /// Directory for daily rolling log files; console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// All persisted settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub azure: AzureSettings,
    pub storage: StorageSettings,
    pub pipeline: PipelineSettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
}

/// Directory holding `config.ini`.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ptu-capacity")
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

/// Default output directory for the file backend.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ptu-capacity")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn parse_credential(key: &str, value: &str) -> Result<CredentialKind, ConfigError> {
    CredentialKind::from_config_str(value)
        .ok_or_else(|| invalid(key, value, "expected default, env, managed_identity or cli"))
}

pub(crate) fn parse_backend(key: &str, value: &str) -> Result<StorageBackend, ConfigError> {
    StorageBackend::from_config_str(value).ok_or_else(|| invalid(key, value, "expected blob or file"))
}

pub(crate) fn parse_policy(key: &str, value: &str) -> Result<FailurePolicy, ConfigError> {
    value.parse().map_err(|reason: String| invalid(key, value, reason))
}

pub(crate) fn parse_number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected a non-negative whole number"))
}

impl ConfigFile {
    /// Loads the file at [`config_file_path`], falling back to defaults
    /// when it does not exist. Environment overrides are applied.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads a specific file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parses settings from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |section: &str, key: &str| -> Option<String> {
            non_empty(ini.section(Some(section)).and_then(|props| props.get(key)))
        };

        if let Some(section) = ini.section(Some("azure")) {
            config.azure.subscription_id = non_empty(section.get("subscription_id"));
        }
        if let Some(v) = get("azure", "target_kind") {
            config.azure.target_kind = v;
        }
        if let Some(v) = get("azure", "credential") {
            config.azure.credential = parse_credential("azure.credential", &v)?;
        }
        if let Some(v) = get("azure", "management_endpoint") {
            config.azure.management_endpoint = v;
        }

        if let Some(v) = get("storage", "backend") {
            config.storage.backend = parse_backend("storage.backend", &v)?;
        }
        config.storage.account = get("storage", "account");
        config.storage.container = get("storage", "container");
        if let Some(v) = get("storage", "blob_name") {
            config.storage.blob_name = v;
        }
        if let Some(v) = get("storage", "directory") {
            config.storage.directory = PathBuf::from(v);
        }

        if let Some(v) = get("pipeline", "max_concurrency") {
            config.pipeline.max_concurrency = parse_number("pipeline.max_concurrency", &v)?;
        }
        if let Some(v) = get("pipeline", "failure_policy") {
            config.pipeline.failure_policy = parse_policy("pipeline.failure_policy", &v)?;
        }

        if let Some(v) = get("http", "timeout_secs") {
            config.http.timeout_secs = parse_number("http.timeout_secs", &v)?;
        }
        if let Some(v) = get("http", "max_attempts") {
            config.http.max_attempts = parse_number("http.max_attempts", &v)?;
        }

        if let Some(v) = get("logging", "level") {
            config.logging.level = v;
        }
        config.logging.directory = get("logging", "directory").map(PathBuf::from);

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("azure"))
            .set("subscription_id", self.azure.subscription_id.clone().unwrap_or_default())
            .set("target_kind", self.azure.target_kind.as_str())
            .set("credential", self.azure.credential.as_str())
            .set("management_endpoint", self.azure.management_endpoint.as_str());

        ini.with_section(Some("storage"))
            .set("backend", self.storage.backend.as_str())
            .set("account", self.storage.account.clone().unwrap_or_default())
            .set("container", self.storage.container.clone().unwrap_or_default())
            .set("blob_name", self.storage.blob_name.as_str())
            .set("directory", self.storage.directory.display().to_string());

        ini.with_section(Some("pipeline"))
            .set("max_concurrency", self.pipeline.max_concurrency.to_string())
            .set("failure_policy", self.pipeline.failure_policy.as_str());

        ini.with_section(Some("http"))
            .set("timeout_secs", self.http.timeout_secs.to_string())
            .set("max_attempts", self.http.max_attempts.to_string());

        ini.with_section(Some("logging"))
            .set("level", self.logging.level.as_str())
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default(),
            );

        ini
    }

    /// Writes every key to [`config_file_path`], creating the directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }

    /// Applies `STORAGE_ACCOUNT`, `STORAGE_CONTAINER` and
    /// `AZURE_SUBSCRIPTION_ID` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(account) = non_empty(lookup(STORAGE_ACCOUNT_ENV).as_deref()) {
            self.storage.account = Some(account);
        }
        if let Some(container) = non_empty(lookup(STORAGE_CONTAINER_ENV).as_deref()) {
            self.storage.container = Some(container);
        }
        if let Some(subscription) = non_empty(lookup(SUBSCRIPTION_ID_ENV).as_deref()) {
            self.azure.subscription_id = Some(subscription);
        }
    }
}
