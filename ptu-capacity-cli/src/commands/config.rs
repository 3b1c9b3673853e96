//! `config` subcommand: inspect and edit `config.ini`.
//!
//! Values are shown the way `export` resolves them, so a setting supplied
//! through `STORAGE_ACCOUNT` and friends is reported with its origin.
//! Edits only ever touch the file.

use std::fmt;
use std::path::Path;

use clap::Subcommand;
use ptu_capacity::config::{
    config_file_path, ConfigFile, ConfigKey, STORAGE_ACCOUNT_ENV, STORAGE_CONTAINER_ENV,
    SUBSCRIPTION_ID_ENV,
};

use crate::error::CliError;

const UNSET: &str = "<unset>";

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective value of one setting
    Get {
        /// Setting name as section.key, e.g. storage.account
        key: String,
    },

    /// Write a setting to config.ini
    Set {
        /// Setting name as section.key, e.g. storage.account
        key: String,

        /// New value (empty clears optional settings)
        value: String,
    },

    /// Restore a setting in config.ini to its default
    Unset {
        /// Setting name as section.key, e.g. storage.account
        key: String,
    },

    /// Print every setting with where its value comes from
    List,

    /// Print the location of config.ini
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    let path = config_file_path();
    match command {
        ConfigCommands::Get { key } => {
            let key = lookup(&key)?;
            let setting = resolve_one(key, &Layers::load(&path)?);
            println!("{}", setting.display_value());
        }
        ConfigCommands::Set { key, value } => {
            let key = lookup(&key)?;
            write_setting(&path, key, &value)?;
            println!("{} -> {}", key.name(), value);
            note_shadowing(key);
        }
        ConfigCommands::Unset { key } => {
            let key = lookup(&key)?;
            let default = key.get(&ConfigFile::default());
            write_setting(&path, key, &default)?;
            println!("{} reset to default", key.name());
            note_shadowing(key);
        }
        ConfigCommands::List => {
            print!("{}", render(&resolve_all(&Layers::load(&path)?)));
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(file does not exist yet; run `ptu-capacity init` to create it)");
            }
        }
    }
    Ok(())
}

fn lookup(name: &str) -> Result<ConfigKey, CliError> {
    name.parse().map_err(|_| {
        let known: Vec<String> = ConfigKey::all().iter().map(ConfigKey::name).collect();
        CliError::Config(format!(
            "'{}' is not a setting; expected one of: {}",
            name,
            known.join(", ")
        ))
    })
}

/// Environment variable that takes precedence over `key`, if any.
fn env_override(key: ConfigKey) -> Option<&'static str> {
    match key {
        ConfigKey::StorageAccount => Some(STORAGE_ACCOUNT_ENV),
        ConfigKey::StorageContainer => Some(STORAGE_CONTAINER_ENV),
        ConfigKey::AzureSubscriptionId => Some(SUBSCRIPTION_ID_ENV),
        _ => None,
    }
}

fn note_shadowing(key: ConfigKey) {
    if let Some(var) = env_override(key).filter(|var| std::env::var_os(var).is_some()) {
        eprintln!("note: {} is set and takes precedence over the file", var);
    }
}

/// Writes one key, reading the file without environment overrides so
/// they never leak into it.
fn write_setting(path: &Path, key: ConfigKey, value: &str) -> Result<(), CliError> {
    let mut file = if path.exists() {
        ConfigFile::load_from(path)?
    } else {
        ConfigFile::default()
    };
    key.set(&mut file, value)?;
    file.save_to(path)?;
    Ok(())
}

/// Where an effective value was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Default,
    File,
    Environment,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Default => "default",
            Origin::File => "file",
            Origin::Environment => "env",
        })
    }
}

/// The file as written and the result after environment overrides.
struct Layers {
    file: ConfigFile,
    effective: ConfigFile,
}

impl Layers {
    fn load(path: &Path) -> Result<Self, CliError> {
        let file = if path.exists() {
            ConfigFile::load_from(path)?
        } else {
            ConfigFile::default()
        };
        let mut effective = file.clone();
        effective.apply_env_overrides();
        Ok(Self { file, effective })
    }
}

#[derive(Debug, PartialEq)]
struct Setting {
    key: ConfigKey,
    value: String,
    origin: Origin,
}

impl Setting {
    fn display_value(&self) -> &str {
        if self.value.is_empty() {
            UNSET
        } else {
            &self.value
        }
    }
}

fn resolve_one(key: ConfigKey, layers: &Layers) -> Setting {
    let value = key.get(&layers.effective);
    let origin = if value != key.get(&layers.file) {
        Origin::Environment
    } else if value != key.get(&ConfigFile::default()) {
        Origin::File
    } else {
        Origin::Default
    };
    Setting { key, value, origin }
}

fn resolve_all(layers: &Layers) -> Vec<Setting> {
    ConfigKey::all()
        .iter()
        .map(|&key| resolve_one(key, layers))
        .collect()
}

/// One aligned `name  value  origin` line per setting.
fn render(settings: &[Setting]) -> String {
    let names: Vec<String> = settings.iter().map(|s| s.key.name()).collect();
    let name_width = names.iter().map(String::len).max().unwrap_or(0);
    let value_width = settings
        .iter()
        .map(|s| s.display_value().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (name, setting) in names.iter().zip(settings) {
        let line = format!(
            "{:<nw$}  {:<vw$}  {}",
            name,
            setting.display_value(),
            setting.origin,
            nw = name_width,
            vw = value_width,
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers(file: ConfigFile, env: impl FnOnce(&mut ConfigFile)) -> Layers {
        let mut effective = file.clone();
        env(&mut effective);
        Layers { file, effective }
    }

    #[test]
    fn test_unknown_setting_lists_known_names() {
        let err = lookup("storage.nope").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("storage.account"));
    }

    #[test]
    fn test_write_setting_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        write_setting(&path, ConfigKey::StorageAccount, "acct").unwrap();
        write_setting(&path, ConfigKey::PipelineFailurePolicy, "skip_failed").unwrap();

        let file = ConfigFile::load_from(&path).unwrap();
        assert_eq!(ConfigKey::StorageAccount.get(&file), "acct");
        assert_eq!(ConfigKey::PipelineFailurePolicy.get(&file), "skip_failed");
    }

    #[test]
    fn test_invalid_value_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        let err = write_setting(&path, ConfigKey::HttpTimeoutSecs, "soon").unwrap_err();
        assert!(matches!(err, CliError::ConfigFile(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_unset_restores_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        write_setting(&path, ConfigKey::HttpMaxAttempts, "9").unwrap();

        let default = ConfigKey::HttpMaxAttempts.get(&ConfigFile::default());
        write_setting(&path, ConfigKey::HttpMaxAttempts, &default).unwrap();

        let file = ConfigFile::load_from(&path).unwrap();
        assert_eq!(file.http.max_attempts, ConfigFile::default().http.max_attempts);
    }

    #[test]
    fn test_origin_tracks_overriding_layer() {
        let mut file = ConfigFile::default();
        file.storage.container = Some("from-file".to_string());
        file.storage.account = Some("file-acct".to_string());
        let layers = layers(file, |effective| {
            effective.storage.account = Some("env-acct".to_string());
        });

        let account = resolve_one(ConfigKey::StorageAccount, &layers);
        assert_eq!(account.value, "env-acct");
        assert_eq!(account.origin, Origin::Environment);
        assert_eq!(
            resolve_one(ConfigKey::StorageContainer, &layers).origin,
            Origin::File
        );
        assert_eq!(
            resolve_one(ConfigKey::HttpTimeoutSecs, &layers).origin,
            Origin::Default
        );
    }

    #[test]
    fn test_render_aligns_columns() {
        let settings = vec![
            Setting {
                key: ConfigKey::AzureSubscriptionId,
                value: String::new(),
                origin: Origin::Default,
            },
            Setting {
                key: ConfigKey::HttpTimeoutSecs,
                value: "30".to_string(),
                origin: Origin::File,
            },
        ];

        assert_eq!(
            render(&settings),
            "azure.subscription_id  <unset>  default\n\
             http.timeout_secs      30       file\n"
        );
    }

    #[test]
    fn test_listing_covers_every_key() {
        let settings = resolve_all(&layers(ConfigFile::default(), |_| {}));
        assert_eq!(settings.len(), ConfigKey::all().len());
        assert!(settings.iter().all(|s| s.origin == Origin::Default));
    }
}
