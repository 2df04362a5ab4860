//! Configuration loading and setting resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing default config file is not an error: the tools log a warning
//! and continue with compiled defaults. A config file named explicitly on
//! the command line must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "mbmap";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Compiled defaults used when no other tier supplies a value
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub archive_path: PathBuf,
    pub sought_keys_path: PathBuf,
    pub output_path: PathBuf,
    pub alias_member: String,
    pub canonical_member: String,
    pub sought_column: String,
    pub output_key_header: String,
    pub output_value_header: String,
    pub preflight: bool,
    pub progress_interval: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn new() -> Self {
        Self {
            archive_path: PathBuf::from("mbdump.tar.bz2"),
            sought_keys_path: PathBuf::from("reccobeats_audio_features.csv"),
            output_path: PathBuf::from("isrc_to_mbid_map.csv"),
            // Dumps ship the ISRC table as either `recording_isrc` or a bare `isrc`
            alias_member: "contains:recording_isrc|suffix:/isrc".to_string(),
            canonical_member: "exact:mbdump/recording".to_string(),
            sought_column: "isrc".to_string(),
            output_key_header: "isrc".to_string(),
            output_value_header: "mbid".to_string(),
            preflight: true,
            progress_interval: 1_000_000,
            log_level: "info".to_string(),
        }
    }
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self::new()
    }
}

/// `[logging]` section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    CompiledDefaults::new().log_level
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[resolver]` section of the TOML config
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverSection {
    pub archive_path: Option<PathBuf>,
    pub sought_keys_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub alias_member: Option<String>,
    pub canonical_member: Option<String>,
    pub sought_column: Option<String>,
    pub output_key_header: Option<String>,
    pub output_value_header: Option<String>,
    pub preflight: Option<bool>,
    pub progress_interval: Option<u64>,
    pub summary_path: Option<PathBuf>,
}

/// Whole TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resolver: ResolverSection,
}

impl TomlConfig {
    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }
}

/// Which configuration tier supplied a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    TomlFile,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigSource::CommandLine => "command line",
            ConfigSource::Environment => "environment variable",
            ConfigSource::TomlFile => "TOML config",
            ConfigSource::Default => "compiled default",
        };
        f.write_str(name)
    }
}

/// A resolved setting together with the tier it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ConfigSource,
}

/// Resolve one setting across the four tiers
///
/// An environment value that is empty or fails to parse is ignored with a
/// warning and resolution continues with the TOML tier.
pub fn resolve_setting<T>(
    name: &str,
    cli: Option<T>,
    env_var: &str,
    toml_value: Option<T>,
    default: T,
) -> Resolved<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(value) = cli {
        debug!("{} loaded from command line", name);
        return Resolved {
            value,
            source: ConfigSource::CommandLine,
        };
    }

    if let Ok(raw) = std::env::var(env_var) {
        if raw.trim().is_empty() {
            warn!("{} is set but empty, ignoring", env_var);
        } else {
            match raw.parse::<T>() {
                Ok(value) => {
                    debug!("{} loaded from environment variable {}", name, env_var);
                    return Resolved {
                        value,
                        source: ConfigSource::Environment,
                    };
                }
                Err(e) => warn!("Ignoring invalid {}={:?}: {}", env_var, raw, e),
            }
        }
    }

    if let Some(value) = toml_value {
        debug!("{} loaded from TOML config", name);
        return Resolved {
            value,
            source: ConfigSource::TomlFile,
        };
    }

    Resolved {
        value: default,
        source: ConfigSource::Default,
    }
}

/// Locate the default config file for the platform, if one exists
///
/// On Linux `~/.config/mbmap/config.toml` is tried first, then
/// `/etc/mbmap/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the TOML config
///
/// With an explicit path the file must exist and parse. Without one the
/// platform default location is tried; if nothing is there, or the file
/// there cannot be parsed, defaults are used and a warning is logged.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = TomlConfig::parse(&content)?;
        info!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let Some(path) = default_config_path() else {
        warn!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    match std::fs::read_to_string(&path)
        .map_err(Error::from)
        .and_then(|content| TomlConfig::parse(&content))
    {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            Ok(TomlConfig::default())
        }
    }
}
