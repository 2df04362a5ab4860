//! Resolver configuration
//!
//! Each option resolves CLI → environment → TOML `[resolver]` section →
//! compiled default (see `mbmap_common::config`). The result is a plain
//! value handed to the orchestrator at construction.

use crate::archive::MemberSelector;
use crate::error::ResolveResult;
use crate::sink::OutputHeaders;
use mbmap_common::config::{resolve_setting, CompiledDefaults, Resolved, TomlConfig};
use mbmap_common::Error;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub const ENV_ARCHIVE: &str = "MBMAP_ARCHIVE";
pub const ENV_SOUGHT_KEYS: &str = "MBMAP_SOUGHT_KEYS";
pub const ENV_OUTPUT: &str = "MBMAP_OUTPUT";
pub const ENV_ALIAS_MEMBER: &str = "MBMAP_ALIAS_MEMBER";
pub const ENV_CANONICAL_MEMBER: &str = "MBMAP_CANONICAL_MEMBER";
pub const ENV_SOUGHT_COLUMN: &str = "MBMAP_SOUGHT_COLUMN";
pub const ENV_OUTPUT_KEY_HEADER: &str = "MBMAP_OUTPUT_KEY_HEADER";
pub const ENV_OUTPUT_VALUE_HEADER: &str = "MBMAP_OUTPUT_VALUE_HEADER";
pub const ENV_PREFLIGHT: &str = "MBMAP_PREFLIGHT";
pub const ENV_PROGRESS_INTERVAL: &str = "MBMAP_PROGRESS_INTERVAL";
pub const ENV_SUMMARY: &str = "MBMAP_SUMMARY";

/// Fully resolved resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub archive_path: PathBuf,
    pub sought_keys_path: PathBuf,
    pub output_path: PathBuf,
    pub alias_member_selector: MemberSelector,
    pub canonical_member_selector: MemberSelector,
    /// Header of the key column in the sought-key CSV
    pub sought_column: String,
    pub output_headers: OutputHeaders,
    /// Verify both members exist before pass 1
    pub preflight: bool,
    /// Records between progress events; 0 disables them
    pub progress_interval: u64,
    /// Where to write the JSON run summary, if anywhere
    pub summary_path: Option<PathBuf>,
}

impl ResolverConfig {
    /// Config with the given paths and compiled defaults for everything else
    pub fn new(
        archive_path: impl Into<PathBuf>,
        sought_keys_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> ResolveResult<Self> {
        let defaults = CompiledDefaults::new();
        Ok(Self {
            archive_path: archive_path.into(),
            sought_keys_path: sought_keys_path.into(),
            output_path: output_path.into(),
            alias_member_selector: parse_selector(&defaults.alias_member)?,
            canonical_member_selector: parse_selector(&defaults.canonical_member)?,
            sought_column: defaults.sought_column,
            output_headers: OutputHeaders {
                key: defaults.output_key_header,
                value: defaults.output_value_header,
            },
            preflight: defaults.preflight,
            progress_interval: defaults.progress_interval,
            summary_path: None,
        })
    }

    /// Resolve every option across CLI overrides, environment and TOML
    pub fn from_sources(overrides: ConfigOverrides, toml: &TomlConfig) -> ResolveResult<Self> {
        let defaults = CompiledDefaults::new();
        let section = &toml.resolver;

        let toml_alias = section.alias_member.as_deref().map(parse_selector).transpose()?;
        let toml_canonical = section
            .canonical_member
            .as_deref()
            .map(parse_selector)
            .transpose()?;

        let archive_path = logged(resolve_setting(
            "archive_path",
            overrides.archive_path,
            ENV_ARCHIVE,
            section.archive_path.clone(),
            defaults.archive_path.clone(),
        ));
        let sought_keys_path = logged(resolve_setting(
            "sought_keys_path",
            overrides.sought_keys_path,
            ENV_SOUGHT_KEYS,
            section.sought_keys_path.clone(),
            defaults.sought_keys_path.clone(),
        ));
        let output_path = logged(resolve_setting(
            "output_path",
            overrides.output_path,
            ENV_OUTPUT,
            section.output_path.clone(),
            defaults.output_path.clone(),
        ));
        let alias_member_selector = logged(resolve_setting(
            "alias_member_selector",
            overrides.alias_member_selector,
            ENV_ALIAS_MEMBER,
            toml_alias,
            parse_selector(&defaults.alias_member)?,
        ));
        let canonical_member_selector = logged(resolve_setting(
            "canonical_member_selector",
            overrides.canonical_member_selector,
            ENV_CANONICAL_MEMBER,
            toml_canonical,
            parse_selector(&defaults.canonical_member)?,
        ));
        let sought_column = resolve_setting(
            "sought_column",
            overrides.sought_column,
            ENV_SOUGHT_COLUMN,
            section.sought_column.clone(),
            defaults.sought_column.clone(),
        )
        .value;
        let output_key_header = resolve_setting(
            "output_key_header",
            overrides.output_key_header,
            ENV_OUTPUT_KEY_HEADER,
            section.output_key_header.clone(),
            defaults.output_key_header.clone(),
        )
        .value;
        let output_value_header = resolve_setting(
            "output_value_header",
            overrides.output_value_header,
            ENV_OUTPUT_VALUE_HEADER,
            section.output_value_header.clone(),
            defaults.output_value_header.clone(),
        )
        .value;
        let preflight = resolve_setting(
            "preflight",
            overrides.preflight,
            ENV_PREFLIGHT,
            section.preflight,
            defaults.preflight,
        )
        .value;
        let progress_interval = resolve_setting(
            "progress_interval",
            overrides.progress_interval,
            ENV_PROGRESS_INTERVAL,
            section.progress_interval,
            defaults.progress_interval,
        )
        .value;

        // No compiled default: only written when asked for
        let summary_path = overrides
            .summary_path
            .or_else(|| env_path(ENV_SUMMARY))
            .or_else(|| section.summary_path.clone());

        Ok(Self {
            archive_path,
            sought_keys_path,
            output_path,
            alias_member_selector,
            canonical_member_selector,
            sought_column,
            output_headers: OutputHeaders {
                key: output_key_header,
                value: output_value_header,
            },
            preflight,
            progress_interval,
            summary_path,
        })
    }
}

/// Values supplied on the command line; `None` defers to lower tiers
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub archive_path: Option<PathBuf>,
    pub sought_keys_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub alias_member_selector: Option<MemberSelector>,
    pub canonical_member_selector: Option<MemberSelector>,
    pub sought_column: Option<String>,
    pub output_key_header: Option<String>,
    pub output_value_header: Option<String>,
    pub preflight: Option<bool>,
    pub progress_interval: Option<u64>,
    pub summary_path: Option<PathBuf>,
}

fn parse_selector(text: &str) -> ResolveResult<MemberSelector> {
    MemberSelector::from_str(text).map_err(|e| Error::Config(e.to_string()).into())
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn logged<T: std::fmt::Debug>(resolved: Resolved<T>) -> T {
    info!("Using {:?} (from {})", resolved.value, resolved.source);
    resolved.value
}
