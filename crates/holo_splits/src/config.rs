//! Planner configuration.
//!
//! Options can come from process environment variables (missing or malformed
//! values fall back to defaults) or from a `key=value` properties document
//! using the dotted option names operators already know.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};

use crate::table::TableKey;

pub const ENV_CACHE_ENABLED: &str = "HOLO_SPLITS_CACHE_ENABLED";
pub const ENV_CACHE_SCHEMA: &str = "HOLO_SPLITS_CACHE_SCHEMA";
pub const ENV_CACHE_TABLE: &str = "HOLO_SPLITS_CACHE_TABLE";
pub const ENV_PROJECTION_READ_ENABLED: &str = "HOLO_SPLITS_PROJECTION_READ_ENABLED";
pub const ENV_FIXED_SPLIT_SIZE: &str = "HOLO_SPLITS_FIXED_SPLIT_SIZE";

pub const PROP_CACHE_ENABLED: &str = "cache.enabled";
pub const PROP_CACHE_SCHEMA: &str = "cache.schema";
pub const PROP_CACHE_TABLE: &str = "cache.table";
pub const PROP_PROJECTION_READ_ENABLED: &str = "projection.read.enabled";
pub const PROP_FIXED_SPLIT_SIZE: &str = "fixed.split.size";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Enables cache-affinity placement for the configured cache table.
    pub cache_enabled: bool,
    /// Schema of the single cluster-wide cache-resident table.
    pub cache_schema: Option<String>,
    /// Name of the single cluster-wide cache-resident table.
    pub cache_table: Option<String>,
    /// Enables projection-path substitution.
    pub projection_read_enabled: bool,
    /// Operator override for the split size; bypasses the splits index when set.
    pub fixed_split_size: Option<u32>,
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_enabled: parse_bool_env(ENV_CACHE_ENABLED, defaults.cache_enabled),
            cache_schema: parse_string_env(ENV_CACHE_SCHEMA),
            cache_table: parse_string_env(ENV_CACHE_TABLE),
            projection_read_enabled: parse_bool_env(
                ENV_PROJECTION_READ_ENABLED,
                defaults.projection_read_enabled,
            ),
            fixed_split_size: fixed_split_size_from(parse_i64_env(ENV_FIXED_SPLIT_SIZE, 0)),
        }
    }

    /// Parses a properties document; unknown keys are ignored.
    pub fn from_properties(text: &str) -> Result<Self> {
        let properties = parse_properties(text)?;
        let mut config = Self::default();
        if let Some(raw) = properties.get(PROP_CACHE_ENABLED) {
            config.cache_enabled = parse_bool_property(PROP_CACHE_ENABLED, raw)?;
        }
        config.cache_schema = properties
            .get(PROP_CACHE_SCHEMA)
            .filter(|raw| !raw.is_empty())
            .cloned();
        config.cache_table = properties
            .get(PROP_CACHE_TABLE)
            .filter(|raw| !raw.is_empty())
            .cloned();
        if let Some(raw) = properties.get(PROP_PROJECTION_READ_ENABLED) {
            config.projection_read_enabled =
                parse_bool_property(PROP_PROJECTION_READ_ENABLED, raw)?;
        }
        if let Some(raw) = properties.get(PROP_FIXED_SPLIT_SIZE) {
            let value = raw
                .parse::<i64>()
                .with_context(|| format!("invalid {PROP_FIXED_SPLIT_SIZE}={raw}"))?;
            if value > i64::from(u32::MAX) {
                return Err(anyhow!("{PROP_FIXED_SPLIT_SIZE}={raw} is out of range"));
            }
            config.fixed_split_size = fixed_split_size_from(value);
        }
        Ok(config)
    }

    /// Returns `true` when `table` is the configured cache-resident table and caching is on.
    pub fn cache_table_matches(&self, table: &TableKey) -> bool {
        if !self.cache_enabled {
            return false;
        }
        match (self.cache_schema.as_deref(), self.cache_table.as_deref()) {
            (Some(schema), Some(name)) => table.matches(schema, name),
            _ => false,
        }
    }
}

/// Zero or negative sizes disable the override.
fn fixed_split_size_from(raw: i64) -> Option<u32> {
    if raw <= 0 {
        None
    } else {
        u32::try_from(raw).ok()
    }
}

fn parse_properties(text: &str) -> Result<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| anyhow!("line {}: expected key=value, got `{line}`", line_no + 1))?;
        properties.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(properties)
}

fn parse_bool_property(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(anyhow!("invalid {key}={raw}, expected true or false")),
    }
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().to_ascii_lowercase().parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_i64_env(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

fn parse_string_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
