use std::path::Path;

use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Checker-level switches for the qualifier algebra, usually read from the `[qualifiers]` table of
/// a checker's TOML configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct QualifierConfig {
    #[serde(default)]
    pub subtyping: SubtypingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct SubtypingConfig {
    /// Skip the type argument check when either side is a raw type.
    #[serde(default = "default_ignore_raw_types")]
    pub ignore_raw_types: bool,
    /// Require array components to be equal instead of subtypes.
    #[serde(default)]
    pub invariant_array_components: bool,
    /// Compare non-wildcard type arguments by subtyping instead of equality.
    #[serde(default)]
    pub covariant_type_args: bool,
}

fn default_ignore_raw_types() -> bool {
    true
}

impl Default for SubtypingConfig {
    fn default() -> Self {
        Self {
            ignore_raw_types: default_ignore_raw_types(),
            invariant_array_components: false,
            covariant_type_args: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` embeds a snippet of the input; the message alone is enough.
        ConfigError::Toml(err.message().to_string())
    }
}

impl QualifierConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: QualifierConfig = toml::from_str(text)?;
        tracing::debug!(target: "nova.qualifiers", ?config, "loaded qualifier config");
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// JSON schema for the qualifier configuration, for editor tooling and CI validation.
#[must_use]
pub fn json_schema() -> RootSchema {
    schema_for!(QualifierConfig)
}
