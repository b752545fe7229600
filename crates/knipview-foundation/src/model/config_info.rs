//! Analyzer configuration presence

use serde::{Deserialize, Serialize};

/// Where the analyzer configuration was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    #[serde(rename = "knip.json")]
    KnipJson,
    #[serde(rename = "knip.jsonc")]
    KnipJsonc,
    #[serde(rename = "package.json")]
    PackageJson,
}

impl ConfigSource {
    /// Probe order, highest priority first
    pub const PRIORITY: [ConfigSource; 3] = [Self::KnipJson, Self::KnipJsonc, Self::PackageJson];

    /// File name relative to the project root
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::KnipJson => "knip.json",
            Self::KnipJsonc => "knip.jsonc",
            Self::PackageJson => "package.json",
        }
    }
}

/// Result of probing the project root for analyzer configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ConfigSource>,
}

impl ConfigInfo {
    /// No configuration found
    pub fn missing() -> Self {
        Self::default()
    }

    /// Configuration found at `source`
    pub fn found(source: ConfigSource) -> Self {
        Self {
            exists: true,
            path: Some(source.file_name().to_string()),
            source: Some(source),
        }
    }
}
