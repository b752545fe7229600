//! Application configuration

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use knipview_foundation::{KnipviewError, KnipviewResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config files probed in the project root, first match wins
pub const CONFIG_FILES: [&str; 2] = ["knipview.toml", ".knipview/config.toml"];

/// Prefix for environment overrides, `KNIPVIEW__SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "KNIPVIEW__";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub analyzer: AnalyzerConfig,
    pub rpc: RpcConfig,
    pub editor: EditorConfig,
    pub logging: LoggingConfig,
}

/// HTTP/WebSocket listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Route prefix; the RPC endpoint lives at `{base}/rpc`
    pub base: String,
    /// Maximum number of concurrent connections
    pub max_clients: Option<usize>,
}

/// External analyzer invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Program followed by its leading arguments
    pub command: Vec<String>,
    /// Arguments appended after `command`
    pub args: Vec<String>,
    /// Hard ceiling on a single run
    pub timeout_secs: u64,
    /// Cap on captured stdout and on captured stderr
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-call timeout for calls made over the RPC channel
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor command; detected from the environment when unset
    pub command: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// Structured JSON format
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5174,
            base: "/__knip-ui".to_string(),
            max_clients: None,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: vec!["npx".to_string(), "knip".to_string()],
            args: vec![
                "--cache".to_string(),
                "--reporter".to_string(),
                "json".to_string(),
            ],
            timeout_secs: 300,
            max_output_bytes: 50 * 1024 * 1024, // 50 MiB
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 6 * 60 * 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Path of the WebSocket RPC route
    pub fn rpc_path(&self) -> String {
        format!("{}/rpc", self.base.trim_end_matches('/'))
    }
}

impl AppConfig {
    /// Load configuration for a project
    ///
    /// Priority order: env vars > `knipview.toml` (or `.knipview/config.toml`)
    /// in `project_root` > defaults.
    pub fn load(project_root: &Path) -> KnipviewResult<Self> {
        let file = CONFIG_FILES
            .iter()
            .map(|name| project_root.join(name))
            .find(|path| path.is_file());

        Self::extract(file)
    }

    /// Load configuration from an explicit TOML file, still honoring env vars
    pub fn load_file(path: &Path) -> KnipviewResult<Self> {
        if !path.is_file() {
            return Err(KnipviewError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::extract(Some(path.to_path_buf()))
    }

    fn extract(file: Option<PathBuf>) -> KnipviewResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = &file {
            tracing::info!(path = %path.display(), "Loading TOML configuration");
            figment = figment.merge(Toml::file(path));
        }

        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| KnipviewError::config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;

        tracing::debug!(
            port = config.server.port,
            base = %config.server.base,
            analyzer = %config.analyzer.command.join(" "),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> KnipviewResult<()> {
        if self.server.port == 0 {
            return Err(KnipviewError::config("Server port cannot be 0"));
        }

        if !self.server.base.starts_with('/') {
            return Err(KnipviewError::config(format!(
                "Server base '{}' must start with '/'",
                self.server.base
            )));
        }

        if self.server.max_clients == Some(0) {
            return Err(KnipviewError::config("Server max_clients cannot be 0"));
        }

        if self.analyzer.command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(KnipviewError::config("Analyzer command cannot be empty"));
        }

        if self.analyzer.timeout_secs == 0 {
            return Err(KnipviewError::config("Analyzer timeout cannot be 0"));
        }

        if self.analyzer.max_output_bytes == 0 {
            return Err(KnipviewError::config("Analyzer max_output_bytes cannot be 0"));
        }

        if self.rpc.timeout_ms == 0 {
            return Err(KnipviewError::config("RPC timeout cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(KnipviewError::config(format!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}
