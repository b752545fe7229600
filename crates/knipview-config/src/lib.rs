//! Configuration and logging for knipview
//!
//! Configuration is layered with figment: built-in defaults, then a TOML file
//! in the project root, then `KNIPVIEW__`-prefixed environment variables.

pub mod config;
pub mod logging;

pub use config::{
    AnalyzerConfig, AppConfig, EditorConfig, LogFormat, LoggingConfig, RpcConfig, ServerConfig,
};
