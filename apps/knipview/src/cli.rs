//! Command-line interface

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knipview_analysis_knip::{Analyzer, KnipRunner};
use knipview_client::{user_message, KnipviewClient};
use knipview_config::AppConfig;
use knipview_foundation::{ExportFormat, KnipviewResult};
use knipview_server::ServerState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "knipview")]
#[command(about = "Browse knip dead-code findings for a JavaScript/TypeScript project")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to knipview.toml in the project root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the WebSocket server (default)
    Serve {
        /// Port to bind to
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,
        /// Project root to analyze
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Run knip once and print the result
    Analyze {
        /// Project root to analyze
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Output format: json or csv
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Ask a running server to analyze, then export its result
    Export {
        /// Server RPC URL (defaults to the configured host, port and base)
        #[arg(long)]
        url: Option<String>,
        /// Output format: json or csv
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn project_root(&self) -> &Path {
        match self {
            Commands::Serve { root, .. } | Commands::Analyze { root, .. } => root.as_path(),
            Commands::Export { .. } => Path::new("."),
        }
    }
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            port: None,
            root: PathBuf::from("."),
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or_default();

    let config = match &cli.config {
        Some(path) => AppConfig::load_file(path),
        None => AppConfig::load(command.project_root()),
    }
    .context("Failed to load configuration")?;

    knipview_config::logging::initialize(&config);

    match command {
        Commands::Serve { port, root } => serve(config, port, root).await,
        Commands::Analyze {
            root,
            format,
            output,
        } => analyze(&config, &root, format, output.as_deref()).await,
        Commands::Export {
            url,
            format,
            output,
        } => export(&config, url, format, output.as_deref()).await,
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>, root: PathBuf) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = Arc::new(ServerState::from_config(&config, root));
    knipview_server::serve(&config, state)
        .await
        .context("Server stopped with an error")
}

async fn analyze(
    config: &AppConfig,
    root: &Path,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let runner = KnipRunner::new(config.analyzer.clone());
    let result = runner
        .analyze(root)
        .await
        .map_err(|e| anyhow::anyhow!(user_message(&e)))?;

    info!(total = result.total(), "Analysis complete");
    write_output(&format.render(&result)?, output)
}

async fn export(
    config: &AppConfig,
    url: Option<String>,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let url = url.unwrap_or_else(|| default_url(config));
    let client = KnipviewClient::from_config(&config.rpc);

    let exported: KnipviewResult<String> = async {
        client.connect(&url).await?;
        client.run_analysis().await?;
        client.export_results(format).await
    }
    .await;
    client.disconnect().await;

    let exported = exported.map_err(|e| anyhow::anyhow!(user_message(&e)))?;
    write_output(&exported, output)
}

fn default_url(config: &AppConfig) -> String {
    format!(
        "ws://{}:{}{}",
        config.server.host,
        config.server.port,
        config.server.rpc_path()
    )
}

fn write_output(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote export");
        }
        None => println!("{}", contents),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serve_is_the_default() {
        let cli = Cli::try_parse_from(["knipview"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
    }

    #[test]
    fn test_analyze_arguments() {
        let cli = Cli::try_parse_from([
            "knipview", "analyze", "--root", "web", "--format", "csv", "--output", "out.csv",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Analyze {
                root: PathBuf::from("web"),
                format: ExportFormat::Csv,
                output: Some(PathBuf::from("out.csv")),
            })
        );
    }

    #[test]
    fn test_rejects_unknown_format_and_port_zero() {
        assert!(Cli::try_parse_from(["knipview", "analyze", "--format", "xml"]).is_err());
        assert!(Cli::try_parse_from(["knipview", "serve", "--port", "0"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["knipview", "export", "--config", "ci/knipview.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ci/knipview.toml")));
    }

    #[test]
    fn test_default_url_follows_server_config() {
        let mut config = AppConfig::default();
        config.server.port = 6000;
        assert_eq!(default_url(&config), "ws://127.0.0.1:6000/__knip-ui/rpc");
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_output("{}", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }
}
