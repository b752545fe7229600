//! Invocation of the external analyzer process

use crate::normalize::parse_output;
use crate::Analyzer;
use async_trait::async_trait;
use knipview_config::AnalyzerConfig;
use knipview_foundation::{KnipResult, KnipviewError, KnipviewResult};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Stderr shown in logs is cut to this many characters
const STDERR_LOG_CHARS: usize = 500;

/// Runs `knip` with the JSON reporter and normalizes what it prints
#[derive(Debug, Clone)]
pub struct KnipRunner {
    config: AnalyzerConfig,
}

impl KnipRunner {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run the analyzer in `project_root`
    ///
    /// # Errors
    ///
    /// - `AnalyzerExecution` when the process cannot be spawned, exceeds the
    ///   output cap, or exits with a code other than 0/1 and prints nothing
    /// - `AnalyzerTimeout` when it runs longer than the configured ceiling;
    ///   the process is killed
    /// - `AnalyzerOutputParse` when stdout is not a JSON document
    pub async fn run(&self, project_root: &Path) -> KnipviewResult<KnipResult> {
        let (program, leading_args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| KnipviewError::config("Analyzer command cannot be empty"))?;

        let start = Instant::now();
        info!(
            command = %self.config.command.join(" "),
            args = %self.config.args.join(" "),
            root = %project_root.display(),
            timeout_secs = self.config.timeout_secs,
            "Running knip"
        );

        let mut child = Command::new(program)
            .args(leading_args)
            .args(&self.config.args)
            .current_dir(project_root)
            .env("FORCE_COLOR", "0")
            .env("NO_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                KnipviewError::analyzer_execution(format!("failed to start '{}': {}", program, e), None)
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| KnipviewError::internal("analyzer stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| KnipviewError::internal("analyzer stderr was not captured"))?;

        let limit = self.config.max_output_bytes;
        let completed = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), async {
            tokio::try_join!(
                read_capped(stdout, limit, "stdout"),
                read_capped(stderr, limit, "stderr"),
                async { child.wait().await.map_err(KnipviewError::from) },
            )
        })
        .await;

        let (stdout, stderr, status) = match completed {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(
                    timeout_secs = self.config.timeout_secs,
                    "knip timed out, killing process"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out knip process");
                }
                return Err(KnipviewError::analyzer_timeout(self.config.timeout_secs));
            }
        };

        let exit_code = status.code();
        debug!(
            exit_code = ?exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "knip finished"
        );

        let stderr = stderr.trim();
        if !stderr.is_empty() {
            warn!(
                stderr = %stderr.chars().take(STDERR_LOG_CHARS).collect::<String>(),
                "knip wrote to stderr"
            );
        }

        if stdout.trim().is_empty() {
            return match exit_code {
                Some(0) | Some(1) => Ok(KnipResult::empty()),
                code => Err(KnipviewError::analyzer_execution(
                    format!(
                        "Knip exited with code {}. stderr: {}",
                        code.map_or_else(|| "none".to_string(), |c| c.to_string()),
                        if stderr.is_empty() { "(empty)" } else { stderr }
                    ),
                    code,
                )),
            };
        }

        let result = parse_output(&stdout)?;
        info!(
            issues = result.total(),
            files = result.files.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "knip analysis complete"
        );
        Ok(result)
    }
}

#[async_trait]
impl Analyzer for KnipRunner {
    async fn analyze(&self, project_root: &Path) -> KnipviewResult<KnipResult> {
        self.run(project_root).await
    }
}

/// Read a stream to the end, failing once it exceeds `limit` bytes
async fn read_capped<R>(reader: R, limit: usize, stream: &str) -> KnipviewResult<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let read = reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut buf)
        .await?;

    if read > limit {
        return Err(KnipviewError::analyzer_execution(
            format!("knip {} exceeded {} bytes", stream, limit),
            None,
        ));
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
