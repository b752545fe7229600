//! Functions served to each connected client

use crate::config_detect::detect_config;
use crate::editor::EditorTarget;
use crate::state::ServerState;
use async_trait::async_trait;
use knipview_foundation::{
    ConfigInfo, ExportFormat, KnipResult, KnipviewError, KnipviewResult, ServerMethod,
};
use knipview_transport::RpcHandler;
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Per-connection façade over the shared [`ServerState`]
#[derive(Debug, Clone)]
pub struct SessionFunctions {
    state: Arc<ServerState>,
}

impl SessionFunctions {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Run the analyzer and publish its result as the latest
    pub async fn run_analysis(&self) -> KnipviewResult<Arc<KnipResult>> {
        let started = Instant::now();
        let result = self
            .state
            .analyzer
            .analyze(self.state.project_root())
            .await?;

        info!(
            total = result.total(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Analysis finished"
        );
        Ok(self.state.results.replace(result).await)
    }

    pub async fn open_in_editor(
        &self,
        file: &str,
        line: Option<u32>,
        col: Option<u32>,
    ) -> KnipviewResult<()> {
        let path = self.state.resolve(file)?;
        let target = EditorTarget::new(path, line, col);
        self.state.editor.open(&target).await.map_err(|e| match e {
            KnipviewError::Editor { .. } => e,
            other => KnipviewError::editor(other.to_string()),
        })
    }

    pub async fn read_file(&self, file: &str) -> KnipviewResult<String> {
        let path = self.state.resolve(file)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(KnipviewError::not_found(file)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_config_info(&self) -> ConfigInfo {
        detect_config(self.state.project_root()).await
    }

    /// Serialize the latest result
    pub async fn export_results(&self, format: ExportFormat) -> KnipviewResult<String> {
        let latest = self
            .state
            .results
            .latest()
            .await
            .ok_or(KnipviewError::NoResults)?;
        format.render(&latest)
    }

    async fn dispatch(&self, method: ServerMethod, args: &[Value]) -> KnipviewResult<Value> {
        match method {
            ServerMethod::RunAnalysis => to_value(&*self.run_analysis().await?),
            ServerMethod::OpenInEditor => {
                let file = required_str(args, 0, "file")?;
                // line 0 means no position
                let line = optional_u32(args, 1, "line")?.filter(|&line| line > 0);
                let col = optional_u32(args, 2, "col")?;
                self.open_in_editor(file, line, col).await?;
                Ok(Value::Null)
            }
            ServerMethod::ReadFile => {
                let file = required_str(args, 0, "file")?;
                Ok(Value::String(self.read_file(file).await?))
            }
            ServerMethod::GetConfigInfo => to_value(&self.get_config_info().await),
            ServerMethod::ExportResults => {
                let format: ExportFormat = required_str(args, 0, "format")?.parse()?;
                Ok(Value::String(self.export_results(format).await?))
            }
        }
    }
}

#[async_trait]
impl RpcHandler for SessionFunctions {
    async fn handle(&self, method: &str, args: Vec<Value>) -> KnipviewResult<Value> {
        let method: ServerMethod = method.parse().map_err(KnipviewError::invalid_request)?;
        debug!(method = %method, args = args.len(), "Serving call");
        self.dispatch(method, &args).await
    }
}

fn to_value<T: Serialize>(value: &T) -> KnipviewResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn required_str<'a>(args: &'a [Value], index: usize, name: &str) -> KnipviewResult<&'a str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(KnipviewError::invalid_request(format!(
            "argument '{}' must be a string, got {}",
            name, other
        ))),
        None => Err(KnipviewError::invalid_request(format!(
            "missing argument '{}'",
            name
        ))),
    }
}

/// Absent and `null` both mean "not given"
fn optional_u32(args: &[Value], index: usize, name: &str) -> KnipviewResult<Option<u32>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                KnipviewError::invalid_request(format!(
                    "argument '{}' must be a non-negative integer, got {}",
                    name, value
                ))
            }),
    }
}
