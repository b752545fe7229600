//! Opening files in the user's editor

use async_trait::async_trait;
use knipview_foundation::{KnipviewError, KnipviewResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variables consulted, in order, when no editor is configured
pub const EDITOR_ENV_VARS: [&str; 3] = ["LAUNCH_EDITOR", "VISUAL", "EDITOR"];

/// Editors probed on `PATH` as a last resort
pub const KNOWN_EDITORS: [&str; 4] = ["code", "cursor", "zed", "subl"];

/// A file position to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorTarget {
    pub path: PathBuf,
    pub line: Option<u32>,
    pub col: Option<u32>,
}

impl EditorTarget {
    pub fn new(path: impl Into<PathBuf>, line: Option<u32>, col: Option<u32>) -> Self {
        Self {
            path: path.into(),
            line,
            col,
        }
    }

    /// `path:line:col` when a line is known (column defaults to 1), else the path
    ///
    /// Line 0 counts as unknown.
    pub fn location(&self) -> String {
        match self.line.filter(|&line| line > 0) {
            Some(line) => format!("{}:{}:{}", self.path.display(), line, self.col.unwrap_or(1)),
            None => self.path.display().to_string(),
        }
    }
}

#[async_trait]
pub trait EditorLauncher: Send + Sync {
    /// Launch the editor at `target` without waiting for it to exit
    async fn open(&self, target: &EditorTarget) -> KnipviewResult<()>;
}

/// How an editor expects to be told the position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorFamily {
    /// `-g path:line:col`
    Goto,
    /// `path:line:col`
    Location,
    /// `+line path`
    Terminal,
}

impl EditorFamily {
    fn of(program: &str) -> Self {
        let name = Path::new(program)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(program)
            .to_lowercase();

        match name.as_str() {
            "code" | "code-insiders" | "cursor" | "codium" | "vscodium" | "windsurf" => Self::Goto,
            "vim" | "nvim" | "vi" | "nano" | "emacs" | "hx" => Self::Terminal,
            _ => Self::Location,
        }
    }
}

/// Program plus its fixed leading arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorCommand {
    /// Split a command line such as `code --wait` on whitespace
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Full argument list for opening `target`
    pub fn args_for(&self, target: &EditorTarget) -> Vec<String> {
        let mut args = self.args.clone();
        match (EditorFamily::of(&self.program), target.line.filter(|&line| line > 0)) {
            (EditorFamily::Goto, Some(_)) => {
                args.push("-g".to_string());
                args.push(target.location());
            }
            (EditorFamily::Terminal, Some(line)) => {
                args.push(format!("+{}", line));
                args.push(target.path.display().to_string());
            }
            _ => args.push(target.location()),
        }
        args
    }

    /// Pick an editor: explicit command, then environment, then `PATH`
    pub fn resolve(
        configured: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
        on_path: impl Fn(&str) -> bool,
    ) -> Option<Self> {
        if let Some(command) = configured.and_then(Self::parse) {
            return Some(command);
        }

        for var in EDITOR_ENV_VARS {
            if let Some(command) = env(var).as_deref().and_then(Self::parse) {
                debug!(var = %var, program = %command.program, "Editor from environment");
                return Some(command);
            }
        }

        KNOWN_EDITORS
            .into_iter()
            .find(|program| on_path(program))
            .and_then(Self::parse)
    }
}

/// Launches a real editor process
#[derive(Debug, Clone, Default)]
pub struct SystemEditor {
    configured: Option<String>,
}

impl SystemEditor {
    pub fn new(configured: Option<String>) -> Self {
        Self { configured }
    }

    fn command(&self) -> KnipviewResult<EditorCommand> {
        EditorCommand::resolve(
            self.configured.as_deref(),
            |var| std::env::var(var).ok(),
            |program| which::which(program).is_ok(),
        )
        .ok_or_else(|| {
            KnipviewError::editor(
                "no editor found; set editor.command in knipview.toml or the EDITOR variable",
            )
        })
    }
}

#[async_trait]
impl EditorLauncher for SystemEditor {
    async fn open(&self, target: &EditorTarget) -> KnipviewResult<()> {
        let command = self.command()?;
        let args = command.args_for(target);

        info!(program = %command.program, location = %target.location(), "Opening editor");

        let mut child = Command::new(&command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                KnipviewError::editor(format!("failed to launch '{}': {}", command.program, e))
            })?;

        // reap in the background
        tokio::spawn(async move {
            if let Err(e) = child.wait().await {
                warn!(error = %e, "Editor process wait failed");
            }
        });

        Ok(())
    }
}
