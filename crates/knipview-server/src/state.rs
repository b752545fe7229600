//! State shared by every session

use crate::editor::{EditorLauncher, SystemEditor};
use knipview_analysis_knip::{Analyzer, KnipRunner};
use knipview_config::AppConfig;
use knipview_foundation::{KnipResult, KnipviewError, KnipviewResult};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Last analysis result, process-wide
///
/// Writers swap in a whole new snapshot, so concurrent runs resolve as last
/// write wins and readers never see a partial result.
#[derive(Debug, Default)]
pub struct ResultStore {
    latest: RwLock<Option<Arc<KnipResult>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn latest(&self) -> Option<Arc<KnipResult>> {
        self.latest.read().await.clone()
    }

    /// Store `result` as the latest, returning the shared snapshot
    pub async fn replace(&self, result: KnipResult) -> Arc<KnipResult> {
        let snapshot = Arc::new(result);
        *self.latest.write().await = Some(Arc::clone(&snapshot));
        snapshot
    }
}

pub struct ServerState {
    project_root: PathBuf,
    pub analyzer: Arc<dyn Analyzer>,
    pub editor: Arc<dyn EditorLauncher>,
    pub results: ResultStore,
}

impl ServerState {
    pub fn new(
        project_root: impl Into<PathBuf>,
        analyzer: Arc<dyn Analyzer>,
        editor: Arc<dyn EditorLauncher>,
    ) -> Self {
        let project_root = project_root.into();
        let project_root = std::fs::canonicalize(&project_root).unwrap_or(project_root);
        Self {
            project_root,
            analyzer,
            editor,
            results: ResultStore::new(),
        }
    }

    /// State backed by the real `knip` runner and system editor
    pub fn from_config(config: &AppConfig, project_root: impl Into<PathBuf>) -> Self {
        Self::new(
            project_root,
            Arc::new(KnipRunner::new(config.analyzer.clone())),
            Arc::new(SystemEditor::new(config.editor.command.clone())),
        )
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve a client-supplied path against the project root
    ///
    /// Relative paths are joined onto the root and `.` and `..` are folded
    /// lexically. Symlinks along the existing part of the path are then
    /// followed, and the real location must stay inside the root.
    pub fn resolve(&self, file: &str) -> KnipviewResult<PathBuf> {
        if file.is_empty() {
            return Err(KnipviewError::invalid_request("file path is empty"));
        }

        let joined = self.project_root.join(file);
        let mut resolved = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir => {}
                other => resolved.push(other.as_os_str()),
            }
        }

        let outside = || {
            KnipviewError::invalid_request(format!(
                "path '{}' is outside the project root",
                file
            ))
        };
        if !resolved.starts_with(&self.project_root) {
            return Err(outside());
        }

        let real = real_path(&resolved);
        if !real.starts_with(&self.project_root) {
            return Err(outside());
        }
        Ok(real)
    }
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the rest
fn real_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("project_root", &self.project_root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::SystemEditor;
    use async_trait::async_trait;

    struct NoopAnalyzer;

    #[async_trait]
    impl Analyzer for NoopAnalyzer {
        async fn analyze(&self, _project_root: &Path) -> KnipviewResult<KnipResult> {
            Ok(KnipResult::empty())
        }
    }

    fn state(root: &Path) -> ServerState {
        ServerState::new(
            root,
            Arc::new(NoopAnalyzer),
            Arc::new(SystemEditor::new(None)),
        )
    }

    #[test]
    fn test_resolve_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let resolved = state.resolve("src/./a.ts").unwrap();
        assert_eq!(resolved, state.project_root().join("src").join("a.ts"));

        let folded = state.resolve("src/../lib/b.ts").unwrap();
        assert_eq!(folded, state.project_root().join("lib").join("b.ts"));
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let err = state.resolve("../../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), "InvalidRequestError");
        assert!(state.resolve("/etc/passwd").is_err());
        assert!(state.resolve("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_root_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        let state = state(dir.path());

        let err = state.resolve("link/secret.txt").unwrap_err();
        assert_eq!(err.kind(), "InvalidRequestError");
        assert!(state.resolve("link/not-there.txt").is_err());
        assert!(state.resolve("link").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_root_is_followed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::fs::write(dir.path().join("real/a.ts"), "").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
        let state = state(dir.path());

        let resolved = state.resolve("alias/a.ts").unwrap();
        assert_eq!(resolved, state.project_root().join("real").join("a.ts"));
    }

    #[test]
    fn test_absolute_path_inside_root_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let inside = state.project_root().join("x.ts");

        assert_eq!(state.resolve(inside.to_str().unwrap()).unwrap(), inside);
    }

    #[tokio::test]
    async fn test_result_store_last_write_wins() {
        let store = ResultStore::new();
        assert!(store.latest().await.is_none());

        store.replace(KnipResult::empty()).await;
        let second = KnipResult {
            files: vec!["b.ts".into()],
            ..KnipResult::default()
        };
        store.replace(second.clone()).await;

        assert_eq!(*store.latest().await.unwrap(), second);
    }
}
