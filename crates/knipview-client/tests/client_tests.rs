//! Client against a live server with a scripted analyzer

use async_trait::async_trait;
use knipview_analysis_knip::Analyzer;
use knipview_client::{user_message, ConnectionState, KnipviewClient};
use knipview_config::ServerConfig;
use knipview_foundation::{
    ConfigInfo, ConfigSource, DependencyIssue, ExportFormat, KnipResult, KnipviewError,
    KnipviewResult,
};
use knipview_server::{router, serve_listener, EditorLauncher, EditorTarget, ServerState};
use knipview_transport::RpcOptions;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

struct ScriptedAnalyzer {
    delay: Duration,
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyze(&self, _project_root: &Path) -> KnipviewResult<KnipResult> {
        tokio::time::sleep(self.delay).await;
        Ok(KnipResult {
            dependencies: vec![DependencyIssue::named("lodash")],
            ..KnipResult::default()
        })
    }
}

#[derive(Default)]
struct RecordingEditor {
    opened: Mutex<Vec<String>>,
}

#[async_trait]
impl EditorLauncher for RecordingEditor {
    async fn open(&self, target: &EditorTarget) -> KnipviewResult<()> {
        self.opened.lock().unwrap().push(target.location());
        Ok(())
    }
}

struct Harness {
    dir: tempfile::TempDir,
    url: String,
    editor: Arc<RecordingEditor>,
}

async fn harness(analysis_delay: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("knip.jsonc"), "{}").unwrap();
    std::fs::write(dir.path().join("main.ts"), "import 'lodash';\n").unwrap();

    let editor = Arc::new(RecordingEditor::default());
    let state = Arc::new(ServerState::new(
        dir.path(),
        Arc::new(ScriptedAnalyzer {
            delay: analysis_delay,
        }),
        editor.clone(),
    ));
    let server_config = ServerConfig::default();
    let app = router(state, &server_config, RpcOptions::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!(
        "ws://{}{}",
        listener.local_addr().unwrap(),
        server_config.rpc_path()
    );
    tokio::spawn(serve_listener(listener, app));

    Harness { dir, url, editor }
}

#[tokio::test]
async fn test_typed_calls() {
    let h = harness(Duration::ZERO).await;
    let client = KnipviewClient::default();
    client.connect(&h.url).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let err = client.export_results(ExportFormat::Json).await.unwrap_err();
    assert_eq!(err.kind(), "NoResultsError");

    let result = client.run_analysis().await.unwrap();
    assert_eq!(result.dependencies, vec![DependencyIssue::named("lodash")]);
    assert!(result.files.is_empty());

    let csv = client.export_results(ExportFormat::Csv).await.unwrap();
    assert_eq!(
        csv,
        "Category,File,Name,Line,Column,Specifier\ndependencies,package.json,\"lodash\",,,\n"
    );

    assert_eq!(
        client.get_config_info().await.unwrap(),
        ConfigInfo::found(ConfigSource::KnipJsonc)
    );
    assert_eq!(client.read_file("main.ts").await.unwrap(), "import 'lodash';\n");

    client.open_in_editor("main.ts", Some(1), None).await.unwrap();
    let opened = h.editor.opened.lock().unwrap().clone();
    let expected = format!("{}:1:1", h.dir.path().canonicalize().unwrap().join("main.ts").display());
    assert_eq!(opened, vec![expected]);
}

#[tokio::test]
async fn test_disconnect_tears_down_endpoint() {
    let h = harness(Duration::ZERO).await;
    let client = KnipviewClient::default();
    client.connect(&h.url).await.unwrap();

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let err = client.read_file("main.ts").await.unwrap_err();
    assert_eq!(user_message(&err), "Not connected to server");

    // reconnecting works after a disconnect
    client.connect(&h.url).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(client.read_file("main.ts").await.is_ok());
}

#[tokio::test]
async fn test_slow_analysis_times_out_on_the_client() {
    let h = harness(Duration::from_secs(30)).await;
    let client = KnipviewClient::new(RpcOptions::default().with_timeout(Duration::from_millis(100)));
    client.connect(&h.url).await.unwrap();

    let err = client.run_analysis().await.unwrap_err();
    assert!(matches!(err, KnipviewError::TransportTimeout { .. }));
    assert_eq!(
        user_message(&err),
        "Analysis timed out. Try running 'npx knip' directly."
    );

    // other calls still work on the same connection
    assert!(client.get_config_info().await.unwrap().exists);
}
