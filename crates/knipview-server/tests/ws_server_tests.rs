//! End-to-end tests over a real WebSocket

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use knipview_analysis_knip::Analyzer;
use knipview_config::ServerConfig;
use knipview_foundation::{KnipResult, KnipviewError, KnipviewResult, SymbolIssue};
use knipview_server::{router, EditorLauncher, EditorTarget, ServerState};
use knipview_transport::RpcOptions;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct FixedAnalyzer;

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, _project_root: &Path) -> KnipviewResult<KnipResult> {
        Ok(KnipResult {
            files: vec!["src/unused.ts".into()],
            exports: vec![SymbolIssue {
                file: "src/a.ts".into(),
                name: "helper".into(),
                line: 4,
                col: 14,
            }],
            ..KnipResult::default()
        })
    }
}

struct NoEditor;

#[async_trait]
impl EditorLauncher for NoEditor {
    async fn open(&self, _target: &EditorTarget) -> KnipviewResult<()> {
        Err(KnipviewError::editor("no editor in tests"))
    }
}

async fn start(project_root: &Path, max_clients: Option<usize>) -> SocketAddr {
    let state = Arc::new(ServerState::new(
        project_root,
        Arc::new(FixedAnalyzer),
        Arc::new(NoEditor),
    ));
    let server_config = ServerConfig {
        max_clients,
        ..ServerConfig::default()
    };
    let app = router(state, &server_config, RpcOptions::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{}/__knip-ui/rpc", addr);
    let (client, _) = connect_async(url).await.expect("connect");
    client
}

/// Send a raw request frame and wait for its reply
async fn call(client: &mut Client, id: &str, method: &str, args: Value) -> Value {
    let frame = json!({"t": "q", "i": id, "m": method, "a": args});
    client
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();

    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("reply in time")
            .expect("stream open")
            .unwrap();
        if let Message::Text(text) = message {
            let reply: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(reply["t"], json!("s"));
            assert_eq!(reply["i"], json!(id));
            return reply;
        }
    }
}

#[tokio::test]
async fn test_analysis_and_export_over_websocket() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path(), None).await;
    let mut client = connect(addr).await;

    let reply = call(&mut client, "req_1", "exportResults", json!(["json"])).await;
    assert_eq!(reply["e"]["__isError"], json!(true));
    assert_eq!(reply["e"]["name"], json!("NoResultsError"));

    let reply = call(&mut client, "req_2", "runAnalysis", json!([])).await;
    assert_eq!(reply["r"]["files"], json!(["src/unused.ts"]));
    assert_eq!(reply["r"]["exports"][0]["name"], json!("helper"));

    let reply = call(&mut client, "req_3", "exportResults", json!(["csv"])).await;
    assert_eq!(
        reply["r"],
        json!("Category,File,Name,Line,Column,Specifier\nfiles,\"src/unused.ts\",,,,\nexports,\"src/a.ts\",\"helper\",4,14,\n")
    );
}

#[tokio::test]
async fn test_results_are_shared_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path(), None).await;

    let mut first = connect(addr).await;
    call(&mut first, "req_1", "runAnalysis", json!([])).await;

    let mut second = connect(addr).await;
    let reply = call(&mut second, "req_1", "exportResults", json!(["json"])).await;
    let exported: Value = serde_json::from_str(reply["r"].as_str().unwrap()).unwrap();
    assert_eq!(exported["files"], json!(["src/unused.ts"]));
}

#[tokio::test]
async fn test_file_and_config_calls() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("knip.json"), "{}").unwrap();
    std::fs::write(dir.path().join("index.ts"), "console.log(1);\n").unwrap();
    let addr = start(dir.path(), None).await;
    let mut client = connect(addr).await;

    let reply = call(&mut client, "a", "getConfigInfo", json!([])).await;
    assert_eq!(
        reply["r"],
        json!({"exists": true, "path": "knip.json", "source": "knip.json"})
    );

    let reply = call(&mut client, "b", "readFile", json!(["index.ts"])).await;
    assert_eq!(reply["r"], json!("console.log(1);\n"));

    let reply = call(&mut client, "c", "readFile", json!(["gone.ts"])).await;
    assert_eq!(reply["e"]["name"], json!("NotFoundError"));

    let reply = call(&mut client, "d", "openInEditor", json!(["index.ts", 1])).await;
    assert_eq!(reply["e"]["name"], json!("EditorError"));

    let reply = call(&mut client, "e", "formatDisk", json!([])).await;
    assert_eq!(reply["e"]["name"], json!("InvalidRequestError"));
}

#[tokio::test]
async fn test_max_clients_rejects_extra_connections() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path(), Some(1)).await;

    let _first = connect(addr).await;
    let err = connect_async(format!("ws://{}/__knip-ui/rpc", addr))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 503);
        }
        other => panic!("expected HTTP rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path(), None).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"ok""#));
}
