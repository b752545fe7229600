//! HTTP and WebSocket plumbing

use crate::session::SessionFunctions;
use crate::state::ServerState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::future::ready;
use futures_util::{SinkExt, StreamExt};
use knipview_config::logging::connection_span;
use knipview_config::{AppConfig, ServerConfig};
use knipview_foundation::{KnipviewError, KnipviewResult};
use knipview_transport::{RpcEndpoint, RpcOptions};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn, Instrument};

/// Counts a live connection for as long as it is held
struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    /// Register a connection unless `limit` is already reached
    fn acquire(counter: &Arc<AtomicUsize>, limit: Option<usize>) -> Option<Self> {
        let admitted = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match limit {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .is_ok();

        admitted.then(|| Self {
            counter: Arc::clone(counter),
        })
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct RouterState {
    state: Arc<ServerState>,
    rpc: RpcOptions,
    connections: Arc<AtomicUsize>,
    max_clients: Option<usize>,
}

/// Routes: `GET /health` and the RPC WebSocket at `{base}/rpc`
pub fn router(state: Arc<ServerState>, server_config: &ServerConfig, rpc: RpcOptions) -> Router {
    let router_state = RouterState {
        state,
        rpc,
        connections: Arc::new(AtomicUsize::new(0)),
        max_clients: server_config.max_clients,
    };

    Router::new()
        .route("/health", get(health))
        .route(&server_config.rpc_path(), get(rpc_upgrade))
        .with_state(router_state)
}

async fn health(State(router_state): State<RouterState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": router_state.connections.load(Ordering::SeqCst),
    }))
}

async fn rpc_upgrade(
    State(router_state): State<RouterState>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let Some(guard) =
        ConnectionGuard::acquire(&router_state.connections, router_state.max_clients)
    else {
        warn!(
            max_clients = ?router_state.max_clients,
            "Rejecting connection: client limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many clients").into_response();
    };

    upgrade.on_upgrade(move |socket| async move {
        let _guard = guard;
        handle_socket(socket, router_state).await;
    })
}

/// Serve one client until either side closes
async fn handle_socket(socket: WebSocket, router_state: RouterState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let span = connection_span(&session_id);

    async move {
        info!("Client connected");

        let (sink, stream) = socket.split();
        let incoming = stream
            .take_while(|message| {
                ready(match message {
                    Ok(Message::Close(_)) => false,
                    Ok(_) => true,
                    Err(e) => {
                        debug!(error = %e, "WebSocket read failed");
                        false
                    }
                })
            })
            .filter_map(|message| {
                ready(match message {
                    Ok(Message::Text(text)) => Some(text.to_string()),
                    _ => None,
                })
            });
        let outgoing =
            sink.with(|text: String| ready(Ok::<_, axum::Error>(Message::Text(text.into()))));

        let functions = SessionFunctions::new(Arc::clone(&router_state.state));
        let endpoint = RpcEndpoint::attach(
            Arc::new(functions),
            router_state.rpc.clone(),
            incoming,
            outgoing,
        );
        endpoint.closed().await;

        info!("Client disconnected");
    }
    .instrument(span)
    .await
}

/// Bind `host:port` from `config` and serve until Ctrl-C
pub async fn serve(config: &AppConfig, state: Arc<ServerState>) -> KnipviewResult<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| KnipviewError::connection(format!("failed to bind {}: {}", addr, e)))?;

    info!(
        addr = %addr,
        rpc_path = %config.server.rpc_path(),
        project_root = %state.project_root().display(),
        "knipview server listening"
    );

    let app = router(state, &config.server, RpcOptions::from(&config.rpc));
    serve_listener(listener, app).await
}

/// Serve `app` on an already bound listener until Ctrl-C
pub async fn serve_listener(listener: TcpListener, app: Router) -> KnipviewResult<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
