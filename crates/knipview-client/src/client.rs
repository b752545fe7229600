use futures_util::future::ready;
use futures_util::{SinkExt, StreamExt};
use knipview_config::RpcConfig;
use knipview_foundation::{
    ConfigInfo, ExportFormat, KnipResult, KnipviewError, KnipviewResult, ServerMethod,
};
use knipview_transport::{NoFunctions, RpcEndpoint, RpcOptions};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use url::Url;

/// Where the client is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

enum Link {
    Disconnected,
    Connecting,
    Connected {
        generation: u64,
        endpoint: RpcEndpoint,
    },
}

/// Typed access to a knipview server
///
/// The RPC endpoint only exists while connected; any call made in another
/// state fails with a connection error.
pub struct KnipviewClient {
    options: RpcOptions,
    link: Arc<Mutex<Link>>,
    generation: AtomicU64,
}

impl KnipviewClient {
    pub fn new(options: RpcOptions) -> Self {
        let options = if options.on_timeout.is_some() {
            options
        } else {
            options.on_timeout(|method| warn!(method = %method, "RPC timeout"))
        };

        Self {
            options,
            link: Arc::new(Mutex::new(Link::Disconnected)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RpcConfig) -> Self {
        Self::new(RpcOptions::from(config))
    }

    pub fn state(&self) -> ConnectionState {
        match &*lock(&self.link) {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connecting => ConnectionState::Connecting,
            Link::Connected { endpoint, .. } if endpoint.is_closed() => {
                ConnectionState::Disconnected
            }
            Link::Connected { .. } => ConnectionState::Connected,
        }
    }

    /// Open the WebSocket at `url`, e.g. `ws://127.0.0.1:5174/__knip-ui/rpc`
    ///
    /// Connecting while already connected is a no-op.
    pub async fn connect(&self, url: &str) -> KnipviewResult<()> {
        let url = Url::parse(url)
            .map_err(|e| KnipviewError::invalid_request(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(KnipviewError::invalid_request(format!(
                "Unsupported URL scheme '{}' (expected ws or wss)",
                url.scheme()
            )));
        }

        {
            let mut link = lock(&self.link);
            match &*link {
                Link::Connected { endpoint, .. } if !endpoint.is_closed() => return Ok(()),
                Link::Connecting => {
                    return Err(KnipviewError::connection("Connection attempt already in progress"))
                }
                _ => *link = Link::Connecting,
            }
        }

        // back to disconnected on failure or if this future is dropped mid-handshake
        let attempt = ConnectAttempt { link: &self.link };

        info!(url = %url, "Connecting to knipview server");
        let (socket, _) = connect_async(url.as_str()).await.map_err(|e| {
            KnipviewError::connection(format!("WebSocket connection failed: {}", e))
        })?;

        let (sink, stream) = socket.split();
        let incoming = stream
            .take_while(|message| ready(matches!(message, Ok(m) if !m.is_close())))
            .filter_map(|message| {
                ready(match message {
                    Ok(Message::Text(text)) => Some(text.to_string()),
                    _ => None,
                })
            });
        let outgoing =
            sink.with(|text: String| ready(Ok::<_, tungstenite::Error>(Message::Text(text.into()))));

        let endpoint = RpcEndpoint::attach(
            Arc::new(NoFunctions),
            self.options.clone(),
            incoming,
            outgoing,
        );

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.link) = Link::Connected {
            generation,
            endpoint: endpoint.clone(),
        };
        drop(attempt);
        info!("Connected");

        // drop back to disconnected when the server goes away
        let link = Arc::clone(&self.link);
        tokio::spawn(async move {
            endpoint.closed().await;
            let mut link = lock(&link);
            if matches!(&*link, Link::Connected { generation: g, .. } if *g == generation) {
                *link = Link::Disconnected;
                debug!("Connection closed by server");
            }
        });

        Ok(())
    }

    /// Tear down the connection; pending calls fail with a connection error
    pub async fn disconnect(&self) {
        let previous = std::mem::replace(&mut *lock(&self.link), Link::Disconnected);
        if let Link::Connected { endpoint, .. } = previous {
            endpoint.close().await;
            info!("Disconnected");
        }
    }

    fn endpoint(&self) -> KnipviewResult<RpcEndpoint> {
        match &*lock(&self.link) {
            Link::Connected { endpoint, .. } if !endpoint.is_closed() => Ok(endpoint.clone()),
            _ => Err(KnipviewError::connection("Not connected to server")),
        }
    }

    pub async fn run_analysis(&self) -> KnipviewResult<KnipResult> {
        self.endpoint()?
            .request(ServerMethod::RunAnalysis.as_str(), vec![])
            .await
    }

    pub async fn open_in_editor(
        &self,
        file: &str,
        line: Option<u32>,
        col: Option<u32>,
    ) -> KnipviewResult<()> {
        self.endpoint()?
            .call(
                ServerMethod::OpenInEditor.as_str(),
                vec![json!(file), json!(line), json!(col)],
            )
            .await?;
        Ok(())
    }

    pub async fn read_file(&self, file: &str) -> KnipviewResult<String> {
        self.endpoint()?
            .request(ServerMethod::ReadFile.as_str(), vec![json!(file)])
            .await
    }

    pub async fn get_config_info(&self) -> KnipviewResult<ConfigInfo> {
        self.endpoint()?
            .request(ServerMethod::GetConfigInfo.as_str(), vec![])
            .await
    }

    pub async fn export_results(&self, format: ExportFormat) -> KnipviewResult<String> {
        self.endpoint()?
            .request(
                ServerMethod::ExportResults.as_str(),
                vec![Value::String(format.as_str().to_string())],
            )
            .await
    }
}

impl Default for KnipviewClient {
    fn default() -> Self {
        Self::new(RpcOptions::default())
    }
}

impl std::fmt::Debug for KnipviewClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnipviewClient")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}

/// Resets a `Connecting` link when dropped
struct ConnectAttempt<'a> {
    link: &'a Mutex<Link>,
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        let mut link = lock(self.link);
        if matches!(&*link, Link::Connecting) {
            *link = Link::Disconnected;
        }
    }
}

fn lock(link: &Mutex<Link>) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
