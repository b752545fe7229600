//! knipview server
//!
//! Each WebSocket connection on `{base}/rpc` gets its own RPC endpoint
//! serving [`SessionFunctions`]. All sessions share one [`ServerState`]:
//! the project root, the analyzer, the editor launcher and the last
//! analysis result.

pub mod config_detect;
pub mod editor;
pub mod server;
pub mod session;
pub mod state;

pub use config_detect::detect_config;
pub use editor::{EditorCommand, EditorLauncher, EditorTarget, SystemEditor};
pub use server::{router, serve, serve_listener};
pub use session::SessionFunctions;
pub use state::{ResultStore, ServerState};
