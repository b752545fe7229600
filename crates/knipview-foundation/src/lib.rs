//! Foundation layer - result model, errors, protocol names and export codec
//!
//! This crate provides the building blocks shared by every knipview crate:
//! - The canonical, fully-normalized result model (`model`)
//! - The error taxonomy and its wire envelope (`errors`)
//! - Names of the operations served over the RPC channel (`protocol`)
//! - JSON and CSV serialization of results (`export`)

pub mod errors;
pub mod export;
pub mod model;
pub mod protocol;

// Re-export commonly used types for convenience
pub use errors::{ErrorEnvelope, KnipviewError, KnipviewResult};
pub use export::ExportFormat;
pub use model::*;
pub use protocol::ServerMethod;
