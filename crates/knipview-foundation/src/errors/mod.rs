//! Error taxonomy shared by every knipview crate
//!
//! Each variant has a stable [`KnipviewError::kind`] string. The kind is what
//! crosses the wire inside an [`ErrorEnvelope`], so a client can tell an
//! analyzer timeout from a missing file without parsing messages.

mod conversions;

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias for convenience
pub type KnipviewResult<T> = Result<T, KnipviewError>;

/// Error kinds, as they appear in [`ErrorEnvelope::name`]
pub mod kinds {
    pub const ANALYZER_EXECUTION: &str = "AnalyzerExecutionError";
    pub const ANALYZER_TIMEOUT: &str = "AnalyzerTimeoutError";
    pub const ANALYZER_OUTPUT_PARSE: &str = "AnalyzerOutputParseError";
    pub const TRANSPORT_TIMEOUT: &str = "TransportTimeoutError";
    pub const NOT_FOUND: &str = "NotFoundError";
    pub const NO_RESULTS: &str = "NoResultsError";
    pub const CONNECTION: &str = "ConnectionError";
    pub const EDITOR: &str = "EditorError";
    pub const INVALID_REQUEST: &str = "InvalidRequestError";
    pub const CONFIG: &str = "ConfigError";
    pub const IO: &str = "IoError";
    pub const JSON: &str = "JsonError";
    pub const INTERNAL: &str = "InternalError";
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KnipviewError {
    /// The analyzer could not be run, or exited abnormally without output
    #[error("Knip analysis failed: {message}")]
    AnalyzerExecution {
        message: String,
        exit_code: Option<i32>,
    },

    /// The analyzer exceeded its configured ceiling and was killed
    #[error("Knip analysis timed out after {timeout_secs}s. Try running 'npx knip --reporter json' directly.")]
    AnalyzerTimeout { timeout_secs: u64 },

    /// The analyzer printed something that is not a JSON document
    #[error("Knip output is not valid JSON ({message}). Run 'npx knip --reporter json' manually to debug.")]
    AnalyzerOutputParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A remote call got no reply within the per-call timeout
    #[error("RPC call '{method}' timed out after {timeout_ms}ms")]
    TransportTimeout { method: String, timeout_ms: u64 },

    #[error("File not found: {resource}")]
    NotFound { resource: String },

    /// Export was requested before any analysis ran in this process
    #[error("No analysis results available. Run analysis first.")]
    NoResults,

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Failed to open editor: {message}")]
    Editor { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// An error raised on the other end of an RPC channel
    #[error("{message}")]
    Remote {
        kind: String,
        message: String,
        stack: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KnipviewError {
    pub fn analyzer_execution(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::AnalyzerExecution {
            message: message.into(),
            exit_code,
        }
    }

    pub fn analyzer_timeout(timeout_secs: u64) -> Self {
        Self::AnalyzerTimeout { timeout_secs }
    }

    pub fn analyzer_output_parse(source: serde_json::Error) -> Self {
        Self::AnalyzerOutputParse {
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn transport_timeout(method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::TransportTimeout {
            method: method.into(),
            timeout_ms,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn editor(message: impl Into<String>) -> Self {
        Self::Editor {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable identifier of the error category
    ///
    /// Remote errors report the kind raised on the other end.
    pub fn kind(&self) -> &str {
        match self {
            Self::AnalyzerExecution { .. } => kinds::ANALYZER_EXECUTION,
            Self::AnalyzerTimeout { .. } => kinds::ANALYZER_TIMEOUT,
            Self::AnalyzerOutputParse { .. } => kinds::ANALYZER_OUTPUT_PARSE,
            Self::TransportTimeout { .. } => kinds::TRANSPORT_TIMEOUT,
            Self::NotFound { .. } => kinds::NOT_FOUND,
            Self::NoResults => kinds::NO_RESULTS,
            Self::Connection { .. } => kinds::CONNECTION,
            Self::Editor { .. } => kinds::EDITOR,
            Self::InvalidRequest { .. } => kinds::INVALID_REQUEST,
            Self::Config { .. } => kinds::CONFIG,
            Self::Io { .. } => kinds::IO,
            Self::Json { .. } => kinds::JSON,
            Self::Remote { kind, .. } => kind,
            Self::Internal { .. } => kinds::INTERNAL,
        }
    }

    /// True for analyzer and transport timeouts, local or remote
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind(),
            kinds::ANALYZER_TIMEOUT | kinds::TRANSPORT_TIMEOUT
        )
    }

    /// Marshal into the wire envelope
    ///
    /// `stack` carries the error followed by its source chain. A remote error
    /// being forwarded keeps the stack it arrived with.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let stack = match self {
            Self::Remote { stack, .. } => stack.clone(),
            _ => {
                let mut stack = format!("{}: {}", self.kind(), self);
                let mut source = self.source();
                while let Some(cause) = source {
                    stack.push_str("\n    caused by: ");
                    stack.push_str(&cause.to_string());
                    source = cause.source();
                }
                Some(stack)
            }
        };

        ErrorEnvelope {
            is_error: true,
            name: self.kind().to_string(),
            message: self.to_string(),
            stack,
        }
    }
}

/// Wire form of an error
///
/// Native errors do not survive a JSON round trip, so every error crossing
/// the channel is rendered into this discriminated shape and rebuilt as
/// [`KnipviewError::Remote`] on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "__isError")]
    pub is_error: bool,
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<ErrorEnvelope> for KnipviewError {
    fn from(envelope: ErrorEnvelope) -> Self {
        KnipviewError::Remote {
            kind: envelope.name,
            message: envelope.message,
            stack: envelope.stack,
        }
    }
}
