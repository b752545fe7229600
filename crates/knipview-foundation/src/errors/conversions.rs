//! From implementations for standard library types

use super::KnipviewError;

impl From<std::io::Error> for KnipviewError {
    fn from(err: std::io::Error) -> Self {
        KnipviewError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for KnipviewError {
    fn from(err: serde_json::Error) -> Self {
        KnipviewError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
