//! Wire frames and their codec

use knipview_foundation::{KnipviewError, KnipviewResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One protocol message
///
/// ```text
/// request   {"t":"q","i":"req_1","m":"readFile","a":["src/a.ts"]}
/// notify    {"t":"q","m":"ping","a":[]}
/// response  {"t":"s","i":"req_1","r":"..."}
/// failure   {"t":"s","i":"req_1","e":{"__isError":true,"name":"NotFoundError","message":"..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Frame {
    #[serde(rename = "q")]
    Request {
        /// Absent for one-way notifications
        #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(rename = "m")]
        method: String,
        #[serde(rename = "a", default)]
        args: Vec<Value>,
    },
    #[serde(rename = "s")]
    Response {
        #[serde(rename = "i")]
        id: String,
        #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
}

impl Frame {
    pub fn request(id: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Frame::Request {
            id: Some(id.into()),
            method: method.into(),
            args,
        }
    }

    pub fn notification(method: impl Into<String>, args: Vec<Value>) -> Self {
        Frame::Request {
            id: None,
            method: method.into(),
            args,
        }
    }

    /// Reply frame for a served call
    pub fn reply(id: impl Into<String>, outcome: &KnipviewResult<Value>) -> KnipviewResult<Self> {
        let id = id.into();
        Ok(match outcome {
            Ok(value) => Frame::Response {
                id,
                result: Some(value.clone()),
                error: None,
            },
            Err(err) => Frame::Response {
                id,
                result: None,
                error: Some(serde_json::to_value(err.to_envelope())?),
            },
        })
    }
}

/// Turns frames into text and back
pub trait FrameCodec: Send + Sync + 'static {
    fn serialize(&self, frame: &Frame) -> KnipviewResult<String>;
    fn deserialize(&self, text: &str) -> KnipviewResult<Frame>;
}

/// Plain JSON, one document per message
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FrameCodec for JsonCodec {
    fn serialize(&self, frame: &Frame) -> KnipviewResult<String> {
        Ok(serde_json::to_string(frame)?)
    }

    fn deserialize(&self, text: &str) -> KnipviewResult<Frame> {
        serde_json::from_str(text)
            .map_err(|e| KnipviewError::invalid_request(format!("malformed frame: {}", e)))
    }
}
