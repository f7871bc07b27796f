//! Serializable rebuild descriptors and the requests carrying them.
//!
//! A descriptor names *how* to recompute a value (a target plus an operation)
//! instead of capturing a closure, so it can cross into a worker that runs
//! in another task, another process, or after a restart.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Reference to a named recomputation.
///
/// `target` selects a handler registered on the worker's
/// [`crate::worker::TargetRegistry`]; `operation` and `args` are passed to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RebuildDescriptor {
    pub target: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub args: serde_json::Value,
}

impl RebuildDescriptor {
    pub fn new(target: impl Into<String>, operation: impl Into<String>) -> Self {
        RebuildDescriptor {
            target: target.into(),
            operation: operation.into(),
            args: serde_json::Value::Null,
        }
    }

    /// Attach structured arguments for the target.
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }
}

/// Unit of work submitted to the job substrate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RebuildRequest {
    pub key: String,
    pub version: Option<String>,
    pub descriptor: RebuildDescriptor,
}

impl RebuildRequest {
    pub fn new(
        key: impl Into<String>,
        version: Option<String>,
        descriptor: RebuildDescriptor,
    ) -> Self {
        RebuildRequest {
            key: key.into(),
            version,
            descriptor,
        }
    }

    /// JSON job payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a job payload produced by [`RebuildRequest::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request = RebuildRequest::new(
            "user:42",
            None,
            RebuildDescriptor::new("users", "load_profile"),
        );

        let wire: serde_json::Value = serde_json::from_slice(&request.encode().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({
                "key": "user:42",
                "version": null,
                "descriptor": { "target": "users", "operation": "load_profile" }
            })
        );
    }

    #[test]
    fn test_request_decode_with_args() {
        let payload = br#"{"key":"k","version":"v3",
            "descriptor":{"target":"t","operation":"op","args":{"id":7}}}"#;
        let request = RebuildRequest::decode(payload).unwrap();

        assert_eq!(request.version.as_deref(), Some("v3"));
        assert_eq!(
            request.descriptor,
            RebuildDescriptor::new("t", "op").with_args(json!({ "id": 7 }))
        );
    }

    #[test]
    fn test_request_decode_garbage() {
        let result = RebuildRequest::decode(b"\x00\x01");
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }
}
