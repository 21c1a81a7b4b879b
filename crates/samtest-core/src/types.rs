//! Core types shared by the scanner, registry, matcher and runner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Environment variables a test needs the emulator to expose to its function.
///
/// Ordered so two overrides compare equal by value regardless of how they
/// were assembled.
pub type EnvVars = BTreeMap<String, String>;

/// Contents of the environment-override file: deployed id to variables.
pub type EnvOverrides = BTreeMap<String, EnvVars>;

/// A function resource found in the deployed template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Short name used to register tests (`reverse`).
    pub logical_name: String,
    /// Generated resource identifier (`reverseA1B2C3D4`).
    pub deployed_id: String,
}

impl FunctionDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(logical_name: impl Into<String>, deployed_id: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            deployed_id: deployed_id.into(),
        }
    }
}

impl std::fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.logical_name, self.deployed_id)
    }
}

/// Synthetic API-gateway style event sent to a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestEnvelope(Map<String, Value>);

impl RequestEnvelope {
    /// The fixed request skeleton for a logical function.
    #[must_use]
    pub fn skeleton(logical_name: &str) -> Self {
        let mut map = Map::new();
        map.insert(
            "body".to_string(),
            Value::String(format!("{{\"message\": \"{logical_name}\"}}")),
        );
        map.insert("resource".to_string(), Value::String("/{proxy+}".to_string()));
        map.insert("path".to_string(), Value::String(format!("/{logical_name}")));
        map.insert("httpMethod".to_string(), Value::String("GET".to_string()));
        map.insert("isBase64Encoded".to_string(), Value::Bool(false));
        Self(map)
    }

    /// Overlays payload overrides on top of the current fields.
    ///
    /// Overrides replace whole top-level values; nested objects are not merged.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &Map<String, Value>) -> Self {
        for (key, value) in overrides {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the fields as a JSON map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Serializes the envelope as pretty JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.0)
    }
}

/// Decoded response returned by a function invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    /// HTTP-style status code reported by the handler.
    pub status_code: u16,
    /// Response body, JSON-decoded when the handler returned a JSON string.
    pub body: Value,
    /// Raw output as received from the emulator.
    pub raw: String,
}

impl ResponseEnvelope {
    /// Creates a response envelope.
    #[must_use]
    pub fn new(status_code: u16, body: Value, raw: impl Into<String>) -> Self {
        Self {
            status_code,
            body,
            raw: raw.into(),
        }
    }
}
