use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Inbound body accepted by `POST` on the relay route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub inputs: String,
}

impl GenerateRequest {
    /// Picks the prompt out of an already-parsed JSON document.
    ///
    /// Returns `None` when the document is not an object, or when `inputs`
    /// is absent, not a string, or empty. Unknown fields are ignored.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        value
            .as_object()?
            .get("inputs")?
            .as_str()
            .filter(|inputs| !inputs.is_empty())
            .map(|inputs| Self {
                inputs: inputs.to_string(),
            })
    }
}
