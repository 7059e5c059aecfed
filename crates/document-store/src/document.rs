use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned identifier of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new random document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a document ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ensures a document body is a JSON object, the only shape the store accepts.
pub(crate) fn require_object(
    kind: &str,
    body: serde_json::Value,
) -> crate::Result<serde_json::Map<String, serde_json::Value>> {
    match body {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(crate::StoreError::InvalidDocument {
            kind: kind.to_string(),
            reason: format!("expected a JSON object, got {other}"),
        }),
    }
}
