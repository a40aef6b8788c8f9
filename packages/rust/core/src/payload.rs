//! JSON shapes returned to tool callers.

use serde::{Deserialize, Serialize};
use sunbird_shared::{LeafItem, Result, SunbirdError};

/// Message for a resolution that produced at least one artifact.
pub const MSG_ARTIFACTS_FOUND: &str = "Successfully retrieved artifacts for non-ECML content";

/// Message for a root that resolved but had no qualifying leaves.
pub const MSG_NO_ARTIFACTS: &str = "Content resolved but contains no downloadable artifacts";

/// Leaf items for one root identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsPayload {
    pub artifacts: Vec<LeafItem>,
    pub count: usize,
    pub message: String,
}

impl ArtifactsPayload {
    pub fn new(artifacts: Vec<LeafItem>) -> Self {
        Self {
            count: artifacts.len(),
            message: message_for(artifacts.len()).to_string(),
            artifacts,
        }
    }
}

/// Only the direct URLs of the artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlsPayload {
    pub artifact_urls: Vec<String>,
    pub count: usize,
    pub message: String,
}

impl From<ArtifactsPayload> for UrlsPayload {
    fn from(payload: ArtifactsPayload) -> Self {
        let artifact_urls: Vec<String> = payload
            .artifacts
            .into_iter()
            .filter_map(|item| item.artifact_url)
            .collect();
        Self {
            count: artifact_urls.len(),
            message: payload.message,
            artifact_urls,
        }
    }
}

fn message_for(count: usize) -> &'static str {
    if count == 0 {
        MSG_NO_ARTIFACTS
    } else {
        MSG_ARTIFACTS_FOUND
    }
}

/// `{ "error": ..., "details": [...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl From<&SunbirdError> for ErrorPayload {
    fn from(err: &SunbirdError) -> Self {
        Self {
            error: err.to_string(),
            details: err.details().to_vec(),
        }
    }
}

/// Either a success payload or an error object, serialized flat.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolResponse<T> {
    Ok(T),
    Err(ErrorPayload),
}

impl<T: Serialize> ToolResponse<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Err(ErrorPayload::from(&e)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Pretty JSON. Serialization of these types cannot fail in practice; if
    /// it does, an error object is returned instead.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("failed to serialize response: {e}") })
                .to_string()
        })
    }
}
