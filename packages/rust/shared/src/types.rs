//! Core domain types: upstream content records and extracted leaf items.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// ContentNode
// ---------------------------------------------------------------------------

/// The upstream metadata record for a single content identifier.
///
/// Deserialization is deliberately lenient: every field is optional, list
/// attributes accept either a scalar or an array, and values of an unexpected
/// JSON type are treated as absent rather than failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentNode {
    #[serde(default, deserialize_with = "lenient_string_or_empty")]
    pub identifier: String,

    #[serde(rename = "mimeType", default, deserialize_with = "lenient_string")]
    pub mime_type: Option<String>,

    /// Child identifiers, present only on collections.
    #[serde(rename = "leafNodes", default, deserialize_with = "lenient_list")]
    pub leaf_nodes: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(rename = "primaryCategory", default, deserialize_with = "lenient_string")]
    pub primary_category: Option<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub subject: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub se_subjects: Vec<String>,

    #[serde(rename = "gradeLevel", default, deserialize_with = "lenient_list")]
    pub grade_level: Vec<String>,
    #[serde(rename = "se_gradeLevels", default, deserialize_with = "lenient_list")]
    pub se_grade_levels: Vec<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub medium: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub se_mediums: Vec<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub board: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub se_boards: Vec<String>,

    #[serde(rename = "artifactUrl", default, deserialize_with = "lenient_string")]
    pub artifact_url: Option<String>,

    #[serde(rename = "streamingUrl", default, deserialize_with = "lenient_string")]
    pub streaming_url: Option<String>,

    #[serde(rename = "previewUrl", default, deserialize_with = "lenient_string")]
    pub preview_url: Option<String>,

    #[serde(rename = "lastPublishedOn", default, deserialize_with = "lenient_string")]
    pub last_published_on: Option<String>,
}

impl ContentNode {
    /// Whether this node groups other nodes rather than being an artifact.
    pub fn is_collection(&self, collection_mime_type: &str) -> bool {
        self.mime_type.as_deref() == Some(collection_mime_type) || !self.leaf_nodes.is_empty()
    }

    /// The direct content URL: `streamingUrl` when set, otherwise `artifactUrl`.
    pub fn direct_url(&self) -> Option<&str> {
        non_empty(self.streaming_url.as_deref()).or_else(|| non_empty(self.artifact_url.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// LeafItem
// ---------------------------------------------------------------------------

/// Canonical representation of a terminal node that passed the artifact filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafItem {
    pub identifier: String,
    pub name: String,
    pub subjects: Vec<String>,
    pub grade_levels: Vec<String>,
    pub mediums: Vec<String>,
    pub boards: Vec<String>,
    /// Direct download URL for the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_published_on: Option<String>,
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_string_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// Accepts `"x"`, `["x", "y"]`, `null`, or anything else (treated as empty).
/// Non-string array members and blank strings are dropped.
fn lenient_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = match Value::deserialize(deserializer)? {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(list.into_iter().filter(|s| !s.trim().is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_node_tolerates_missing_fields() {
        let node: ContentNode = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(node, ContentNode::default());
        assert!(node.direct_url().is_none());
    }

    #[test]
    fn content_node_coerces_scalars_and_ignores_bad_types() {
        let json = r#"{
            "identifier": "do_1",
            "mimeType": "application/pdf",
            "board": "CBSE",
            "se_subjects": ["Physics", 7, null, ""],
            "gradeLevel": 12,
            "name": {"en": "nested"},
            "streamingUrl": "https://cdn.example.org/a.pdf"
        }"#;
        let node: ContentNode = serde_json::from_str(json).expect("deserialize");
        assert_eq!(node.board, vec!["CBSE"]);
        assert_eq!(node.se_subjects, vec!["Physics"]);
        assert!(node.grade_level.is_empty());
        assert!(node.name.is_none());
        assert_eq!(node.direct_url(), Some("https://cdn.example.org/a.pdf"));
    }

    #[test]
    fn collection_detection() {
        let collection_mime = "application/vnd.ekstep.content-collection";

        let by_mime = ContentNode {
            mime_type: Some(collection_mime.into()),
            ..Default::default()
        };
        assert!(by_mime.is_collection(collection_mime));

        let by_children = ContentNode {
            mime_type: Some("application/pdf".into()),
            leaf_nodes: vec!["do_2".into()],
            ..Default::default()
        };
        assert!(by_children.is_collection(collection_mime));

        let leaf = ContentNode {
            mime_type: Some("application/pdf".into()),
            ..Default::default()
        };
        assert!(!leaf.is_collection(collection_mime));
    }

    #[test]
    fn direct_url_falls_back_to_artifact_url() {
        let node = ContentNode {
            streaming_url: Some("  ".into()),
            artifact_url: Some("https://cdn.example.org/b.pdf".into()),
            ..Default::default()
        };
        assert_eq!(node.direct_url(), Some("https://cdn.example.org/b.pdf"));
    }

    #[test]
    fn leaf_item_serializes_camel_case() {
        let item = LeafItem {
            identifier: "do_1".into(),
            name: "Chapter 1".into(),
            subjects: vec!["Physics".into()],
            grade_levels: vec!["Class 12".into()],
            mediums: vec![],
            boards: vec!["CBSE".into()],
            artifact_url: Some("https://cdn.example.org/a.pdf".into()),
            mime_type: "application/pdf".into(),
            primary_category: None,
            preview_url: None,
            last_published_on: None,
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["gradeLevels"][0], "Class 12");
        assert_eq!(json["artifactUrl"], "https://cdn.example.org/a.pdf");
        assert!(json.get("previewUrl").is_none());
        assert_eq!(json["mediums"], serde_json::json!([]));
    }
}
