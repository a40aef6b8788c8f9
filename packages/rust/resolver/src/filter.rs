//! Content-type policy deciding which leaves are returned.

use sunbird_shared::{ContentNode, ECML_ARCHIVE_MIME_TYPE, PDF_MIME_TYPE, ResolverConfig};

/// Accepts leaves with the allowed MIME type and a direct URL.
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    allowed_mime_type: String,
    excluded_mime_types: Vec<String>,
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        Self::new(PDF_MIME_TYPE, [ECML_ARCHIVE_MIME_TYPE])
    }
}

impl ArtifactFilter {
    pub fn new<I, S>(allowed_mime_type: impl Into<String>, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_mime_type: allowed_mime_type.into(),
            excluded_mime_types: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.allowed_mime_type.clone(),
            config.excluded_mime_types.iter().cloned(),
        )
    }

    /// Whether `node` should become a [`sunbird_shared::LeafItem`].
    pub fn qualifies(&self, node: &ContentNode) -> bool {
        let Some(mime) = node.mime_type.as_deref() else {
            return false;
        };
        if self.excluded_mime_types.iter().any(|m| m == mime) {
            return false;
        }
        mime == self.allowed_mime_type && node.direct_url().is_some()
    }
}
