//! Normalization of a qualifying node into a [`LeafItem`].

use sunbird_shared::{ContentNode, LeafItem};

/// Build the canonical item for `node`. Never fails; missing attributes
/// become empty lists or `None`.
pub fn extract_item(node: &ContentNode) -> LeafItem {
    LeafItem {
        identifier: node.identifier.clone(),
        name: node.name.clone().unwrap_or_default(),
        subjects: prefer(&node.subject, &node.se_subjects),
        grade_levels: prefer(&node.grade_level, &node.se_grade_levels),
        mediums: prefer(&node.medium, &node.se_mediums),
        boards: prefer(&node.board, &node.se_boards),
        artifact_url: node.direct_url().map(str::to_string),
        mime_type: node.mime_type.clone().unwrap_or_default(),
        primary_category: node.primary_category.clone(),
        preview_url: node.preview_url.clone(),
        last_published_on: node.last_published_on.clone(),
    }
}

/// The generic attribute when present, else its `se_` counterpart.
fn prefer(generic: &[String], prefixed: &[String]) -> Vec<String> {
    if generic.is_empty() {
        prefixed.to_vec()
    } else {
        generic.to_vec()
    }
}
