//! Search parameter checks against the configured allow-lists.
//!
//! Every problem is collected so the caller sees the full list at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sunbird_shared::{Result, SearchSettings, SunbirdError};

/// Field used for ordering when the caller gives none.
pub const DEFAULT_SORT_FIELD: &str = "lastPublishedOn";

/// A filter value: one string or a list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn values(&self) -> &[String] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

/// Caller-supplied search parameters, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, FilterValue>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    /// Field name to `asc` or `desc`.
    #[serde(default)]
    pub sort_by: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// The `request` object sent to the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub filters: BTreeMap<String, Vec<String>>,
    pub query: String,
    pub limit: u32,
    pub offset: u32,
    pub sort_by: BTreeMap<String, String>,
    pub fields: Vec<String>,
}

/// Validate `params`, producing the upstream request or a
/// [`SunbirdError::Validation`] listing every problem.
pub fn validate_params(params: &SearchParams, settings: &SearchSettings) -> Result<SearchRequest> {
    let mut errors = Vec::new();

    let limit = match params.limit {
        None => settings.default_limit,
        Some(l) if (1..=i64::from(settings.max_limit)).contains(&l) => l as u32,
        Some(_) => {
            errors.push(format!(
                "Limit must be an integer between 1 and {}",
                settings.max_limit
            ));
            settings.default_limit
        }
    };

    let offset = match params.offset {
        None => 0,
        Some(o) => match u32::try_from(o) {
            Ok(o) => o,
            Err(_) => {
                errors.push("Offset must be a non-negative integer".to_string());
                0
            }
        },
    };

    if settings.enable_validation {
        errors.extend(check_filters(&params.filters, settings));
        errors.extend(
            params
                .fields
                .iter()
                .filter(|f| !settings.fields.contains(f))
                .map(|f| format!("Invalid field: {f}")),
        );
    }

    for (field, direction) in &params.sort_by {
        if !matches!(direction.to_ascii_lowercase().as_str(), "asc" | "desc") {
            errors.push(format!(
                "Invalid sort direction '{direction}' for '{field}'. Must be 'asc' or 'desc'"
            ));
        }
    }

    if !errors.is_empty() {
        return Err(SunbirdError::validation_with("Invalid search parameters", errors));
    }

    let sort_by = if params.sort_by.is_empty() {
        BTreeMap::from([(DEFAULT_SORT_FIELD.to_string(), "desc".to_string())])
    } else {
        params
            .sort_by
            .iter()
            .map(|(k, v)| (k.clone(), v.to_ascii_lowercase()))
            .collect()
    };

    let fields = if params.fields.is_empty() {
        settings.fields.clone()
    } else {
        params.fields.clone()
    };

    Ok(SearchRequest {
        filters: params
            .filters
            .iter()
            .map(|(k, v)| (k.clone(), v.values().to_vec()))
            .collect(),
        query: params.query.as_deref().map(str::trim).unwrap_or_default().to_string(),
        limit,
        offset,
        sort_by,
        fields,
    })
}

fn check_filters(
    filters: &BTreeMap<String, FilterValue>,
    settings: &SearchSettings,
) -> Vec<String> {
    let mut errors = Vec::new();
    for (key, value) in filters {
        let Some(allowed) = settings.filters.get(key) else {
            errors.push(format!("Invalid filter key: {key}"));
            continue;
        };
        for v in value.values() {
            if !allowed.contains(v) {
                errors.push(format!(
                    "Invalid value '{v}' for filter '{key}'. Must be one of: {}",
                    allowed.join(", ")
                ));
            }
        }
    }
    errors
}
