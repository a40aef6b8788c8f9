//! Flat content search against the upstream search endpoint.
//!
//! Parameters are checked against the configured allow-lists before any
//! request is sent; results are reduced to short book summaries.

pub mod validation;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sunbird_shared::{
    ContentNode, MAX_DETAIL_LEN, Result, SearchSettings, SunbirdError, UpstreamConfig,
    truncate_detail,
};
use tracing::{debug, info, instrument, warn};

pub use validation::{FilterValue, SearchParams, SearchRequest, validate_params};

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// One search hit, reduced to the fields callers browse by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub name: String,
    pub identifier: String,
    pub se_subjects: Vec<String>,
    pub se_mediums: Vec<String>,
    pub se_boards: Vec<String>,
    #[serde(rename = "se_gradeLevels")]
    pub se_grade_levels: Vec<String>,
}

impl From<ContentNode> for BookSummary {
    fn from(node: ContentNode) -> Self {
        Self {
            name: node.name.unwrap_or_default(),
            identifier: node.identifier,
            se_subjects: node.se_subjects,
            se_mediums: node.se_mediums,
            se_boards: node.se_boards,
            se_grade_levels: node.se_grade_levels,
        }
    }
}

/// Search results: the current page and the upstream's total hit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub books: Vec<BookSummary>,
    pub count: u64,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    request: &'a SearchRequest,
}

#[derive(Debug, Default, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    content: Vec<ContentNode>,
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Client for `POST <base><search_endpoint>`.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    upstream: UpstreamConfig,
    settings: SearchSettings,
}

impl SearchClient {
    pub fn new(client: Client, upstream: UpstreamConfig, settings: SearchSettings) -> Self {
        Self {
            client,
            upstream,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Validate `params` and run the search.
    #[instrument(skip_all, fields(query = params.query.as_deref().unwrap_or("")))]
    pub async fn search(&self, params: &SearchParams) -> Result<SearchPayload> {
        let request = match validate_params(params, &self.settings) {
            Ok(request) => request,
            Err(e) => {
                warn!(problems = e.details().len(), "search parameters rejected");
                return Err(e);
            }
        };
        self.send(&request).await
    }

    /// Send an already validated request.
    pub async fn send(&self, request: &SearchRequest) -> Result<SearchPayload> {
        let url = self.upstream.search_url();
        debug!(%url, limit = request.limit, offset = request.offset, "sending search request");

        let response = self
            .client
            .post(&url)
            .json(&SearchBody { request })
            .send()
            .await
            .map_err(|e| SunbirdError::Network(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            truncate_detail(&mut detail, MAX_DETAIL_LEN);
            return Err(SunbirdError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SunbirdError::Network(format!("search body read failed: {e}")))?;
        let envelope: SearchEnvelope = serde_json::from_slice(&body)
            .map_err(|e| SunbirdError::parse(format!("invalid search response: {e}")))?;

        let payload = SearchPayload {
            count: envelope.result.count,
            books: envelope
                .result
                .content
                .into_iter()
                .map(BookSummary::from)
                .collect(),
        };

        info!(
            returned = payload.books.len(),
            total = payload.count,
            "search completed"
        );
        Ok(payload)
    }
}
