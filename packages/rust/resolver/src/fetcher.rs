//! Single-node metadata reads against the upstream content service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sunbird_shared::{
    ContentNode, MAX_DETAIL_LEN, Result, SunbirdError, UpstreamConfig, truncate_detail,
};
use tracing::debug;

use crate::validate::ContentId;

/// User-Agent string for upstream requests.
const USER_AGENT: &str = concat!("sunbird-tools/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Why a single node could not be read. Never fatal to a traversal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The upstream has no record for this identifier.
    #[error("content not found")]
    NotFound,

    /// Any other non-success status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Connection, TLS, or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 200 response whose body is not a read envelope.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The fetch exceeded its wall-clock budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Convert into the request-level error used when the *root* fails.
    pub fn into_request_error(self, content_id: &str) -> SunbirdError {
        match self {
            Self::NotFound => SunbirdError::NotFound(content_id.to_string()),
            Self::Status { status, detail } => SunbirdError::Upstream { status, detail },
            Self::Transport(msg) => SunbirdError::Network(format!("{content_id}: {msg}")),
            Self::Timeout(after) => {
                SunbirdError::Network(format!("{content_id}: timed out after {after:?}"))
            }
            Self::Decode(msg) => SunbirdError::parse(format!("{content_id}: {msg}")),
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataFetcher
// ---------------------------------------------------------------------------

/// Reads one content record. Implementations perform no retries and must
/// not touch any traversal state.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, id: &ContentId) -> std::result::Result<ContentNode, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ReadEnvelope {
    #[serde(default)]
    result: Option<ReadResult>,
}

#[derive(Debug, Deserialize)]
struct ReadResult {
    #[serde(default)]
    content: Option<ContentNode>,
}

/// Build a reqwest client with the upstream's timeout and our User-Agent.
pub fn build_client(upstream: &UpstreamConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(upstream.timeout())
        .build()
        .map_err(|e| SunbirdError::Network(format!("failed to build HTTP client: {e}")))
}

/// [`MetadataFetcher`] backed by `GET <base><read_endpoint>/{id}`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    upstream: UpstreamConfig,
}

impl HttpFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(upstream: UpstreamConfig) -> Result<Self> {
        let client = build_client(&upstream)?;
        Ok(Self { client, upstream })
    }

    /// Create a fetcher sharing an existing client's connection pool.
    pub fn with_client(client: Client, upstream: UpstreamConfig) -> Self {
        Self { client, upstream }
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn fetch(&self, id: &ContentId) -> std::result::Result<ContentNode, FetchError> {
        let url = self.upstream.read_url(id.as_str());
        debug!(%url, "fetching content metadata");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            truncate_detail(&mut detail, MAX_DETAIL_LEN);
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("body read failed: {e}")))?;

        let envelope: ReadEnvelope =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let mut node = envelope
            .result
            .and_then(|r| r.content)
            .ok_or_else(|| FetchError::Decode("response has no result.content".into()))?;

        if node.identifier.is_empty() {
            node.identifier = id.as_str().to_string();
        }
        Ok(node)
    }
}
