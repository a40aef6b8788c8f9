//! Consumer-facing entry points shared by the CLI and the MCP server.

use std::sync::Arc;

use tracing::{info, instrument};

use sunbird_resolver::{
    GraphResolver, HttpFetcher, ProgressReporter, Resolution, build_client,
};
use sunbird_search::{SearchClient, SearchParams, SearchPayload};
use sunbird_shared::{AppConfig, ResolverConfig, Result};

use crate::payload::{ArtifactsPayload, UrlsPayload};

/// Resolution and search over one configured upstream.
///
/// The service itself is stateless between calls; each resolution gets its
/// own traversal state, so one instance can serve concurrent requests.
pub struct ContentService {
    resolver: GraphResolver<HttpFetcher>,
    search: SearchClient,
}

impl ContentService {
    /// Build a service with one shared HTTP client.
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config.upstream)?;
        let fetcher = HttpFetcher::with_client(client.clone(), config.upstream.clone());

        info!(
            base_url = %config.upstream.base_url,
            deployment = %config.deployment,
            "content service ready"
        );

        Ok(Self {
            resolver: GraphResolver::new(fetcher, ResolverConfig::from(config)),
            search: SearchClient::new(client, config.upstream.clone(), config.search.clone()),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.resolver = self.resolver.with_progress(progress);
        self
    }

    /// Full resolution report, including per-node diagnostics.
    pub async fn resolve(&self, content_id: &str, concurrency: Option<usize>) -> Result<Resolution> {
        self.resolver.resolve_id(content_id, concurrency).await
    }

    /// Artifacts reachable from `content_id`.
    #[instrument(skip(self))]
    pub async fn read_artifacts(
        &self,
        content_id: &str,
        concurrency: Option<usize>,
    ) -> Result<ArtifactsPayload> {
        let resolution = self.resolve(content_id, concurrency).await?;
        Ok(ArtifactsPayload::new(resolution.items))
    }

    /// Direct URLs of the artifacts reachable from `content_id`.
    pub async fn artifact_urls(
        &self,
        content_id: &str,
        concurrency: Option<usize>,
    ) -> Result<UrlsPayload> {
        Ok(self.read_artifacts(content_id, concurrency).await?.into())
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchPayload> {
        self.search.search(params).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use sunbird_shared::SunbirdError;

    use super::*;
    use crate::payload::MSG_NO_ARTIFACTS;

    fn config_for(server: &wiremock::MockServer) -> AppConfig {
        let mut config = AppConfig::default();
        config.upstream.base_url = server.uri();
        config
    }

    async fn mount_content(server: &wiremock::MockServer, id: &str, content: serde_json::Value) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/api/content/v1/read/{id}")))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": {"content": content}})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_textbook(server: &wiremock::MockServer) {
        mount_content(
            server,
            "do_100",
            serde_json::json!({
                "identifier": "do_100",
                "mimeType": "application/vnd.ekstep.content-collection",
                "leafNodes": ["do_101", "do_102"]
            }),
        )
        .await;
        mount_content(
            server,
            "do_101",
            serde_json::json!({
                "identifier": "do_101",
                "mimeType": "application/vnd.ekstep.content-collection",
                "leafNodes": ["do_103", "do_102"]
            }),
        )
        .await;
        for id in ["do_102", "do_103"] {
            mount_content(
                server,
                id,
                serde_json::json!({
                    "identifier": id,
                    "name": format!("Chapter {id}"),
                    "mimeType": "application/pdf",
                    "se_subjects": "Science",
                    "streamingUrl": format!("https://cdn.example.org/{id}.pdf")
                }),
            )
            .await;
        }
    }

    #[tokio::test]
    async fn test_read_artifacts_over_http() {
        let server = wiremock::MockServer::start().await;
        mount_textbook(&server).await;

        let service = ContentService::new(&config_for(&server)).unwrap();
        let payload = service.read_artifacts("do_100", Some(2)).await.unwrap();

        assert_eq!(payload.count, 2);
        let ids: HashSet<_> = payload.artifacts.iter().map(|a| a.identifier.as_str()).collect();
        assert_eq!(ids, HashSet::from(["do_102", "do_103"]));
        assert!(payload.artifacts.iter().all(|a| a.subjects == vec!["Science"]));
    }

    #[tokio::test]
    async fn test_artifact_urls_over_http() {
        let server = wiremock::MockServer::start().await;
        mount_textbook(&server).await;

        let service = ContentService::new(&config_for(&server)).unwrap();
        let payload = service.artifact_urls("do_100", None).await.unwrap();

        let urls: HashSet<_> = payload.artifact_urls.iter().map(String::as_str).collect();
        assert_eq!(
            urls,
            HashSet::from([
                "https://cdn.example.org/do_102.pdf",
                "https://cdn.example.org/do_103.pdf"
            ])
        );
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/api/content/v1/read/do_404"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = ContentService::new(&config_for(&server)).unwrap();
        let err = service.read_artifacts("do_404", None).await.unwrap_err();
        assert!(matches!(err, SunbirdError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_id_makes_no_request() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let service = ContentService::new(&config_for(&server)).unwrap();
        let err = service.read_artifacts("book-42", None).await.unwrap_err();
        assert!(matches!(err, SunbirdError::InvalidFormat { .. }));
    }

    #[tokio::test]
    async fn test_collection_without_artifacts() {
        let server = wiremock::MockServer::start().await;
        mount_content(
            &server,
            "do_5",
            serde_json::json!({
                "identifier": "do_5",
                "mimeType": "application/vnd.ekstep.content-collection",
                "leafNodes": []
            }),
        )
        .await;

        let service = ContentService::new(&config_for(&server)).unwrap();
        let payload = service.read_artifacts("do_5", None).await.unwrap();
        assert_eq!(payload.count, 0);
        assert_eq!(payload.message, MSG_NO_ARTIFACTS);
    }

    #[tokio::test]
    async fn test_search_uses_deployment_settings() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/content/v1/search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"result": {"count": 1, "content": [{"identifier": "do_1", "name": "Atlas"}]}}),
            ))
            .mount(&server)
            .await;

        let service = ContentService::new(&config_for(&server)).unwrap();
        let payload = service.search(&SearchParams::default()).await.unwrap();
        assert_eq!(payload.count, 1);
        assert_eq!(payload.books[0].name, "Atlas");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.upstream.base_url = "::nope".into();
        assert!(matches!(
            ContentService::new(&config),
            Err(SunbirdError::Config { .. })
        ));
    }
}
