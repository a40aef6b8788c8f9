//! Bounded-concurrency content graph resolver.
//!
//! Starting from a root identifier, the resolver fetches each node's
//! metadata, fans out over the children of collection nodes, and collects
//! every leaf that passes the [`ArtifactFilter`]. All fetches of one
//! resolution share a single admission gate, so no more than the configured
//! number of requests are in flight at once regardless of graph depth.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use sunbird_shared::{ContentNode, LeafItem, ResolverConfig, Result, SunbirdError};

use crate::extract::extract_item;
use crate::fetcher::{FetchError, MetadataFetcher};
use crate::filter::ArtifactFilter;
use crate::validate::{ContentId, ContentIdValidator};
use crate::visited::{Claim, VisitedSet};

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// What went wrong at one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The fetch failed, including not-found and timeouts.
    Fetch(FetchError),
    /// The node was discovered after the node cap was reached.
    NodeCapReached { cap: usize },
    /// A child task panicked or was cancelled.
    TaskFailed(String),
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::NodeCapReached { cap } => write!(f, "node cap of {cap} reached"),
            Self::TaskFailed(msg) => write!(f, "task failed: {msg}"),
        }
    }
}

/// A non-fatal problem recorded during a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub content_id: ContentId,
    pub kind: DiagnosticKind,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of resolving one root identifier.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub root: ContentId,
    /// Qualifying leaves, one per distinct identifier, in no particular order.
    pub items: Vec<LeafItem>,
    pub diagnostics: Vec<Diagnostic>,
    /// Distinct identifiers claimed (fetched or attempted).
    pub nodes_visited: usize,
    /// Whether the root's own metadata was read successfully.
    pub root_resolved: bool,
    pub elapsed: Duration,
}

impl Resolution {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The diagnostic recorded against the root, if its fetch failed.
    pub fn root_error(&self) -> Option<&DiagnosticKind> {
        self.diagnostics
            .iter()
            .find(|d| d.content_id == self.root)
            .map(|d| &d.kind)
    }

    /// Turn a failed root into a request-level error.
    pub fn into_result(self) -> Result<Self> {
        if self.root_resolved {
            return Ok(self);
        }
        let root = self.root.as_str();
        Err(match self.root_error().cloned() {
            Some(DiagnosticKind::Fetch(e)) => e.into_request_error(root),
            Some(DiagnosticKind::NodeCapReached { cap }) => {
                SunbirdError::config(format!("max_nodes ({cap}) leaves no room for the root"))
            }
            Some(DiagnosticKind::TaskFailed(msg)) => {
                SunbirdError::Network(format!("{root}: {msg}"))
            }
            None => SunbirdError::NotFound(root.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callbacks, invoked from traversal tasks.
pub trait ProgressReporter: Send + Sync {
    /// Called after each successful metadata fetch.
    fn node_fetched(&self, content_id: &str, fetched: usize);
    /// Called when a leaf qualifies.
    fn artifact_found(&self, item: &LeafItem, found: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn node_fetched(&self, _content_id: &str, _fetched: usize) {}
    fn artifact_found(&self, _item: &LeafItem, _found: usize) {}
}

// ---------------------------------------------------------------------------
// GraphResolver
// ---------------------------------------------------------------------------

/// Resolves content identifiers into flat lists of downloadable items.
///
/// The resolver itself holds no per-request state: every call to
/// [`resolve`](Self::resolve) builds its own visited set, accumulator and
/// admission gate, so concurrent calls never interfere.
pub struct GraphResolver<F> {
    fetcher: Arc<F>,
    config: ResolverConfig,
    filter: ArtifactFilter,
    validator: ContentIdValidator,
    progress: Arc<dyn ProgressReporter>,
}

impl<F: MetadataFetcher + 'static> GraphResolver<F> {
    pub fn new(fetcher: F, config: ResolverConfig) -> Self {
        Self::from_shared(Arc::new(fetcher), config)
    }

    pub fn from_shared(fetcher: Arc<F>, config: ResolverConfig) -> Self {
        Self {
            fetcher,
            filter: ArtifactFilter::from_config(&config),
            validator: ContentIdValidator::from_config(&config),
            config,
            progress: Arc::new(SilentProgress),
        }
    }

    /// Replace the artifact filter built from the config.
    pub fn with_filter(mut self, filter: ArtifactFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn validator(&self) -> ContentIdValidator {
        self.validator
    }

    /// Validate `raw` and resolve it.
    ///
    /// Fails when the identifier is malformed (no fetch is attempted) or
    /// when the root itself cannot be read. Failures below the root are
    /// only reported as diagnostics.
    pub async fn resolve_id(
        &self,
        raw: &str,
        concurrency_limit: Option<usize>,
    ) -> Result<Resolution> {
        let root = self.validator.validate(raw)?;
        let limit = concurrency_limit.unwrap_or(self.config.concurrency);
        self.resolve(&root, limit).await.into_result()
    }

    /// Traverse the graph below `root` with at most `concurrency_limit`
    /// fetches in flight. Always drains the whole graph before returning.
    #[instrument(skip_all, fields(root = %root, concurrency = concurrency_limit))]
    pub async fn resolve(&self, root: &ContentId, concurrency_limit: usize) -> Resolution {
        let start = Instant::now();
        let traversal = Arc::new(Traversal {
            fetcher: Arc::clone(&self.fetcher),
            gate: Semaphore::new(concurrency_limit.max(1)),
            fetch_timeout: self.config.fetch_timeout,
            collection_mime_type: self.config.collection_mime_type.clone(),
            filter: self.filter.clone(),
            visited: VisitedSet::with_cap(self.config.max_nodes),
            cap: self.config.max_nodes,
            items: Mutex::default(),
            diagnostics: Mutex::default(),
            fetched: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            root: root.clone(),
            root_resolved: AtomicBool::new(false),
            progress: Arc::clone(&self.progress),
        });

        debug!("starting resolution");

        match traversal.visited.claim(root) {
            Claim::Claimed => Arc::clone(&traversal).visit(root.clone()).await,
            Claim::CapReached => traversal.record(
                root.clone(),
                DiagnosticKind::NodeCapReached {
                    cap: self.config.max_nodes.unwrap_or_default(),
                },
            ),
            Claim::AlreadySeen => {}
        }

        let resolution = Resolution {
            root: root.clone(),
            items: std::mem::take(&mut *lock(&traversal.items)),
            diagnostics: std::mem::take(&mut *lock(&traversal.diagnostics)),
            nodes_visited: traversal.visited.len(),
            root_resolved: traversal.root_resolved.load(Ordering::Acquire),
            elapsed: start.elapsed(),
        };

        info!(
            items = resolution.items.len(),
            nodes_fetched = traversal.fetched.load(Ordering::Relaxed),
            nodes_skipped = traversal.skipped.load(Ordering::Relaxed),
            errors = resolution.diagnostics.len(),
            duration_ms = resolution.elapsed.as_millis(),
            "resolution completed"
        );

        resolution
    }
}

// ---------------------------------------------------------------------------
// Traversal (state for one resolve call)
// ---------------------------------------------------------------------------

type VisitFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Traversal<F> {
    fetcher: Arc<F>,
    gate: Semaphore,
    fetch_timeout: Duration,
    collection_mime_type: String,
    filter: ArtifactFilter,
    visited: VisitedSet,
    cap: Option<usize>,
    items: Mutex<Vec<LeafItem>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    fetched: AtomicUsize,
    skipped: AtomicUsize,
    root: ContentId,
    root_resolved: AtomicBool,
    progress: Arc<dyn ProgressReporter>,
}

impl<F: MetadataFetcher + 'static> Traversal<F> {
    /// Process an already-claimed node and, for collections, its subtree.
    fn visit(self: Arc<Self>, id: ContentId) -> VisitFuture {
        Box::pin(async move {
            let node = match self.fetch(&id).await {
                Ok(node) => node,
                Err(e) => {
                    warn!(content_id = %id, error = %e, "failed to fetch content");
                    self.record(id, DiagnosticKind::Fetch(e));
                    return;
                }
            };

            if id == self.root {
                self.root_resolved.store(true, Ordering::Release);
            }
            let fetched = self.fetched.fetch_add(1, Ordering::Relaxed) + 1;
            self.progress.node_fetched(id.as_str(), fetched);

            if node.is_collection(&self.collection_mime_type) {
                self.expand(id, node).await;
            } else if self.filter.qualifies(&node) {
                let item = extract_item(&node);
                self.progress.artifact_found(&item, self.push_item(item.clone()));
            } else {
                debug!(
                    content_id = %id,
                    mime_type = node.mime_type.as_deref().unwrap_or(""),
                    "leaf does not qualify"
                );
            }
        })
    }

    /// Claim each child, run the claimed ones concurrently, and wait for all.
    async fn expand(self: &Arc<Self>, id: ContentId, node: ContentNode) {
        let mut children = JoinSet::new();

        for child in node.leaf_nodes {
            let child = ContentId::from_upstream(child);
            match self.visited.claim(&child) {
                Claim::Claimed => {
                    children.spawn(Arc::clone(self).visit(child));
                }
                Claim::AlreadySeen => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Claim::CapReached => {
                    let cap = self.cap.unwrap_or_default();
                    warn!(content_id = %child, cap, "node cap reached, skipping");
                    self.record(child, DiagnosticKind::NodeCapReached { cap });
                }
            }
        }

        debug!(content_id = %id, children = children.len(), "expanding collection");

        while let Some(joined) = children.join_next().await {
            if let Err(e) = joined {
                warn!(parent = %id, error = %e, "child task failed");
                self.record(id.clone(), DiagnosticKind::TaskFailed(e.to_string()));
            }
        }
    }

    /// One fetch under the admission gate. The permit is released before
    /// returning, so it is never held while children run.
    async fn fetch(&self, id: &ContentId) -> std::result::Result<ContentNode, FetchError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| FetchError::Transport("admission gate closed".into()))?;

        tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(id))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))?
    }

    fn push_item(&self, item: LeafItem) -> usize {
        let mut items = lock(&self.items);
        items.push(item);
        items.len()
    }

    fn record(&self, content_id: ContentId, kind: DiagnosticKind) {
        lock(&self.diagnostics).push(Diagnostic { content_id, kind });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;
    use sunbird_shared::{COLLECTION_MIME_TYPE, ECML_ARCHIVE_MIME_TYPE, PDF_MIME_TYPE};

    use super::*;

    /// In-memory graph that counts calls and tracks peak concurrency.
    #[derive(Default)]
    struct FakeFetcher {
        nodes: HashMap<String, ContentNode>,
        failing: HashSet<String>,
        slow: HashSet<String>,
        delay: Duration,
        calls: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetcher {
        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn collection(mut self, id: &str, children: &[&str]) -> Self {
            self.nodes.insert(
                id.into(),
                ContentNode {
                    identifier: id.into(),
                    mime_type: Some(COLLECTION_MIME_TYPE.into()),
                    name: Some(format!("Collection {id}")),
                    leaf_nodes: children.iter().map(|c| (*c).to_string()).collect(),
                    ..Default::default()
                },
            );
            self
        }

        fn pdf(mut self, id: &str) -> Self {
            self.nodes.insert(
                id.into(),
                ContentNode {
                    identifier: id.into(),
                    mime_type: Some(PDF_MIME_TYPE.into()),
                    name: Some(format!("Leaf {id}")),
                    se_subjects: vec!["Physics".into()],
                    streaming_url: Some(format!("https://cdn.example.org/{id}.pdf")),
                    ..Default::default()
                },
            );
            self
        }

        fn node(mut self, node: ContentNode) -> Self {
            self.nodes.insert(node.identifier.clone(), node);
            self
        }

        fn failing(mut self, id: &str) -> Self {
            self.failing.insert(id.into());
            self
        }

        fn slow(mut self, id: &str) -> Self {
            self.slow.insert(id.into());
            self
        }

        fn calls(&self, id: &str) -> usize {
            self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl MetadataFetcher for FakeFetcher {
        async fn fetch(&self, id: &ContentId) -> std::result::Result<ContentNode, FetchError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(id.as_str().to_string())
                .or_default() += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if self.slow.contains(id.as_str()) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            } else if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(id.as_str()) {
                return Err(FetchError::Status {
                    status: 500,
                    detail: "internal error".into(),
                });
            }
            self.nodes.get(id.as_str()).cloned().ok_or(FetchError::NotFound)
        }
    }

    fn resolver(fetcher: Arc<FakeFetcher>) -> GraphResolver<FakeFetcher> {
        GraphResolver::from_shared(fetcher, ResolverConfig::default())
    }

    fn ids(resolution: &Resolution) -> HashSet<String> {
        resolution
            .items
            .iter()
            .map(|item| item.identifier.clone())
            .collect()
    }

    fn id(s: &str) -> ContentId {
        ContentId::from_upstream(s)
    }

    #[tokio::test]
    async fn test_nested_collection_scenario() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_100", &["do_101", "do_102"])
                .collection("do_101", &["do_103"])
                .pdf("do_102")
                .pdf("do_103"),
        );

        let resolution = resolver(Arc::clone(&fetcher))
            .resolve_id("do_100", None)
            .await
            .unwrap();

        assert_eq!(resolution.count(), 2);
        assert_eq!(ids(&resolution), HashSet::from(["do_102".into(), "do_103".into()]));
        assert!(resolution.root_resolved);
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.nodes_visited, 4);
        assert_eq!(fetcher.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_shared_child_fetched_once() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with_delay(Duration::from_millis(5))
                .collection("do_1", &["do_2", "do_3"])
                .collection("do_2", &["do_9"])
                .collection("do_3", &["do_9"])
                .pdf("do_9"),
        );

        let resolution = resolver(Arc::clone(&fetcher)).resolve(&id("do_1"), 8).await;

        assert_eq!(resolution.count(), 1);
        assert_eq!(fetcher.calls("do_9"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_do_not_share_state() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with_delay(Duration::from_millis(5))
                .collection("do_1", &["do_2", "do_3"])
                .collection("do_2", &["do_4"])
                .pdf("do_3")
                .pdf("do_4"),
        );
        let resolver = resolver(Arc::clone(&fetcher));
        let root = id("do_1");

        let (first, second) = tokio::join!(resolver.resolve(&root, 1), resolver.resolve(&root, 1));

        for resolution in [&first, &second] {
            assert!(resolution.root_resolved);
            assert!(resolution.diagnostics.is_empty());
            assert_eq!(resolution.nodes_visited, 4);
            assert_eq!(ids(resolution), HashSet::from(["do_3".into(), "do_4".into()]));
        }
        for node in ["do_1", "do_2", "do_3", "do_4"] {
            assert_eq!(fetcher.calls(node), 2, "{node} should be fetched once per call");
        }
        // Each call holds its own gate of one.
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2"])
                .collection("do_2", &["do_1", "do_3"])
                .pdf("do_3"),
        );

        let resolution = resolver(Arc::clone(&fetcher)).resolve(&id("do_1"), 2).await;

        assert_eq!(ids(&resolution), HashSet::from(["do_3".into()]));
        assert_eq!(fetcher.calls("do_1"), 1);
        assert_eq!(fetcher.calls("do_2"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_limit() {
        let children: Vec<String> = (0..50).map(|i| format!("do_{}", 1000 + i)).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut fake = FakeFetcher::default()
            .with_delay(Duration::from_millis(10))
            .collection("do_1", &child_refs[..25])
            .collection("do_2", &child_refs[25..])
            .collection("do_0", &["do_1", "do_2"]);
        for child in &children {
            fake = fake.pdf(child);
        }
        let fetcher = Arc::new(fake);

        let resolution = resolver(Arc::clone(&fetcher)).resolve(&id("do_0"), 4).await;

        assert_eq!(resolution.count(), 50);
        let peak = fetcher.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in-flight was {peak}");
        assert!(peak >= 2, "fetches never overlapped");
    }

    #[tokio::test]
    async fn test_limit_of_one_still_completes() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2", "do_3"])
                .collection("do_2", &["do_4"])
                .pdf("do_3")
                .pdf("do_4"),
        );

        let resolution = resolver(Arc::clone(&fetcher)).resolve(&id("do_1"), 1).await;

        assert_eq!(resolution.count(), 2);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2", "do_3", "do_4", "do_5"])
                .pdf("do_2")
                .pdf("do_3")
                .pdf("do_4")
                .failing("do_3"),
        );

        let resolution = resolver(Arc::clone(&fetcher))
            .resolve_id("do_1", None)
            .await
            .unwrap();

        assert_eq!(ids(&resolution), HashSet::from(["do_2".into(), "do_4".into()]));
        assert_eq!(resolution.diagnostics.len(), 2);
        assert!(resolution.diagnostics.iter().any(|d| d.content_id == id("do_5")
            && d.kind == DiagnosticKind::Fetch(FetchError::NotFound)));
        assert!(resolution.root_error().is_none());
    }

    #[tokio::test]
    async fn test_failing_root_is_empty_resolution_and_request_error() {
        let fetcher = Arc::new(FakeFetcher::default().failing("do_1").pdf("do_1"));
        let resolver = resolver(Arc::clone(&fetcher));

        let resolution = resolver.resolve(&id("do_1"), 4).await;
        assert!(resolution.is_empty());
        assert!(!resolution.root_resolved);
        assert!(matches!(
            resolution.root_error(),
            Some(DiagnosticKind::Fetch(FetchError::Status { status: 500, .. }))
        ));

        let err = resolver.resolve_id("do_1", None).await.unwrap_err();
        assert!(matches!(err, SunbirdError::Upstream { status: 500, .. }));

        let err = resolver.resolve_id("do_404", None).await.unwrap_err();
        assert!(matches!(err, SunbirdError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_id_never_fetches() {
        let fetcher = Arc::new(FakeFetcher::default().pdf("do_1"));
        let resolver = resolver(Arc::clone(&fetcher));

        for bad in ["", "abc", "do_", "do_12x"] {
            let err = resolver.resolve_id(bad, None).await.unwrap_err();
            assert!(matches!(err, SunbirdError::InvalidFormat { .. }), "{bad:?}");
        }
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_archive_leaf_is_fetched_and_dropped() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2", "do_3"])
                .pdf("do_2")
                .node(ContentNode {
                    identifier: "do_3".into(),
                    mime_type: Some(ECML_ARCHIVE_MIME_TYPE.into()),
                    artifact_url: Some("https://cdn.example.org/do_3.ecar".into()),
                    ..Default::default()
                }),
        );

        let resolution = resolver(Arc::clone(&fetcher)).resolve(&id("do_1"), 4).await;

        assert_eq!(ids(&resolution), HashSet::from(["do_2".into()]));
        assert_eq!(fetcher.calls("do_3"), 1);
        assert!(resolution.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_empty_collection_is_success() {
        let fetcher = Arc::new(FakeFetcher::default().collection("do_1", &[]));

        let resolution = resolver(fetcher).resolve_id("do_1", None).await.unwrap();

        assert!(resolution.is_empty());
        assert!(resolution.root_resolved);
        assert!(resolution.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_cancels_only_its_branch() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2", "do_3"])
                .pdf("do_2")
                .pdf("do_3")
                .slow("do_3"),
        );
        let config = ResolverConfig {
            fetch_timeout: Duration::from_millis(50),
            ..Default::default()
        };

        let resolution = GraphResolver::from_shared(fetcher, config)
            .resolve(&id("do_1"), 4)
            .await;

        assert_eq!(ids(&resolution), HashSet::from(["do_2".into()]));
        assert_eq!(
            resolution.diagnostics,
            vec![Diagnostic {
                content_id: id("do_3"),
                kind: DiagnosticKind::Fetch(FetchError::Timeout(Duration::from_millis(50))),
            }]
        );
    }

    #[tokio::test]
    async fn test_node_cap_limits_visits() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2", "do_3", "do_4"])
                .pdf("do_2")
                .pdf("do_3")
                .pdf("do_4"),
        );
        let config = ResolverConfig {
            max_nodes: Some(3),
            ..Default::default()
        };

        let resolution = GraphResolver::from_shared(Arc::clone(&fetcher), config)
            .resolve(&id("do_1"), 4)
            .await;

        assert_eq!(resolution.nodes_visited, 3);
        assert_eq!(resolution.count(), 2);
        assert_eq!(fetcher.total_calls(), 3);
        assert!(
            resolution
                .diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::NodeCapReached { cap: 3 })
        );
        assert_eq!(resolution.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_prefixed_scalar_subject_is_normalized() {
        let node: ContentNode = serde_json::from_value(serde_json::json!({
            "identifier": "do_7",
            "mimeType": "application/pdf",
            "se_subjects": "Mathematics",
            "streamingUrl": "https://cdn.example.org/do_7.pdf"
        }))
        .unwrap();
        let fetcher = Arc::new(FakeFetcher::default().node(node));

        let resolution = resolver(fetcher).resolve(&id("do_7"), 1).await;

        assert_eq!(resolution.items[0].subjects, vec!["Mathematics"]);
    }

    #[tokio::test]
    async fn test_progress_is_reported() {
        #[derive(Default)]
        struct Counting {
            fetched: AtomicUsize,
            found: AtomicUsize,
        }
        impl ProgressReporter for Counting {
            fn node_fetched(&self, _content_id: &str, _fetched: usize) {
                self.fetched.fetch_add(1, Ordering::SeqCst);
            }
            fn artifact_found(&self, _item: &LeafItem, _found: usize) {
                self.found.fetch_add(1, Ordering::SeqCst);
            }
        }

        let fetcher = Arc::new(
            FakeFetcher::default()
                .collection("do_1", &["do_2", "do_3"])
                .pdf("do_2")
                .pdf("do_3"),
        );
        let progress = Arc::new(Counting::default());
        let resolver = resolver(fetcher).with_progress(progress.clone());

        resolver.resolve(&id("do_1"), 2).await;

        assert_eq!(progress.fetched.load(Ordering::SeqCst), 3);
        assert_eq!(progress.found.load(Ordering::SeqCst), 2);
    }
}
