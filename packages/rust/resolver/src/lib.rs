//! Content graph resolution for Sunbird content identifiers.
//!
//! Validates a root identifier, walks its collection tree with bounded
//! concurrency, and returns the downloadable leaves.

pub mod engine;
pub mod extract;
pub mod fetcher;
pub mod filter;
pub mod validate;
pub mod visited;

pub use engine::{
    Diagnostic, DiagnosticKind, GraphResolver, ProgressReporter, Resolution, SilentProgress,
};
pub use extract::extract_item;
pub use fetcher::{FetchError, HttpFetcher, MetadataFetcher, build_client};
pub use filter::ArtifactFilter;
pub use validate::{CONTENT_ID_PREFIX, ContentId, ContentIdValidator};
pub use visited::{Claim, VisitedSet};
