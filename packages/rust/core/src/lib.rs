//! Consumer-facing operations for the Sunbird tools.
//!
//! [`ContentService`] wires the resolver and search client to one configured
//! upstream and shapes their results into the JSON payloads returned by the
//! CLI and the MCP server.

pub mod payload;
pub mod service;

pub use payload::{ArtifactsPayload, ErrorPayload, ToolResponse, UrlsPayload};
pub use service::ContentService;
