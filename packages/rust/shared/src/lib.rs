//! Shared types, error model, and configuration for the Sunbird tools.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`SunbirdError`]: the unified error type
//! - Domain types ([`ContentNode`], [`LeafItem`])
//! - Configuration ([`AppConfig`], [`ResolverConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, COLLECTION_MIME_TYPE, Deployment, ECML_ARCHIVE_MIME_TYPE, IdFormat,
    PDF_MIME_TYPE, ResolverConfig, ResolverSettings, SearchSettings, UpstreamConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{MAX_DETAIL_LEN, Result, SunbirdError, truncate_detail};
pub use types::{ContentNode, LeafItem};
