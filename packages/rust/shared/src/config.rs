//! Application configuration for the Sunbird tools.
//!
//! User config lives at `~/.sunbird/sunbird.toml`.
//! CLI flags and environment variables override config file values, which
//! override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SunbirdError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sunbird.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sunbird";

/// MIME type the upstream uses for collection containers (textbooks, units).
pub const COLLECTION_MIME_TYPE: &str = "application/vnd.ekstep.content-collection";

/// MIME type of downloadable PDF artifacts.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// ECML archive bundles are never returned as artifacts.
pub const ECML_ARCHIVE_MIME_TYPE: &str = "application/vnd.ekstep.ecml-archive";

// ---------------------------------------------------------------------------
// Deployment presets
// ---------------------------------------------------------------------------

/// Known upstream deployments with their own base URL and filter vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// The national DIKSHA production platform.
    #[default]
    Diksha,
    /// The public Sunbird sandbox.
    Sandbox,
}

impl Deployment {
    /// Base URL of the deployment's public API host.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Diksha => "https://diksha.gov.in",
            Self::Sandbox => "https://sandbox.sunbirded.org",
        }
    }
}

impl std::str::FromStr for Deployment {
    type Err = SunbirdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diksha" => Ok(Self::Diksha),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(SunbirdError::config(format!(
                "unknown deployment '{other}': expected 'diksha' or 'sandbox'"
            ))),
        }
    }
}

impl std::fmt::Display for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Diksha => f.write_str("diksha"),
            Self::Sandbox => f.write_str("sandbox"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config structs (matching sunbird.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment this config targets.
    #[serde(default)]
    pub deployment: Deployment,

    /// Upstream content service.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Graph resolution policy.
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Flat search defaults and allow-lists.
    #[serde(default)]
    pub search: SearchSettings,
}

/// `[upstream]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the content service (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the read endpoint; the content id is appended.
    #[serde(default = "default_read_endpoint")]
    pub read_endpoint: String,

    /// Path of the search endpoint.
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Total timeout for a single HTTP request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            read_endpoint: default_read_endpoint(),
            search_endpoint: default_search_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the read endpoint for `content_id`.
    pub fn read_url(&self, content_id: &str) -> String {
        format!(
            "{}{}/{content_id}",
            self.base_url.trim_end_matches('/'),
            self.read_endpoint.trim_end_matches('/')
        )
    }

    /// Full URL of the search endpoint.
    pub fn search_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.search_endpoint
        )
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    Deployment::Diksha.base_url().into()
}
fn default_read_endpoint() -> String {
    "/api/content/v1/read".into()
}
fn default_search_endpoint() -> String {
    "/api/content/v1/search".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Accepted syntactic form of a content identifier suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    /// `do_` followed by one or more digits.
    #[default]
    Numeric,
    /// `do_` followed by a fixed number of hexadecimal characters.
    Hex,
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Maximum metadata fetches in flight across one traversal.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Wall-clock limit for a single node fetch.
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// MIME type marking collection nodes.
    #[serde(default = "default_collection_mime")]
    pub collection_mime_type: String,

    /// The only MIME type a leaf may have to be returned.
    #[serde(default = "default_allowed_mime")]
    pub allowed_mime_type: String,

    /// MIME types that are never returned.
    #[serde(default = "default_excluded_mimes")]
    pub excluded_mime_types: Vec<String>,

    /// Identifier suffix syntax for this deployment.
    #[serde(default)]
    pub id_format: IdFormat,

    /// Suffix length when `id_format = "hex"`.
    #[serde(default = "default_hex_suffix_len")]
    pub hex_suffix_len: usize,

    /// Optional cap on distinct nodes visited per resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<usize>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fetch_timeout_secs: default_timeout_secs(),
            collection_mime_type: default_collection_mime(),
            allowed_mime_type: default_allowed_mime(),
            excluded_mime_types: default_excluded_mimes(),
            id_format: IdFormat::default(),
            hex_suffix_len: default_hex_suffix_len(),
            max_nodes: None,
        }
    }
}

fn default_concurrency() -> u32 {
    20
}
fn default_collection_mime() -> String {
    COLLECTION_MIME_TYPE.into()
}
fn default_allowed_mime() -> String {
    PDF_MIME_TYPE.into()
}
fn default_excluded_mimes() -> Vec<String> {
    vec![ECML_ARCHIVE_MIME_TYPE.into()]
}
fn default_hex_suffix_len() -> usize {
    32
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Results per page when the caller gives no limit.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Upper bound accepted for `limit`.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Reject filter keys/values and fields outside the allow-lists.
    #[serde(default = "default_true")]
    pub enable_validation: bool,

    /// Fields requested from the upstream (and accepted from callers).
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Allowed filter keys and their allowed values.
    #[serde(default = "default_filters")]
    pub filters: BTreeMap<String, Vec<String>>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            enable_validation: true,
            fields: default_fields(),
            filters: default_filters(),
        }
    }
}

impl SearchSettings {
    /// Allow-lists for the public sandbox.
    pub fn sandbox() -> Self {
        Self {
            fields: to_strings(&[
                "name", "appIcon", "mimeType", "gradeLevel", "identifier", "medium",
                "pkgVersion", "board", "subject", "resourceType", "contentType", "channel",
                "organisation", "trackable", "se_boards", "se_subjects", "se_mediums",
                "se_gradeLevels", "creator",
            ]),
            filters: BTreeMap::from([
                ("subject".into(), to_strings(&["english", "hindi"])),
                (
                    "audience".into(),
                    to_strings(&[
                        "Other", "Parent", "School head OR Officials", "Student", "Teacher",
                    ]),
                ),
                ("status".into(), to_strings(&["Live"])),
                ("contentType".into(), to_strings(&["Course"])),
                ("primaryCategory".into(), to_strings(&["Course", "Course Assessment"])),
                ("se_boards".into(), to_strings(&["CBSE"])),
                ("se_gradeLevels".into(), class_levels(4)),
                ("se_mediums".into(), to_strings(&["English", "Hindi", "Tamil", "Telugu"])),
                ("creator".into(), to_strings(&["content creator"])),
                ("organisation".into(), to_strings(&["sunbird org"])),
            ]),
            ..Self::default()
        }
    }
}

fn default_limit() -> u32 {
    10
}
fn default_max_limit() -> u32 {
    100
}
fn default_true() -> bool {
    true
}

fn default_fields() -> Vec<String> {
    to_strings(&[
        "name", "appIcon", "mimeType", "gradeLevel", "identifier", "medium", "pkgVersion",
        "board", "subject", "resourceType", "primaryCategory", "contentType", "channel",
        "organisation", "trackable", "se_boards", "se_subjects", "se_mediums", "se_gradeLevels",
        "me_averageRating", "me_totalRatingsCount", "me_totalPlaySessionCount",
    ])
}

fn default_filters() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "primaryCategory".into(),
            to_strings(&[
                "Collection", "Resource", "Content Playlist", "Course", "Course Assessment",
                "Digital Textbook", "eTextbook", "Explanation Content", "Learning Resource",
                "Practice Question Set", "Teacher Resource", "Textbook Unit", "LessonPlan",
                "FocusSpot", "Learning Outcome Definition", "Curiosity Questions",
                "MarkingSchemeRubric", "ExplanationResource", "ExperientialResource",
                "Practice Resource", "TVLesson", "Question paper",
            ]),
        ),
        ("visibility".into(), to_strings(&["Default", "Parent"])),
        ("se_boards".into(), to_strings(&["CBSE", "State (Andhra Pradesh)"])),
        ("se_gradeLevels".into(), class_levels(12)),
        ("se_mediums".into(), to_strings(&["English", "Hindi"])),
        (
            "se_subjects".into(),
            to_strings(&[
                "Kannada", "English", "Hindi", "Mathematics", "Physical Science", "Biology",
                "History", "Geography", "Civics", "Economics", "Environmental Studies",
                "Health & Physical Education", "Computer Applications",
                "Art & Cultural Education - Music", "Drawing",
            ]),
        ),
        ("audience".into(), to_strings(&["Student", "Teacher"])),
    ])
}

fn class_levels(max: u32) -> Vec<String> {
    (1..=max).map(|i| format!("Class {i}")).collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl AppConfig {
    /// Default configuration for a given deployment.
    pub fn for_deployment(deployment: Deployment) -> Self {
        let mut config = Self::default();
        config.apply_deployment(deployment);
        config
    }

    /// Switch base URL and search vocabulary to a deployment's preset.
    pub fn apply_deployment(&mut self, deployment: Deployment) {
        self.deployment = deployment;
        self.upstream.base_url = deployment.base_url().into();
        self.search = match deployment {
            Deployment::Diksha => SearchSettings::default(),
            Deployment::Sandbox => SearchSettings::sandbox(),
        };
    }

    /// Replace the search filter allow-list with a JSON object of
    /// `key -> [values]`. A malformed document is logged and ignored.
    pub fn apply_filters_json(&mut self, json: &str) {
        match serde_json::from_str::<BTreeMap<String, Vec<String>>>(json) {
            Ok(filters) => self.search.filters = filters,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse filter allow-list JSON, keeping defaults");
            }
        }
    }

    /// Check values that would otherwise fail late, mid-request.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.upstream.base_url).map_err(|e| {
            SunbirdError::config(format!("invalid base_url '{}': {e}", self.upstream.base_url))
        })?;
        if self.upstream.timeout_secs == 0 || self.resolver.fetch_timeout_secs == 0 {
            return Err(SunbirdError::config("timeouts must be greater than zero"));
        }
        if self.resolver.concurrency == 0 {
            return Err(SunbirdError::config("resolver.concurrency must be at least 1"));
        }
        if self.resolver.id_format == IdFormat::Hex && self.resolver.hex_suffix_len == 0 {
            return Err(SunbirdError::config("resolver.hex_suffix_len must be at least 1"));
        }
        if self.resolver.max_nodes == Some(0) {
            return Err(SunbirdError::config("resolver.max_nodes must be at least 1 when set"));
        }
        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(SunbirdError::config(format!(
                "search.default_limit must be between 1 and max_limit ({})",
                self.search.max_limit
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolver config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime resolution configuration, passed explicitly into the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Admission-gate size: maximum concurrent metadata fetches.
    pub concurrency: usize,
    /// Per-fetch wall-clock timeout.
    pub fetch_timeout: Duration,
    /// MIME type marking collection nodes.
    pub collection_mime_type: String,
    /// MIME type a leaf must have to qualify.
    pub allowed_mime_type: String,
    /// MIME types that never qualify.
    pub excluded_mime_types: Vec<String>,
    /// Identifier suffix syntax.
    pub id_format: IdFormat,
    /// Suffix length for hex identifiers.
    pub hex_suffix_len: usize,
    /// Optional cap on distinct nodes visited.
    pub max_nodes: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ResolverConfig {
    fn from(config: &AppConfig) -> Self {
        let r = &config.resolver;
        Self {
            concurrency: r.concurrency.max(1) as usize,
            fetch_timeout: Duration::from_secs(r.fetch_timeout_secs),
            collection_mime_type: r.collection_mime_type.clone(),
            allowed_mime_type: r.allowed_mime_type.clone(),
            excluded_mime_types: r.excluded_mime_types.clone(),
            id_format: r.id_format,
            hex_suffix_len: r.hex_suffix_len,
            max_nodes: r.max_nodes,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sunbird/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SunbirdError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sunbird/sunbird.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SunbirdError::io(path, e))?;

    let mut config = AppConfig::from_toml_str(&content).map_err(|e| {
        SunbirdError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.upstream.base_url = config.upstream.base_url.trim_end_matches('/').to_string();
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Parse a config document on top of its deployment's preset.
    ///
    /// Keys present in a file section replace the preset's value for that key;
    /// everything else keeps the preset, so `deployment = "sandbox"` alone
    /// selects the sandbox base URL and search vocabulary.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        use serde::de::Error as _;

        let file: toml::Table = toml::from_str(content)?;
        let deployment = file
            .get("deployment")
            .cloned()
            .map(toml::Value::try_into::<Deployment>)
            .transpose()?
            .unwrap_or_default();

        let preset = toml::Value::try_from(Self::for_deployment(deployment))
            .map_err(|e| toml::de::Error::custom(e.to_string()))?;
        let toml::Value::Table(mut merged) = preset else {
            return Err(toml::de::Error::custom("preset did not serialize to a table"));
        };

        for (key, value) in file {
            match (merged.get_mut(&key), value) {
                (Some(toml::Value::Table(section)), toml::Value::Table(overlay)) => {
                    section.extend(overlay);
                }
                (_, value) => {
                    merged.insert(key, value);
                }
            }
        }

        toml::Value::Table(merged).try_into()
    }
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SunbirdError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SunbirdError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SunbirdError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
