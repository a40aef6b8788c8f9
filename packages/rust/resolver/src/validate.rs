//! Syntactic validation of externally supplied content identifiers.

use std::sync::LazyLock;

use regex::Regex;
use sunbird_shared::{IdFormat, ResolverConfig, Result, SunbirdError};

/// Every content identifier starts with this prefix.
pub const CONTENT_ID_PREFIX: &str = "do_";

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("numeric suffix regex"));

static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]+$").expect("hex suffix regex"));

// ---------------------------------------------------------------------------
// ContentId
// ---------------------------------------------------------------------------

/// An identifier naming one content node in the upstream service.
///
/// Values handed in by callers are only obtainable through
/// [`ContentIdValidator::validate`]; child identifiers read from upstream
/// records are trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    pub(crate) fn from_upstream(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ContentIdValidator
// ---------------------------------------------------------------------------

/// Checks identifiers against the syntax accepted by one deployment.
#[derive(Debug, Clone, Copy)]
pub struct ContentIdValidator {
    format: IdFormat,
    hex_suffix_len: usize,
}

impl Default for ContentIdValidator {
    fn default() -> Self {
        Self::numeric()
    }
}

impl ContentIdValidator {
    /// `do_` followed by digits.
    pub fn numeric() -> Self {
        Self {
            format: IdFormat::Numeric,
            hex_suffix_len: 0,
        }
    }

    /// `do_` followed by exactly `len` hexadecimal characters.
    pub fn hex(len: usize) -> Self {
        Self {
            format: IdFormat::Hex,
            hex_suffix_len: len,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        match config.id_format {
            IdFormat::Numeric => Self::numeric(),
            IdFormat::Hex => Self::hex(config.hex_suffix_len),
        }
    }

    /// Validate `raw`, returning the typed identifier on success.
    pub fn validate(&self, raw: &str) -> Result<ContentId> {
        if raw.trim().is_empty() {
            return Err(SunbirdError::invalid_format(raw, "content_id is required"));
        }

        let Some(suffix) = raw.strip_prefix(CONTENT_ID_PREFIX) else {
            return Err(SunbirdError::invalid_format(
                raw,
                format!("content_id must start with '{CONTENT_ID_PREFIX}'"),
            ));
        };

        match self.format {
            IdFormat::Numeric if !NUMERIC_RE.is_match(suffix) => Err(SunbirdError::invalid_format(
                raw,
                format!("content_id must be '{CONTENT_ID_PREFIX}' followed by numbers"),
            )),
            IdFormat::Hex
                if suffix.len() != self.hex_suffix_len || !HEX_RE.is_match(suffix) =>
            {
                Err(SunbirdError::invalid_format(
                    raw,
                    format!(
                        "content_id must be '{CONTENT_ID_PREFIX}' followed by {} hexadecimal characters",
                        self.hex_suffix_len
                    ),
                ))
            }
            _ => Ok(ContentId(raw.to_string())),
        }
    }
}
