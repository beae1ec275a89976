//! Artifact identifiers and the filenames derived from them.
//!
//! Every file the gateway serves is named `{uuid}.mp3` where the uuid is the
//! 36-char lowercase hyphenated form. [`AudioId::from_filename`] accepts that
//! exact shape and nothing else, so client-supplied names can never escape the
//! store directory.
//!
//! In-progress writes use `{uuid}.{label}.part`, which never parses as an
//! artifact name; [`AudioId::from_staging_name`] recognizes those.

use std::fmt;

use uuid::Uuid;

/// Extension of every stored artifact.
pub const AUDIO_EXT: &str = "mp3";

/// Length of the hyphenated textual form.
pub const ID_LEN: usize = 36;

/// Extension of in-progress staging files.
pub const STAGING_EXT: &str = "part";

/// Opaque, collision-resistant identifier of one audio artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioId(Uuid);

impl AudioId {
    /// Fresh random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// `{id}.mp3`
    pub fn filename(&self) -> String {
        format!("{}.{AUDIO_EXT}", self.0.hyphenated())
    }

    /// Parse an artifact filename. Returns `None` for anything that is not
    /// exactly `{lowercase-hyphenated-uuid}.mp3`.
    pub fn from_filename(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(AUDIO_EXT)?.strip_suffix('.')?;
        Self::parse_canonical(stem)
    }

    /// `{id}.{label}.part`
    pub fn staging_name(&self, label: &str) -> String {
        format!("{}.{label}.{STAGING_EXT}", self.0.hyphenated())
    }

    /// Parse a staging filename. The label must be non-empty ASCII
    /// alphanumeric.
    pub fn from_staging_name(name: &str) -> Option<Self> {
        let rest = name.strip_suffix(STAGING_EXT)?.strip_suffix('.')?;
        let (stem, label) = rest.split_once('.')?;
        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        Self::parse_canonical(stem)
    }

    fn parse_canonical(stem: &str) -> Option<Self> {
        if stem.len() != ID_LEN {
            return None;
        }
        let uuid = Uuid::parse_str(stem).ok()?;
        // parse_str also accepts uppercase; only the canonical form round-trips
        if uuid.hyphenated().to_string() != stem {
            return None;
        }
        Some(Self(uuid))
    }
}

impl Default for AudioId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
