//! OCI content descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::media_type::MediaType;

/// Standard OCI annotation carrying a descriptor's display title.
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// An OCI content descriptor.
///
/// Describes one blob: its media type, content digest, byte size, and
/// annotations. One descriptor exists per packaged resource (a layer) plus
/// one for the manifest's config blob. Annotations are kept ordered so
/// descriptor bytes serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: MediaType,

    /// Digest of the targeted content (`sha256:<hex>`).
    pub digest: String,

    /// Size in bytes of the content.
    pub size: u64,

    /// Annotations (key-value metadata).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(media_type: MediaType, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type,
            digest: digest.into(),
            size,
            annotations: BTreeMap::new(),
        }
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Returns the display title (file path), if set.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_TITLE).map(String::as_str)
    }

    /// Returns the digest algorithm (e.g., "sha256").
    #[must_use]
    pub fn digest_algorithm(&self) -> &str {
        self.digest.split(':').next().unwrap_or("sha256")
    }

    /// Returns the digest value without the algorithm prefix.
    #[must_use]
    pub fn digest_value(&self) -> &str {
        self.digest.split(':').nth(1).unwrap_or(&self.digest)
    }

    /// Returns the first 12 characters of the digest value, the conventional
    /// short form used in diagnostics.
    #[must_use]
    pub fn digest_prefix(&self) -> &str {
        let value = self.digest_value();
        &value[..value.len().min(12)]
    }
}
