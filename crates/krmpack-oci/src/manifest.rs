//! OCI image manifests for krmpack artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::OciError;
use crate::media_type::MediaType;

const SCHEMA_VERSION: u32 = 2;

/// An OCI image manifest describing one krmpack artifact.
///
/// Holds the config blob descriptor, the ordered layer descriptors (one per
/// packaged resource, in selection order), and manifest-level annotations.
/// Immutable once built; identified externally by the digest of its bytes.
///
/// Given identical inputs the serialized bytes are identical: field order is
/// fixed by the struct and annotation maps are ordered, so re-packaging
/// identical content reproduces the same manifest digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this manifest.
    pub media_type: MediaType,

    /// Configuration blob descriptor.
    pub config: Descriptor,

    /// Layers that make up the artifact, in selection order.
    pub layers: Vec<Descriptor>,

    /// Manifest-level annotations (source URL, platform).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    /// Builds a manifest from a config descriptor, annotations, and layers.
    #[must_use]
    pub fn new(
        config: Descriptor,
        annotations: BTreeMap<String, String>,
        layers: Vec<Descriptor>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            media_type: MediaType::new(MediaType::OCI_MANIFEST),
            config,
            layers,
            annotations,
        }
    }

    /// Serializes the manifest to its canonical bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OciError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a manifest from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OciError::Decode`] if the bytes are not well-formed JSON of
    /// the expected schema version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OciError> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| OciError::Decode {
            reason: e.to_string(),
        })?;

        if manifest.schema_version != SCHEMA_VERSION {
            return Err(OciError::Decode {
                reason: format!(
                    "unsupported manifest schema version {}",
                    manifest.schema_version
                ),
            });
        }

        Ok(manifest)
    }

    /// Returns the KRM resource layers, skipping foreign media types.
    #[must_use]
    pub fn krm_layers(&self) -> Vec<&Descriptor> {
        self.layers
            .iter()
            .filter(|layer| layer.media_type.is_krm_layer())
            .collect()
    }
}
