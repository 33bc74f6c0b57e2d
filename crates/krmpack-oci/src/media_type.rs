//! Media types for krmpack OCI artifacts.

use serde::{Deserialize, Serialize};

/// A registry media type string.
///
/// Each packaged KRM resource becomes one layer whose media type encodes the
/// resource's apiVersion and kind, derived by [`MediaType::for_resource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// Vendor base for all krmpack media types.
    pub const BASE: &'static str = "application/vnd.kumorilabs.kumori";

    /// Prefix of every KRM resource layer media type.
    pub const KRM: &'static str = "application/vnd.kumorilabs.kumori.krm.v1+yaml";

    /// Media type of the manifest config blob.
    pub const CONFIG: &'static str = "application/vnd.kumorilabs.kumori.config.v1+json";

    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// Creates a media type from a raw string.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The KRM layer media type prefix.
    #[must_use]
    pub fn krm() -> Self {
        Self::new(Self::KRM)
    }

    /// The config blob media type.
    #[must_use]
    pub fn config() -> Self {
        Self::new(Self::CONFIG)
    }

    /// Derives the layer media type for a resource identity.
    ///
    /// Appends `_<sanitized-apiVersion>_<sanitized-kind>` to the KRM prefix,
    /// where sanitization lower-cases and replaces every non-word character
    /// with `-`. Total: never fails on any identity strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use krmpack_oci::MediaType;
    ///
    /// let mt = MediaType::for_resource("apps/v1", "Deployment");
    /// assert_eq!(
    ///     mt.as_str(),
    ///     "application/vnd.kumorilabs.kumori.krm.v1+yaml_apps-v1_deployment",
    /// );
    /// ```
    #[must_use]
    pub fn for_resource(api_version: &str, kind: &str) -> Self {
        let gvk = sanitize(&format!("_{api_version}_{kind}"));
        Self(format!("{}{gvk}", Self::KRM))
    }

    /// Returns true if this is a KRM resource layer media type (with or
    /// without the per-resource suffix).
    #[must_use]
    pub fn is_krm_layer(&self) -> bool {
        self.0.starts_with(Self::KRM)
    }

    /// Returns true if this media type is accepted by `allowed`.
    ///
    /// An allowed entry matches exactly, or by prefix for the KRM layer
    /// family so per-resource suffixed layers match the bare KRM entry.
    #[must_use]
    pub fn is_allowed_by(&self, allowed: &[Self]) -> bool {
        allowed
            .iter()
            .any(|entry| self.0 == entry.0 || self.0.starts_with(entry.0.as_str()))
    }
}

/// Lower-cases and replaces every non-word character with `-`.
fn sanitize(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}
