//! KRM ↔ OCI annotation mapping.
//!
//! The packaging engine carries a resource's KRM identity through OCI
//! descriptor annotations under the `kumori.kumorilabs.io` namespace, and
//! tracks per-resource file placement through the `config.kubernetes.io`
//! path annotations. This module owns those keys and the bidirectional
//! mapping between them and resource metadata.

use std::collections::BTreeMap;

use crate::resource::{Resource, ResourceId};

/// Descriptor annotation carrying the resource kind.
pub const ANNOTATION_KIND: &str = "kumori.kumorilabs.io/kind";
/// Descriptor annotation carrying the resource apiVersion.
pub const ANNOTATION_API_VERSION: &str = "kumori.kumorilabs.io/apiVersion";
/// Descriptor annotation carrying `metadata.name`.
pub const ANNOTATION_METADATA_NAME: &str = "kumori.kumorilabs.io/metadata.name";
/// Descriptor annotation carrying `metadata.namespace`.
pub const ANNOTATION_METADATA_NAMESPACE: &str = "kumori.kumorilabs.io/metadata.namespace";
/// Prefix for per-label descriptor annotations.
pub const ANNOTATION_METADATA_LABELS: &str = "kumori.kumorilabs.io/metadata.labels";
/// Prefix for per-annotation descriptor annotations.
pub const ANNOTATION_METADATA_ANNOTATIONS: &str = "kumori.kumorilabs.io/metadata.annotations";
/// Manifest-level annotation carrying the target platform label.
pub const ANNOTATION_PLATFORM: &str = "kumori.kumorilabs.io/platform";

/// Standard OCI manifest annotation naming the source URL.
pub const ANNOTATION_IMAGE_SOURCE: &str = "org.opencontainers.image.source";
/// Standard OCI descriptor annotation carrying the display title (file path).
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// External-facing file path annotation.
pub const ANNOTATION_PATH: &str = "config.kubernetes.io/path";
/// External-facing per-file document index annotation.
pub const ANNOTATION_INDEX: &str = "config.kubernetes.io/index";
/// Marks a resource as build-time-only local configuration.
pub const ANNOTATION_LOCAL_CONFIG: &str = "config.kubernetes.io/local-config";

/// Prefix of internal bookkeeping annotations, stripped before publish.
pub const ANNOTATION_INTERNAL_PREFIX: &str = "internal.config.kubernetes.io";
/// Internal file path annotation.
pub const ANNOTATION_PATH_INTERNAL: &str = "internal.config.kubernetes.io/path";
/// Internal per-file document index annotation.
pub const ANNOTATION_INDEX_INTERNAL: &str = "internal.config.kubernetes.io/index";

/// Typed view of a resource's KRM metadata.
///
/// This is the unit the annotation mapper operates on: identity, ordered
/// labels and annotations, and the two file-placement paths, rather than a
/// loose string map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KrmMetadata {
    /// The resource identity.
    pub id: ResourceId,
    /// Labels in document order.
    pub labels: Vec<(String, String)>,
    /// Annotations in document order.
    pub annotations: Vec<(String, String)>,
    /// Internal file path, if tracked.
    pub internal_path: Option<String>,
    /// External file path, if tracked.
    pub external_path: Option<String>,
}

impl KrmMetadata {
    /// Extracts the KRM metadata of a resource.
    #[must_use]
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            id: resource.id(),
            labels: resource.labels(),
            annotations: resource.annotations(),
            internal_path: resource
                .annotation(ANNOTATION_PATH_INTERNAL)
                .map(ToString::to_string),
            external_path: resource.annotation(ANNOTATION_PATH).map(ToString::to_string),
        }
    }

    /// Maps the metadata onto flat OCI descriptor annotations.
    ///
    /// Emits one entry per resource annotation under
    /// `…/metadata.annotations/<key>`, one per label under
    /// `…/metadata.labels/<key>`, plus the four fixed identity entries. The
    /// result is ordered (`BTreeMap`) so descriptor bytes are deterministic.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use krmpack_core::{KrmMetadata, Resource};
    ///
    /// let resource = Resource::from_yaml(
    ///     "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n",
    /// )?;
    /// let annotations = KrmMetadata::from_resource(&resource).descriptor_annotations();
    ///
    /// assert_eq!(
    ///     annotations.get("kumori.kumorilabs.io/kind").map(String::as_str),
    ///     Some("Service"),
    /// );
    /// # Ok::<(), krmpack_core::Error>(())
    /// ```
    #[must_use]
    pub fn descriptor_annotations(&self) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();

        for (key, value) in &self.annotations {
            result.insert(
                format!("{ANNOTATION_METADATA_ANNOTATIONS}/{key}"),
                value.clone(),
            );
        }
        for (key, value) in &self.labels {
            result.insert(format!("{ANNOTATION_METADATA_LABELS}/{key}"), value.clone());
        }

        result.insert(ANNOTATION_KIND.to_string(), self.id.kind.clone());
        result.insert(
            ANNOTATION_API_VERSION.to_string(),
            self.id.api_version.clone(),
        );
        result.insert(
            ANNOTATION_METADATA_NAMESPACE.to_string(),
            self.id.namespace.clone(),
        );
        result.insert(ANNOTATION_METADATA_NAME.to_string(), self.id.name.clone());

        result
    }
}

/// Records the file placement of a freshly pulled resource.
///
/// Sets both the external and internal path annotations to `path` so
/// downstream writers can re-derive where the resource belongs on disk.
pub fn apply_pulled_path(resource: &mut Resource, path: &str) {
    resource.set_annotation(ANNOTATION_PATH_INTERNAL, path);
    resource.set_annotation(ANNOTATION_PATH, path);
}

/// Strips build-tool-internal annotations from a resource.
///
/// Removes every key under the `internal.config.kubernetes.io` prefix plus
/// the legacy path/index bookkeeping keys. Must be applied to each pushed
/// resource after selection and before serialization; internal bookkeeping
/// never leaks into a published artifact.
pub fn strip_internal_annotations(resource: &mut Resource) {
    let internal: Vec<String> = resource
        .annotations()
        .into_iter()
        .map(|(key, _)| key)
        .filter(|key| {
            key.starts_with(ANNOTATION_INTERNAL_PREFIX)
                || key == ANNOTATION_PATH
                || key == ANNOTATION_INDEX
        })
        .collect();

    for key in internal {
        resource.remove_annotation(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resource() -> Resource {
        Resource::from_yaml(
            "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: frontend
  labels:
    app: web
  annotations:
    team: platform
    config.kubernetes.io/path: web.yaml
    internal.config.kubernetes.io/path: web.yaml
    internal.config.kubernetes.io/index: '0'
",
        )
        .unwrap()
    }

    #[test]
    fn test_descriptor_annotations_fixed_entries() {
        let annotations = KrmMetadata::from_resource(&sample_resource()).descriptor_annotations();

        assert_eq!(annotations[ANNOTATION_KIND], "Deployment");
        assert_eq!(annotations[ANNOTATION_API_VERSION], "apps/v1");
        assert_eq!(annotations[ANNOTATION_METADATA_NAMESPACE], "frontend");
        assert_eq!(annotations[ANNOTATION_METADATA_NAME], "web");
    }

    #[test]
    fn test_descriptor_annotations_prefixed_entries() {
        let annotations = KrmMetadata::from_resource(&sample_resource()).descriptor_annotations();

        assert_eq!(
            annotations["kumori.kumorilabs.io/metadata.labels/app"],
            "web"
        );
        assert_eq!(
            annotations["kumori.kumorilabs.io/metadata.annotations/team"],
            "platform"
        );
    }

    #[test]
    fn test_metadata_tracks_paths() {
        let meta = KrmMetadata::from_resource(&sample_resource());
        assert_eq!(meta.external_path.as_deref(), Some("web.yaml"));
        assert_eq!(meta.internal_path.as_deref(), Some("web.yaml"));
    }

    #[test]
    fn test_apply_pulled_path() {
        let mut resource =
            Resource::from_yaml("apiVersion: v1\nkind: Service\nmetadata:\n  name: svc\n").unwrap();
        apply_pulled_path(&mut resource, "svc.yaml");

        assert_eq!(resource.annotation(ANNOTATION_PATH), Some("svc.yaml"));
        assert_eq!(
            resource.annotation(ANNOTATION_PATH_INTERNAL),
            Some("svc.yaml")
        );
    }

    #[test]
    fn test_strip_internal_annotations() {
        let mut resource = sample_resource();
        strip_internal_annotations(&mut resource);

        assert_eq!(resource.annotation(ANNOTATION_PATH), None);
        assert_eq!(resource.annotation(ANNOTATION_PATH_INTERNAL), None);
        assert_eq!(
            resource.annotation("internal.config.kubernetes.io/index"),
            None
        );
        // user annotations survive
        assert_eq!(resource.annotation("team"), Some("platform"));
    }

    #[test]
    fn test_strip_internal_annotations_keeps_local_config() {
        let mut resource = sample_resource();
        resource.set_annotation(ANNOTATION_LOCAL_CONFIG, "true");
        strip_internal_annotations(&mut resource);
        assert_eq!(resource.annotation(ANNOTATION_LOCAL_CONFIG), Some("true"));
    }
}
