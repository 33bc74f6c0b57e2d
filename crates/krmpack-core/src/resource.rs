//! KRM resource model.
//!
//! This module defines the [`Resource`] structure that wraps a single parsed
//! YAML document and exposes the KRM metadata accessors (apiVersion, kind,
//! name, namespace, labels, annotations) the rest of the engine works with.

use std::fmt;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::annotations::ANNOTATION_LOCAL_CONFIG;
use crate::error::{Error, Result};

/// A single KRM resource document.
///
/// Resources preserve the field order of the underlying document; labels and
/// annotations keep their insertion order when read back.
///
/// # Examples
///
/// ```rust
/// use krmpack_core::Resource;
///
/// let yaml = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n";
/// let resource = Resource::from_yaml(yaml)?;
///
/// assert_eq!(resource.api_version(), "apps/v1");
/// assert_eq!(resource.name(), "web");
/// # Ok::<(), krmpack_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    doc: Mapping,
}

/// The identity of a resource: `(apiVersion, kind, namespace, name)`.
///
/// Two resources are "the same" for merge purposes iff their identities are
/// equal. The namespace is empty for cluster-scoped resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// The resource apiVersion (group/version).
    pub api_version: String,
    /// The resource kind.
    pub kind: String,
    /// The resource namespace; empty if cluster-scoped.
    pub namespace: String,
    /// The resource name.
    pub name: String,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}/{}", self.api_version, self.kind, self.name)
        } else {
            write!(
                f,
                "{}/{}/{}/{}",
                self.api_version, self.kind, self.namespace, self.name
            )
        }
    }
}

impl Resource {
    /// Parses a single YAML document into a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid YAML or the document is not
    /// a mapping.
    pub fn from_yaml(input: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(input)?;
        match value {
            Value::Mapping(doc) => Ok(Self { doc }),
            _ => Err(Error::NotAMapping),
        }
    }

    /// Parses a multi-document YAML stream into resources.
    ///
    /// Documents are separated by the conventional `---` marker; empty
    /// documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any document is malformed or not a mapping.
    pub fn parse_all(input: &str) -> Result<Vec<Self>> {
        let mut resources = Vec::new();
        for document in serde_yaml::Deserializer::from_str(input) {
            let value = Value::deserialize(document)?;
            match value {
                Value::Null => {}
                Value::Mapping(doc) => resources.push(Self { doc }),
                _ => return Err(Error::NotAMapping),
            }
        }
        Ok(resources)
    }

    /// Serializes the resource back to YAML.
    ///
    /// The output is used byte-for-byte as packaged layer content, so callers
    /// must strip any bookkeeping annotations first.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&Value::Mapping(self.doc.clone()))?)
    }

    /// Returns the document as a YAML value (for typed deserialization).
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Mapping(self.doc.clone())
    }

    /// Returns the resource apiVersion, or `""` if absent.
    #[must_use]
    pub fn api_version(&self) -> &str {
        self.top_level_str("apiVersion")
    }

    /// Returns the resource kind, or `""` if absent.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.top_level_str("kind")
    }

    /// Returns `metadata.name`, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// Returns `metadata.namespace`, or `""` if absent.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    /// Returns the resource identity.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        ResourceId {
            api_version: self.api_version().to_string(),
            kind: self.kind().to_string(),
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
        }
    }

    /// Returns the resource labels in document order.
    #[must_use]
    pub fn labels(&self) -> Vec<(String, String)> {
        self.metadata_string_map("labels")
    }

    /// Returns the resource annotations in document order.
    #[must_use]
    pub fn annotations(&self) -> Vec<(String, String)> {
        self.metadata_string_map("annotations")
    }

    /// Returns the value of a single annotation, if present.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()?
            .get(&Value::from("annotations"))?
            .as_mapping()?
            .get(&Value::from(key))?
            .as_str()
    }

    /// Sets an annotation, creating `metadata.annotations` if needed.
    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let annotations = self.annotations_mut();
        annotations.insert(Value::from(key.into()), Value::from(value.into()));
    }

    /// Removes an annotation; drops the `annotations` mapping when it becomes
    /// empty so the written document stays clean.
    pub fn remove_annotation(&mut self, key: &str) {
        let Some(Value::Mapping(metadata)) = self.doc.get_mut(&Value::from("metadata")) else {
            return;
        };
        let mut now_empty = false;
        if let Some(Value::Mapping(annotations)) = metadata.get_mut(&Value::from("annotations")) {
            annotations.remove(&Value::from(key));
            now_empty = annotations.is_empty();
        }
        if now_empty {
            metadata.remove(&Value::from("annotations"));
        }
    }

    /// Returns true if the resource is a well-formed KRM resource: it has a
    /// non-empty apiVersion, kind, and name.
    #[must_use]
    pub fn is_krm(&self) -> bool {
        !self.api_version().is_empty() && !self.kind().is_empty() && !self.name().is_empty()
    }

    /// Returns true if the resource is marked as build-time-only local
    /// configuration.
    ///
    /// Any non-empty value of the local-config annotation counts, matching
    /// the upstream convention.
    #[must_use]
    pub fn is_local_config(&self) -> bool {
        self.annotation(ANNOTATION_LOCAL_CONFIG)
            .is_some_and(|v| !v.is_empty())
    }

    /// Merges another resource's fields into this one.
    ///
    /// Nested mappings merge key-wise with `other` winning on conflicting
    /// leaf values; sequences and scalars are replaced wholesale. Keys only
    /// present in `self` are preserved.
    pub fn merge_from(&mut self, other: &Self) {
        merge_mapping(&mut self.doc, &other.doc);
    }

    fn top_level_str(&self, key: &str) -> &str {
        self.doc
            .get(&Value::from(key))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    fn metadata(&self) -> Option<&Mapping> {
        self.doc.get(&Value::from("metadata"))?.as_mapping()
    }

    fn metadata_str(&self, key: &str) -> &str {
        self.metadata()
            .and_then(|m| m.get(&Value::from(key)))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    fn metadata_string_map(&self, key: &str) -> Vec<(String, String)> {
        self.metadata()
            .and_then(|m| m.get(&Value::from(key)))
            .and_then(Value::as_mapping)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| {
                        Some((k.as_str()?.to_string(), v.as_str()?.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn annotations_mut(&mut self) -> &mut Mapping {
        let metadata = ensure_mapping(&mut self.doc, "metadata");
        ensure_mapping(metadata, "annotations")
    }
}

/// Returns the mapping at `key`, inserting an empty one if the key is absent
/// or holds a non-mapping value.
fn ensure_mapping<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let key = Value::from(key);
    if !matches!(parent.get(&key), Some(Value::Mapping(_))) {
        parent.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(m)) = parent.get_mut(&key) {
        m
    } else {
        unreachable!("mapping was just inserted")
    }
}

fn merge_mapping(base: &mut Mapping, other: &Mapping) {
    for (key, value) in other {
        match base.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_value(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Mapping(b), Value::Mapping(o)) => merge_mapping(b, o),
        (b, o) => *b = o.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "\
apiVersion: v1
kind: Service
metadata:
  name: test
  namespace: web
  labels:
    app: test
  annotations:
    team: platform
spec:
  ports:
  - name: http
    port: 8080
";

    #[test]
    fn test_from_yaml_accessors() {
        let resource = Resource::from_yaml(SERVICE).unwrap();
        assert_eq!(resource.api_version(), "v1");
        assert_eq!(resource.kind(), "Service");
        assert_eq!(resource.name(), "test");
        assert_eq!(resource.namespace(), "web");
        assert_eq!(
            resource.labels(),
            vec![("app".to_string(), "test".to_string())]
        );
        assert_eq!(resource.annotation("team"), Some("platform"));
    }

    #[test]
    fn test_from_yaml_rejects_scalar_document() {
        let result = Resource::from_yaml("just a string");
        assert!(matches!(result, Err(Error::NotAMapping)));
    }

    #[test]
    fn test_parse_all_splits_documents() {
        let input = format!("{SERVICE}---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n");
        let resources = Resource::parse_all(&input).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1].kind(), "ConfigMap");
    }

    #[test]
    fn test_parse_all_skips_empty_documents() {
        let input = "---\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n";
        let resources = Resource::parse_all(input).unwrap();
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn test_yaml_round_trip_preserves_fields() {
        let resource = Resource::from_yaml(SERVICE).unwrap();
        let out = resource.to_yaml().unwrap();
        let reparsed = Resource::from_yaml(&out).unwrap();
        assert_eq!(resource, reparsed);
    }

    #[test]
    fn test_set_annotation_creates_metadata() {
        let mut resource = Resource::from_yaml("apiVersion: v1\nkind: ConfigMap\n").unwrap();
        resource.set_annotation("config.kubernetes.io/path", "cm.yaml");
        assert_eq!(
            resource.annotation("config.kubernetes.io/path"),
            Some("cm.yaml")
        );
    }

    #[test]
    fn test_remove_annotation_drops_empty_mapping() {
        let mut resource = Resource::from_yaml(SERVICE).unwrap();
        resource.remove_annotation("team");
        assert!(resource.annotations().is_empty());
        let out = resource.to_yaml().unwrap();
        assert!(!out.contains("annotations"));
    }

    #[test]
    fn test_is_krm() {
        let resource = Resource::from_yaml(SERVICE).unwrap();
        assert!(resource.is_krm());

        let nameless = Resource::from_yaml("apiVersion: v1\nkind: Service\n").unwrap();
        assert!(!nameless.is_krm());
    }

    #[test]
    fn test_is_local_config() {
        let mut resource = Resource::from_yaml(SERVICE).unwrap();
        assert!(!resource.is_local_config());
        resource.set_annotation("config.kubernetes.io/local-config", "true");
        assert!(resource.is_local_config());
    }

    #[test]
    fn test_id_display() {
        let resource = Resource::from_yaml(SERVICE).unwrap();
        assert_eq!(resource.id().to_string(), "v1/Service/web/test");

        let cluster = Resource::from_yaml("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: web\n")
            .unwrap();
        assert_eq!(cluster.id().to_string(), "v1/Namespace/web");
    }

    #[test]
    fn test_merge_from_leaf_precedence() {
        let mut base = Resource::from_yaml(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  a: '1'\n  keep: 'yes'\n",
        )
        .unwrap();
        let other = Resource::from_yaml(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  a: '2'\n  b: '3'\n",
        )
        .unwrap();

        base.merge_from(&other);

        let value = base.to_value();
        assert_eq!(value["data"]["a"], Value::from("2"));
        assert_eq!(value["data"]["b"], Value::from("3"));
        assert_eq!(value["data"]["keep"], Value::from("yes"));
    }

    #[test]
    fn test_merge_from_replaces_sequences() {
        let mut base =
            Resource::from_yaml("apiVersion: v1\nkind: Service\nmetadata:\n  name: s\nspec:\n  ports:\n  - port: 80\n")
                .unwrap();
        let other =
            Resource::from_yaml("apiVersion: v1\nkind: Service\nmetadata:\n  name: s\nspec:\n  ports:\n  - port: 8080\n")
                .unwrap();

        base.merge_from(&other);

        let value = base.to_value();
        assert_eq!(value["spec"]["ports"][0]["port"], Value::from(8080));
    }
}
