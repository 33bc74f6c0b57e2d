//! End-to-end tests for the package filter against an in-memory registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use krmpack_core::annotations::{ANNOTATION_PATH, ANNOTATION_PATH_INTERNAL};
use krmpack_core::{KrmPackage, Resource};
use krmpack_filters::{report, PackageFilter, Severity};
use krmpack_oci::{
    ContentStore, Manifest, MediaType, OciError, PackageReference, RegistryCopier,
    RegistryTransport,
};

/// In-memory registry shared between a transport and the test body.
#[derive(Default)]
struct StubRegistry {
    manifest: Mutex<Option<Vec<u8>>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<usize>,
}

impl StubRegistry {
    fn total_calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn count(&self) {
        *self.calls.lock().unwrap() += 1;
    }

    /// Preloads the registry with a manifest holding one Service layer at
    /// `svc.yaml`.
    fn preload_service_package(&self) {
        let mut store = ContentStore::new();
        let service = "apiVersion: v1\nkind: Service\nmetadata:\n  name: test\nspec:\n  ports:\n  - port: 8080\n";
        let layer = store.add_layer(
            "svc.yaml",
            MediaType::for_resource("v1", "Service"),
            service.as_bytes().to_vec(),
        );
        let config = store.set_config();
        let manifest = Manifest::new(config, BTreeMap::new(), vec![layer.clone()]);

        let mut blobs = HashMap::new();
        for descriptor in [&layer, &manifest.config] {
            blobs.insert(
                descriptor.digest.clone(),
                store.get(&descriptor.digest).unwrap().to_vec(),
            );
        }

        *self.manifest.lock().unwrap() = Some(manifest.to_bytes().unwrap());
        *self.blobs.lock().unwrap() = blobs;
    }
}

struct StubTransport(Arc<StubRegistry>);

#[async_trait]
impl RegistryTransport for StubTransport {
    async fn fetch_manifest(&self, reference: &PackageReference) -> Result<Vec<u8>, OciError> {
        self.0.count();
        self.0
            .manifest
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| OciError::NotFound {
                reference: reference.to_string(),
            })
    }

    async fn fetch_blob(
        &self,
        _reference: &PackageReference,
        digest: &str,
    ) -> Result<Vec<u8>, OciError> {
        self.0.count();
        self.0
            .blobs
            .lock()
            .unwrap()
            .get(digest)
            .cloned()
            .ok_or_else(|| OciError::NotFound {
                reference: digest.to_string(),
            })
    }

    async fn upload_blob(
        &self,
        _reference: &PackageReference,
        digest: &str,
        bytes: &[u8],
    ) -> Result<(), OciError> {
        self.0.count();
        self.0
            .blobs
            .lock()
            .unwrap()
            .insert(digest.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn push_manifest(
        &self,
        _reference: &PackageReference,
        bytes: &[u8],
    ) -> Result<(), OciError> {
        self.0.count();
        *self.0.manifest.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }
}

fn filter_for(registry: &Arc<StubRegistry>, action: &str) -> PackageFilter {
    let config_resource = config_resource(action);
    let mut config = KrmPackage::from_resource(&config_resource).unwrap();
    config.apply_defaults();
    config.validate().unwrap();

    PackageFilter::new(
        config,
        RegistryCopier::new(Box::new(StubTransport(registry.clone()))),
    )
}

fn config_resource(action: &str) -> Resource {
    Resource::from_yaml(&format!(
        "\
apiVersion: fn.kumorilabs.io/v1alpha1
kind: KRMPackage
metadata:
  name: test-package
  annotations:
    config.kubernetes.io/local-config: 'true'
spec:
  action: {action}
  package: registry.example/test-package/test:0.1.0
  platform: eks
"
    ))
    .unwrap()
}

fn service(name: &str) -> Resource {
    Resource::from_yaml(&format!(
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: {name}\nspec:\n  ports:\n  - port: 8080\n"
    ))
    .unwrap()
}

fn deployment(name: &str) -> Resource {
    Resource::from_yaml(&format!(
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {name}\nspec:\n  replicas: 2\n"
    ))
    .unwrap()
}

#[tokio::test]
async fn pull_adds_resources_with_path_annotations() {
    let registry = Arc::new(StubRegistry::default());
    registry.preload_service_package();

    let filter = filter_for(&registry, "pull");
    let items = vec![config_resource("pull")];

    let (items, outcomes) = filter.filter(items).await.unwrap();

    assert_eq!(items.len(), 2);
    // the config resource passes through unchanged
    assert_eq!(items[0].kind(), "KRMPackage");

    let pulled = &items[1];
    assert_eq!(pulled.kind(), "Service");
    assert_eq!(pulled.name(), "test");
    assert_eq!(pulled.annotation(ANNOTATION_PATH), Some("svc.yaml"));
    assert_eq!(pulled.annotation(ANNOTATION_PATH_INTERNAL), Some("svc.yaml"));

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].kind, "Service");
    assert_eq!(outcomes[0].file_path, "svc.yaml");
    assert!(outcomes[0].digest.starts_with("sha256:"));

    let diagnostics = report(&outcomes);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Info);
    assert!(diagnostics[0].message.contains("Service test"));
}

#[tokio::test]
async fn pull_merges_into_existing_resource() {
    let registry = Arc::new(StubRegistry::default());
    registry.preload_service_package();

    let filter = filter_for(&registry, "pull");
    let existing = Resource::from_yaml(
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: test\n  labels:\n    app: mine\n",
    )
    .unwrap();
    let items = vec![config_resource("pull"), existing];

    let (items, outcomes) = filter.filter(items).await.unwrap();

    // the pulled Service merged into the existing one instead of appending
    assert_eq!(items.len(), 2);
    assert_eq!(outcomes.len(), 1);

    let merged = &items[1];
    assert_eq!(merged.labels(), vec![("app".to_string(), "mine".to_string())]);
    let value = merged.to_value();
    assert_eq!(value["spec"]["ports"][0]["port"], serde_yaml::Value::from(8080));
}

#[tokio::test]
async fn push_packages_ordinary_resources_only() {
    let registry = Arc::new(StubRegistry::default());
    let filter = filter_for(&registry, "push");

    let items = vec![config_resource("push"), service("web"), deployment("web")];
    let snapshot = items.clone();

    let (items, outcomes) = filter.filter(items).await.unwrap();

    // push never drops or edits items
    assert_eq!(items, snapshot);

    // the local-config KRMPackage resource is excluded by default
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].kind, "Service");
    assert_eq!(outcomes[1].kind, "Deployment");
    assert_eq!(outcomes[0].file_path, "web-service.yaml");

    // two layers plus one config blob uploaded, one manifest pushed
    assert_eq!(registry.blobs.lock().unwrap().len(), 3);
    assert!(registry.manifest.lock().unwrap().is_some());

    let diagnostics = report(&outcomes);
    assert!(diagnostics.iter().all(|d| d.severity == Severity::Info));
}

#[tokio::test]
async fn push_includes_local_config_when_configured() {
    let registry = Arc::new(StubRegistry::default());

    let config_doc = Resource::from_yaml(
        "\
apiVersion: fn.kumorilabs.io/v1alpha1
kind: KRMPackage
metadata:
  name: test-package
  annotations:
    config.kubernetes.io/local-config: 'true'
spec:
  action: push
  package: registry.example/test-package/test:0.1.0
  includeLocalConfig: true
",
    )
    .unwrap();
    let mut config = KrmPackage::from_resource(&config_doc).unwrap();
    config.apply_defaults();
    config.validate().unwrap();
    let filter = PackageFilter::new(
        config,
        RegistryCopier::new(Box::new(StubTransport(registry.clone()))),
    );

    let items = vec![config_doc, service("web"), deployment("web")];
    let (_, outcomes) = filter.filter(items).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().any(|o| o.kind == "KRMPackage" && o.is_local_config));
}

#[tokio::test]
async fn push_skips_malformed_resources() {
    let registry = Arc::new(StubRegistry::default());
    let filter = filter_for(&registry, "push");

    let nameless = Resource::from_yaml("apiVersion: v1\nkind: Service\n").unwrap();
    let items = vec![nameless, service("web")];

    let (_, outcomes) = filter.filter(items).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].name, "web");
}

#[tokio::test]
async fn invalid_action_fails_before_any_network_call() {
    let registry = Arc::new(StubRegistry::default());

    let mut config = KrmPackage::default();
    config.spec.action = "sync".to_string();
    config.spec.package = "registry.example/test:0.1.0".to_string();

    let filter = PackageFilter::new(
        config,
        RegistryCopier::new(Box::new(StubTransport(registry.clone()))),
    );

    let err = filter.filter(vec![service("web")]).await.unwrap_err();

    assert!(err.to_string().contains("invalid action used: sync"));
    assert_eq!(registry.total_calls(), 0);
}

#[tokio::test]
async fn push_then_pull_round_trips_identity_and_path() {
    let registry = Arc::new(StubRegistry::default());

    let push = filter_for(&registry, "push");
    let pushed = vec![config_resource("push"), service("web"), deployment("api")];
    let (_, push_outcomes) = push.filter(pushed).await.unwrap();
    assert_eq!(push_outcomes.len(), 2);

    let pull = filter_for(&registry, "pull");
    let (items, pull_outcomes) = pull.filter(vec![config_resource("pull")]).await.unwrap();

    assert_eq!(pull_outcomes.len(), 2);
    assert_eq!(items.len(), 3);

    for outcome in &push_outcomes {
        let matching = items
            .iter()
            .find(|item| item.kind() == outcome.kind && item.name() == outcome.name)
            .expect("pushed resource came back");
        // the re-derived path equals the path used at push time
        assert_eq!(
            matching.annotation(ANNOTATION_PATH),
            Some(outcome.file_path.as_str())
        );
    }

    // content addressing is stable across the trip
    let pulled_digests: Vec<&str> = pull_outcomes.iter().map(|o| o.digest.as_str()).collect();
    for outcome in &push_outcomes {
        assert!(pulled_digests.contains(&outcome.digest.as_str()));
    }
}
