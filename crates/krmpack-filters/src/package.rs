//! The package filter: push and pull orchestration.

use std::collections::BTreeMap;

use krmpack_core::annotations::{
    apply_pulled_path, strip_internal_annotations, ANNOTATION_IMAGE_SOURCE, ANNOTATION_PATH,
    ANNOTATION_PLATFORM,
};
use krmpack_core::config::{ACTION_PULL, ACTION_PUSH};
use krmpack_core::{KrmMetadata, KrmPackage, Resource};
use krmpack_oci::{ContentStore, Manifest, MediaType, PackageReference, RegistryCopier};

use crate::error::FilterError;
use crate::local_config::LocalConfigFilter;
use crate::merge::MergeFilter;
use crate::report::PackageOutcome;

/// The entry point of the packaging engine.
///
/// Given a validated [`KrmPackage`] configuration and a [`RegistryCopier`],
/// either packages the working set into an OCI artifact (push) or retrieves
/// one and merges it into the working set (pull). Filters run strictly
/// sequentially; the content store lives for exactly one invocation.
#[derive(Debug)]
pub struct PackageFilter {
    config: KrmPackage,
    copier: RegistryCopier,
}

impl PackageFilter {
    /// Creates a filter for a configuration and copier.
    #[must_use]
    pub fn new(config: KrmPackage, copier: RegistryCopier) -> Self {
        Self { config, copier }
    }

    /// Runs the configured action over the working set.
    ///
    /// Returns the (possibly extended) item list plus one outcome per
    /// processed resource. On push the input list is returned unmodified:
    /// pushing only reads.
    ///
    /// # Errors
    ///
    /// Fails without touching the registry on an invalid action; otherwise
    /// propagates decode and transport errors, which abort the whole
    /// invocation.
    pub async fn filter(
        &self,
        items: Vec<Resource>,
    ) -> Result<(Vec<Resource>, Vec<PackageOutcome>), FilterError> {
        match self.config.action() {
            ACTION_PULL => self.pull(items).await,
            ACTION_PUSH => {
                let outcomes = self.push(&items).await?;
                Ok((items, outcomes))
            }
            other => Err(FilterError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }

    async fn pull(
        &self,
        mut items: Vec<Resource>,
    ) -> Result<(Vec<Resource>, Vec<PackageOutcome>), FilterError> {
        let reference = self.reference()?;
        let allowed = [MediaType::krm(), MediaType::config()];
        let (manifest, store) = self.copier.pull(&reference, &allowed).await?;

        let mut outcomes = Vec::new();
        for layer in manifest.krm_layers() {
            // media types outside the allow-list were never fetched
            let Some(bytes) = store.get(&layer.digest) else {
                continue;
            };

            let path = layer.title().unwrap_or_default().to_string();
            let text = std::str::from_utf8(bytes).map_err(|_| FilterError::LayerEncoding {
                path: path.clone(),
            })?;

            let mut documents = Resource::parse_all(text)?;
            if documents.len() != 1 {
                return Err(FilterError::LayerDocumentCount {
                    path,
                    count: documents.len(),
                });
            }
            let Some(mut resource) = documents.pop() else {
                continue;
            };

            apply_pulled_path(&mut resource, &path);

            let mut outcome = self.outcome_for(&resource);
            outcome.digest = layer.digest.clone();
            outcome.file_path = path;
            outcomes.push(outcome);

            items.push(resource);
        }

        let items = if self.config.resource_merge() {
            MergeFilter.filter(items)
        } else {
            items
        };

        Ok((items, outcomes))
    }

    async fn push(&self, items: &[Resource]) -> Result<Vec<PackageOutcome>, FilterError> {
        let reference = self.reference()?;
        let selected = LocalConfigFilter {
            include_local_config: self.config.include_local_config(),
        }
        .select(items);

        let mut store = ContentStore::new();
        let mut layers = Vec::new();
        let mut outcomes = Vec::new();

        for item in selected {
            // packaging is best-effort over a heterogeneous set
            if !item.is_krm() {
                tracing::debug!(id = %item.id(), "skipping malformed resource");
                continue;
            }

            let mut push_item = item.clone();

            let path = push_item
                .annotation(ANNOTATION_PATH)
                .map_or_else(
                    || {
                        format!(
                            "{}-{}.yaml",
                            push_item.name(),
                            push_item.kind().to_lowercase()
                        )
                    },
                    ToString::to_string,
                );

            strip_internal_annotations(&mut push_item);

            let bytes = match push_item.to_yaml() {
                Ok(bytes) => bytes,
                Err(err) => {
                    let mut outcome = self.outcome_for(&push_item);
                    outcome.file_path = path;
                    outcome.error = Some(err.to_string());
                    outcomes.push(outcome);
                    continue;
                }
            };

            let media_type =
                MediaType::for_resource(push_item.api_version(), push_item.kind());
            let mut descriptor = store.add_layer(&path, media_type, bytes.into_bytes());
            descriptor
                .annotations
                .extend(KrmMetadata::from_resource(&push_item).descriptor_annotations());

            let mut outcome = self.outcome_for(&push_item);
            outcome.digest = descriptor.digest.clone();
            outcome.file_path = path;
            outcomes.push(outcome);

            layers.push(descriptor);
        }

        let config_descriptor = store.set_config();
        let manifest = Manifest::new(
            config_descriptor,
            self.package_annotations(&reference),
            layers,
        );

        self.copier.push(&store, &manifest, &reference).await?;

        Ok(outcomes)
    }

    fn reference(&self) -> Result<PackageReference, FilterError> {
        Ok(PackageReference::parse(&self.config.spec.package)?)
    }

    fn package_annotations(&self, reference: &PackageReference) -> BTreeMap<String, String> {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            ANNOTATION_PLATFORM.to_string(),
            self.config.spec.platform.clone(),
        );
        if let Some(source) = reference.source_url() {
            annotations.insert(ANNOTATION_IMAGE_SOURCE.to_string(), source);
        }
        annotations
    }

    fn outcome_for(&self, resource: &Resource) -> PackageOutcome {
        PackageOutcome::for_resource(
            resource,
            self.config.action(),
            self.config.spec.package.clone(),
            self.config.spec.platform.clone(),
        )
    }
}
