//! Registry copy protocol.
//!
//! This module drives the OCI distribution API between the in-memory
//! [`ContentStore`] and a remote registry, in both directions. All network
//! I/O funnels through the [`RegistryTransport`] trait so tests can
//! substitute an in-memory registry.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::descriptor::Descriptor;
use crate::error::OciError;
use crate::manifest::Manifest;
use crate::media_type::MediaType;
use crate::reference::PackageReference;
use crate::store::ContentStore;

/// Callback invoked once per transferred blob with the short digest and the
/// blob's display path.
pub type ProgressCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Authentication methods for registry access.
///
/// Credentials are supplied externally (environment, CLI); the engine never
/// discovers them itself.
#[derive(Debug, Clone)]
pub enum RegistryAuth {
    /// No authentication (public registries, local development).
    Anonymous,

    /// Basic authentication (username/password or username/token).
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// Bearer token authentication.
    Bearer {
        /// Token value.
        token: String,
    },
}

impl RegistryAuth {
    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }
}

/// Low-level registry operations.
///
/// The single seam where the engine touches the network; everything above it
/// is pure in-memory transformation.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Fetches the raw manifest bytes for a reference.
    async fn fetch_manifest(&self, reference: &PackageReference) -> Result<Vec<u8>, OciError>;

    /// Fetches a blob by digest.
    async fn fetch_blob(
        &self,
        reference: &PackageReference,
        digest: &str,
    ) -> Result<Vec<u8>, OciError>;

    /// Uploads a blob under its digest.
    async fn upload_blob(
        &self,
        reference: &PackageReference,
        digest: &str,
        bytes: &[u8],
    ) -> Result<(), OciError>;

    /// Pushes raw manifest bytes under the reference's tag or digest.
    async fn push_manifest(
        &self,
        reference: &PackageReference,
        bytes: &[u8],
    ) -> Result<(), OciError>;
}

/// HTTP implementation of [`RegistryTransport`] over the OCI distribution
/// API.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    auth: RegistryAuth,
}

impl HttpTransport {
    /// Creates a transport with the given authentication and request
    /// timeout.
    ///
    /// The timeout is the only cancellation mechanism: on expiry a request
    /// fails with [`OciError::Timeout`] rather than hanging.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(auth: RegistryAuth, timeout: Duration) -> Result<Self, OciError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("krmpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OciError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self { http, auth })
    }

    fn base_url(reference: &PackageReference) -> String {
        format!("https://{}", reference.registry)
    }

    fn auth_headers(&self) -> Result<HeaderMap, OciError> {
        let mut headers = HeaderMap::new();

        let value = match &self.auth {
            RegistryAuth::Anonymous => return Ok(headers),
            RegistryAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                format!("Basic {credentials}")
            }
            RegistryAuth::Bearer { token } => format!("Bearer {token}"),
        };

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&value).map_err(|_| OciError::Transport {
                message: "invalid registry credentials".to_string(),
            })?,
        );

        Ok(headers)
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn fetch_manifest(&self, reference: &PackageReference) -> Result<Vec<u8>, OciError> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            Self::base_url(reference),
            reference.repository,
            reference.reference
        );

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .header(ACCEPT, MediaType::OCI_MANIFEST)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(OciError::NotFound {
                reference: reference.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(OciError::Transport {
                message: format!(
                    "{}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_blob(
        &self,
        reference: &PackageReference,
        digest: &str,
    ) -> Result<Vec<u8>, OciError> {
        let url = format!(
            "{}/v2/{}/blobs/{digest}",
            Self::base_url(reference),
            reference.repository
        );

        let response = self.http.get(&url).headers(self.auth_headers()?).send().await?;

        if response.status().as_u16() == 404 {
            return Err(OciError::NotFound {
                reference: digest.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(OciError::Transport {
                message: format!(
                    "{}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_blob(
        &self,
        reference: &PackageReference,
        digest: &str,
        bytes: &[u8],
    ) -> Result<(), OciError> {
        let start_url = format!(
            "{}/v2/{}/blobs/uploads/",
            Self::base_url(reference),
            reference.repository
        );

        let response = self
            .http
            .post(&start_url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        if !response.status().is_success() && response.status().as_u16() != 202 {
            return Err(OciError::Upload {
                digest: digest.to_string(),
                message: format!("failed to start upload: {}", response.status()),
            });
        }

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| OciError::Upload {
                digest: digest.to_string(),
                message: "no upload location returned".to_string(),
            })?;

        let upload_url = if location.contains('?') {
            format!("{location}&digest={digest}")
        } else {
            format!("{location}?digest={digest}")
        };
        // relative upload locations are resolved against the registry host
        let upload_url = if upload_url.starts_with('/') {
            format!("{}{upload_url}", Self::base_url(reference))
        } else {
            upload_url
        };

        let response = self
            .http
            .put(&upload_url)
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() && response.status().as_u16() != 201 {
            return Err(OciError::Upload {
                digest: digest.to_string(),
                message: format!("failed to upload blob: {}", response.status()),
            });
        }

        Ok(())
    }

    async fn push_manifest(
        &self,
        reference: &PackageReference,
        bytes: &[u8],
    ) -> Result<(), OciError> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            Self::base_url(reference),
            reference.repository,
            reference.reference
        );

        let response = self
            .http
            .put(&url)
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, MediaType::OCI_MANIFEST)
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() && response.status().as_u16() != 201 {
            return Err(OciError::Rejected {
                reference: reference.to_string(),
                message: format!(
                    "{}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        Ok(())
    }
}

/// Drives the copy protocol between a [`ContentStore`] and a registry.
pub struct RegistryCopier {
    transport: Box<dyn RegistryTransport>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for RegistryCopier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCopier")
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl RegistryCopier {
    /// Creates a copier over the given transport.
    #[must_use]
    pub fn new(transport: Box<dyn RegistryTransport>) -> Self {
        Self {
            transport,
            progress: None,
        }
    }

    /// Registers a per-blob progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, descriptor: &Descriptor, fallback: &str) {
        if let Some(progress) = &self.progress {
            progress(
                descriptor.digest_prefix(),
                descriptor.title().unwrap_or(fallback),
            );
        }
    }

    /// Transfers the config blob, every layer blob, and the manifest to the
    /// registry.
    ///
    /// The manifest is pushed last, so the package either becomes fully
    /// resolvable under the reference or not at all.
    ///
    /// # Errors
    ///
    /// Fails with [`OciError::MissingBlob`] if the manifest references
    /// content absent from the store, [`OciError::Transport`] /
    /// [`OciError::Timeout`] on network failure, and [`OciError::Rejected`]
    /// if the registry refuses the manifest.
    pub async fn push(
        &self,
        store: &ContentStore,
        manifest: &Manifest,
        reference: &PackageReference,
    ) -> Result<(), OciError> {
        let mut blobs = vec![&manifest.config];
        blobs.extend(manifest.layers.iter());

        for descriptor in blobs {
            let bytes = store
                .get(&descriptor.digest)
                .ok_or_else(|| OciError::MissingBlob {
                    digest: descriptor.digest.clone(),
                })?;

            self.transport
                .upload_blob(reference, &descriptor.digest, bytes)
                .await?;
            self.report(descriptor, "config");
            tracing::debug!(digest = %descriptor.digest, "uploaded blob");
        }

        let manifest_bytes = manifest.to_bytes()?;
        self.transport
            .push_manifest(reference, &manifest_bytes)
            .await?;

        tracing::info!(
            reference = %reference,
            digest = %ContentStore::digest(&manifest_bytes),
            layers = manifest.layers.len(),
            "pushed package manifest"
        );

        Ok(())
    }

    /// Fetches a manifest and the blobs whose media type is allowed.
    ///
    /// Unknown layer media types are silently skipped: the packaging format
    /// is extensible and foreign layers must not abort the pull. Fetched
    /// content is verified against its declared digest.
    ///
    /// # Errors
    ///
    /// Fails with [`OciError::Decode`] on a malformed manifest,
    /// [`OciError::DigestMismatch`] on corrupted content, and transport
    /// errors as for [`push`](Self::push).
    pub async fn pull(
        &self,
        reference: &PackageReference,
        allowed: &[MediaType],
    ) -> Result<(Manifest, ContentStore), OciError> {
        let manifest_bytes = self.transport.fetch_manifest(reference).await?;
        let manifest = Manifest::from_bytes(&manifest_bytes)?;

        let mut store = ContentStore::new();

        let mut descriptors = vec![&manifest.config];
        descriptors.extend(manifest.layers.iter());

        for descriptor in descriptors {
            if !descriptor.media_type.is_allowed_by(allowed) {
                tracing::debug!(
                    media_type = %descriptor.media_type,
                    digest = %descriptor.digest,
                    "skipping layer with foreign media type"
                );
                continue;
            }

            let bytes = self
                .transport
                .fetch_blob(reference, &descriptor.digest)
                .await?;

            let actual = ContentStore::digest(&bytes);
            if actual != descriptor.digest {
                return Err(OciError::DigestMismatch {
                    expected: descriptor.digest.clone(),
                    actual,
                });
            }

            store.insert(descriptor, bytes);
            self.report(descriptor, "config");
        }

        tracing::info!(
            reference = %reference,
            layers = manifest.layers.len(),
            fetched = store.len(),
            "pulled package manifest"
        );

        Ok((manifest, store))
    }
}
