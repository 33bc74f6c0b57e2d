//! In-memory content-addressable blob store.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::descriptor::{Descriptor, ANNOTATION_TITLE};
use crate::media_type::MediaType;

/// An in-memory content-addressable store of blobs keyed by digest.
///
/// The store computes and owns every digest: content-addressing makes
/// re-adding identical bytes idempotent, so a store never holds two copies
/// of the same content. A store lives for exactly one push or pull
/// invocation and is never shared across them.
///
/// # Examples
///
/// ```
/// use krmpack_oci::{ContentStore, MediaType};
///
/// let mut store = ContentStore::new();
/// let desc = store.add_layer(
///     "svc.yaml",
///     MediaType::for_resource("v1", "Service"),
///     b"apiVersion: v1\n".to_vec(),
/// );
///
/// assert!(store.contains(&desc.digest));
/// assert_eq!(desc.title(), Some("svc.yaml"));
/// ```
#[derive(Debug, Default)]
pub struct ContentStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl ContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the `sha256:<hex>` digest of a byte slice.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Content-addresses `bytes` as a layer and records `path` as its
    /// display title.
    ///
    /// Idempotent: adding identical bytes returns a descriptor with the same
    /// digest without duplicating storage.
    pub fn add_layer(&mut self, path: &str, media_type: MediaType, bytes: Vec<u8>) -> Descriptor {
        let digest = Self::digest(&bytes);
        let size = bytes.len() as u64;
        self.blobs.entry(digest.clone()).or_insert(bytes);

        Descriptor::new(media_type, digest, size).with_annotation(ANNOTATION_TITLE, path)
    }

    /// Stores the canonical empty config blob (`{}`) and returns its
    /// descriptor.
    pub fn set_config(&mut self) -> Descriptor {
        let bytes = b"{}".to_vec();
        let digest = Self::digest(&bytes);
        let size = bytes.len() as u64;
        self.blobs.entry(digest.clone()).or_insert(bytes);

        Descriptor::new(MediaType::config(), digest, size)
    }

    /// Inserts already-described content (pull side).
    pub fn insert(&mut self, descriptor: &Descriptor, bytes: Vec<u8>) {
        self.blobs.entry(descriptor.digest.clone()).or_insert(bytes);
    }

    /// Returns the bytes stored under a digest.
    #[must_use]
    pub fn get(&self, digest: &str) -> Option<&[u8]> {
        self.blobs.get(digest).map(Vec::as_slice)
    }

    /// Returns true if the store holds content for a digest.
    #[must_use]
    pub fn contains(&self, digest: &str) -> bool {
        self.blobs.contains_key(digest)
    }

    /// Number of distinct blobs stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
