//! Error types for OCI artifact operations.

use thiserror::Error;

/// Errors that can occur while building, pushing, or pulling packages.
#[derive(Debug, Error)]
pub enum OciError {
    /// A manifest or blob could not be decoded.
    #[error("failed to decode manifest: {reason}")]
    Decode {
        /// Why decoding failed.
        reason: String,
    },

    /// The registry could not be reached or refused the connection.
    #[error("registry transport error: {message}")]
    Transport {
        /// Underlying failure description.
        message: String,
    },

    /// The registry rejected a pushed manifest.
    #[error("registry rejected manifest for {reference}: {message}")]
    Rejected {
        /// The package reference being pushed.
        reference: String,
        /// Registry response.
        message: String,
    },

    /// A registry request exceeded its deadline.
    #[error("registry request timed out: {message}")]
    Timeout {
        /// Underlying failure description.
        message: String,
    },

    /// The requested manifest or blob does not exist.
    #[error("not found in registry: {reference}")]
    NotFound {
        /// The missing reference or digest.
        reference: String,
    },

    /// Fetched content does not match its declared digest.
    #[error("digest mismatch for {expected}: content hashes to {actual}")]
    DigestMismatch {
        /// The digest declared by the manifest.
        expected: String,
        /// The digest of the fetched bytes.
        actual: String,
    },

    /// A blob upload failed.
    #[error("failed to upload blob {digest}: {message}")]
    Upload {
        /// Digest of the blob.
        digest: String,
        /// Registry response.
        message: String,
    },

    /// A manifest references a blob absent from the content store.
    #[error("manifest references blob {digest} missing from the content store")]
    MissingBlob {
        /// The missing digest.
        digest: String,
    },

    /// A package reference string could not be parsed.
    #[error("invalid package reference: {reference}")]
    InvalidReference {
        /// The offending reference.
        reference: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    Json {
        /// Underlying error.
        #[from]
        source: serde_json::Error,
    },
}

impl From<reqwest::Error> for OciError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}
