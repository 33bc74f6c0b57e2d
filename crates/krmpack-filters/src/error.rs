//! Error types for the filter pipeline.

use thiserror::Error;

/// Errors that can occur while running the package filter pipeline.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The configured action is neither `push` nor `pull`.
    ///
    /// Config validation rejects this before the filter runs; the filter
    /// guards again so an invalid action can never reach the registry.
    #[error("invalid action used: {action}")]
    InvalidAction {
        /// The offending action value.
        action: String,
    },

    /// A pulled layer held a number of documents other than exactly one.
    #[error("expected exactly one resource document in layer {path}, found {count}")]
    LayerDocumentCount {
        /// The layer's display path.
        path: String,
        /// Number of documents found.
        count: usize,
    },

    /// A pulled layer is not valid UTF-8.
    #[error("layer {path} is not valid UTF-8")]
    LayerEncoding {
        /// The layer's display path.
        path: String,
    },

    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] krmpack_core::ConfigError),

    /// An OCI operation failed.
    #[error(transparent)]
    Oci(#[from] krmpack_oci::OciError),

    /// A resource document could not be processed.
    #[error(transparent)]
    Resource(#[from] krmpack_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_action() {
        let err = FilterError::InvalidAction {
            action: "sync".to_string(),
        };
        assert_eq!(err.to_string(), "invalid action used: sync");
    }

    #[test]
    fn test_error_display_layer_document_count() {
        let err = FilterError::LayerDocumentCount {
            path: "svc.yaml".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "expected exactly one resource document in layer svc.yaml, found 2"
        );
    }
}
