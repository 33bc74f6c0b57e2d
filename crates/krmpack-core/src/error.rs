//! Error types for the krmpack resource model.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing resource documents.
#[derive(Debug, Error)]
pub enum Error {
    /// A document could not be parsed or serialized as YAML.
    #[error("failed to process resource document: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// A document was parsed but is not a YAML mapping.
    #[error("resource document is not a mapping")]
    NotAMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_a_mapping() {
        let err = Error::NotAMapping;
        assert_eq!(err.to_string(), "resource document is not a mapping");
    }

    #[test]
    fn test_error_display_yaml() {
        let err = serde_yaml::from_str::<serde_yaml::Value>(": : :").unwrap_err();
        let err = Error::from(err);
        assert!(err.to_string().starts_with("failed to process resource"));
    }
}
