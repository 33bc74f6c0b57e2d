//! `KRMPackage` function configuration.
//!
//! The packaging pipeline is driven by a single `KRMPackage` resource
//! (`fn.kumorilabs.io/v1alpha1`). This module decodes it, fills defaults,
//! and validates it before any I/O happens.

use serde::Deserialize;
use thiserror::Error;

use crate::resource::Resource;

/// The kind of the function configuration resource.
pub const KRM_PACKAGE_KIND: &str = "KRMPackage";
/// The apiVersion of the function configuration resource.
pub const KRM_PACKAGE_API_VERSION: &str = "fn.kumorilabs.io/v1alpha1";

/// The `push` action: package resources and publish them.
pub const ACTION_PUSH: &str = "push";
/// The `pull` action: retrieve a package and merge it into the working set.
pub const ACTION_PULL: &str = "pull";
/// The action used when none is declared.
pub const ACTION_DEFAULT: &str = ACTION_PULL;

/// Conventional platform labels. Informational only; any value is accepted.
pub const PLATFORMS: [&str; 3] = ["eks", "aks", "gke"];

const ACTIONS: [&str; 2] = [ACTION_PUSH, ACTION_PULL];

/// Errors produced while decoding or validating a `KRMPackage` config.
///
/// All variants are fatal and surface before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent or empty.
    #[error("KRMPackage resource is missing [{field}] key")]
    MissingField {
        /// The missing key.
        field: &'static str,
    },

    /// A key holds a value outside its allowed set or pattern.
    #[error("KRMPackage resource [{field}] key is invalid. Current value: [{value}]. {hint}")]
    InvalidValue {
        /// The offending key.
        field: &'static str,
        /// The value found.
        value: String,
        /// What valid values look like.
        hint: String,
    },

    /// The resource could not be decoded into the config schema.
    #[error("failed to decode KRMPackage config: {source}")]
    Decode {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// The `spec` block of a `KRMPackage` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KrmPackageSpec {
    /// Declared action: `push` or `pull`. Defaults to `pull`.
    pub action: String,
    /// Optional relative subpath filter for pulled resources.
    pub path: String,
    /// Registry reference the package is pushed to / pulled from.
    pub package: String,
    /// Free-form platform label, recorded on the manifest.
    pub platform: String,
    /// Flatten resources onto one file per apiVersion/kind/name.
    pub gvkn_file_names: Option<bool>,
    /// Collapse all output into a single file.
    pub single_file_output: Option<bool>,
    /// Merge pulled resources into identity-equal existing ones.
    pub resource_merge: Option<bool>,
    /// Package local-config resources on push.
    pub include_local_config: Option<bool>,
}

/// A decoded `KRMPackage` function configuration.
///
/// # Examples
///
/// ```rust
/// use krmpack_core::{KrmPackage, Resource};
///
/// let resource = Resource::from_yaml(
///     "\
/// apiVersion: fn.kumorilabs.io/v1alpha1
/// kind: KRMPackage
/// metadata:
///   name: test-package
/// spec:
///   package: registry.example/test:0.1.0
/// ",
/// )?;
///
/// let mut config = KrmPackage::from_resource(&resource)?;
/// config.apply_defaults();
/// config.validate()?;
///
/// assert_eq!(config.action(), "pull");
/// assert!(config.resource_merge());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KrmPackage {
    /// Resource apiVersion.
    pub api_version: String,
    /// Resource kind.
    pub kind: String,
    /// The configuration spec.
    pub spec: KrmPackageSpec,
}

impl KrmPackage {
    /// Decodes a `KRMPackage` config from its resource document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] if the document does not fit the
    /// config schema.
    pub fn from_resource(resource: &Resource) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_value(resource.to_value())?)
    }

    /// Fills absent values with their defaults.
    pub fn apply_defaults(&mut self) {
        if self.spec.action.is_empty() {
            self.spec.action = ACTION_DEFAULT.to_string();
        }
        self.spec.resource_merge.get_or_insert(true);
        self.spec.gvkn_file_names.get_or_insert(true);
        self.spec.include_local_config.get_or_insert(false);
        self.spec.single_file_output.get_or_insert(false);
    }

    /// Validates the configuration.
    ///
    /// Must run after [`apply_defaults`](Self::apply_defaults) and before any
    /// I/O: an invalid config never reaches the registry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spec.action.is_empty() {
            return Err(ConfigError::MissingField { field: "action" });
        }
        if !ACTIONS.contains(&self.spec.action.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "action",
                value: self.spec.action.clone(),
                hint: format!("Valid values are: {}", ACTIONS.join(", ")),
            });
        }

        if !self.spec.path.is_empty() && !is_valid_relative_path(&self.spec.path) {
            return Err(ConfigError::InvalidValue {
                field: "path",
                value: self.spec.path.clone(),
                hint: "Value must be a valid relative path (no slash at the end or beginning), \
                       examples: foo/bar, foo"
                    .to_string(),
            });
        }

        if self.spec.package.is_empty() {
            return Err(ConfigError::MissingField { field: "package" });
        }

        Ok(())
    }

    /// Returns the effective action.
    #[must_use]
    pub fn action(&self) -> &str {
        if self.spec.action.is_empty() {
            ACTION_DEFAULT
        } else {
            &self.spec.action
        }
    }

    /// Returns whether pulled resources merge into identity-equal ones.
    #[must_use]
    pub fn resource_merge(&self) -> bool {
        self.spec.resource_merge.unwrap_or(true)
    }

    /// Returns whether output files are named after apiVersion/kind/name.
    #[must_use]
    pub fn gvkn_file_names(&self) -> bool {
        self.spec.gvkn_file_names.unwrap_or(true)
    }

    /// Returns whether all output collapses into one file.
    #[must_use]
    pub fn single_file_output(&self) -> bool {
        self.spec.single_file_output.unwrap_or(false)
    }

    /// Returns whether local-config resources are packaged on push.
    #[must_use]
    pub fn include_local_config(&self) -> bool {
        self.spec.include_local_config.unwrap_or(false)
    }
}

/// Checks a relative path made of lowercase alphanumeric segments separated
/// by `/`, where segments may contain interior `-` but never start or end
/// with one. Equivalent to
/// `^[a-z0-9]([a-z0-9-]*[a-z0-9])?(/[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$`.
fn is_valid_relative_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('/').all(|segment| {
            !segment.is_empty()
                && !segment.starts_with('-')
                && !segment.ends_with('-')
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}
