//! Outcome records and diagnostic reporting.

use krmpack_core::Resource;

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational record for a successfully processed resource.
    Info,
    /// A resource or the whole invocation failed.
    Error,
}

/// A severity-tagged diagnostic record for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Record severity.
    pub severity: Severity,
}

impl Diagnostic {
    /// Creates an informational diagnostic.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    /// Creates an error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

/// The per-resource outcome of a push or pull.
///
/// Created once per processed resource and never mutated afterwards; read
/// only by [`report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    /// The action that produced this outcome.
    pub action: String,
    /// The package reference operated on.
    pub package: String,
    /// The configured platform label.
    pub platform: String,
    /// Content digest of the resource's layer (empty on failure).
    pub digest: String,
    /// File path associated with the resource.
    pub file_path: String,
    /// Resource apiVersion.
    pub api_version: String,
    /// Resource kind.
    pub kind: String,
    /// Resource name.
    pub name: String,
    /// True if the resource is local configuration.
    pub is_local_config: bool,
    /// Failure description, if the resource could not be processed.
    pub error: Option<String>,
}

impl PackageOutcome {
    /// Builds an outcome for a resource processed under the given package.
    #[must_use]
    pub fn for_resource(
        resource: &Resource,
        action: impl Into<String>,
        package: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            package: package.into(),
            platform: platform.into(),
            digest: String::new(),
            file_path: String::new(),
            api_version: resource.api_version().to_string(),
            kind: resource.kind().to_string(),
            name: resource.name().to_string(),
            is_local_config: resource.is_local_config(),
            error: None,
        }
    }

    /// Returns the conventional 12-character short digest.
    #[must_use]
    pub fn short_digest(&self) -> &str {
        let value = self
            .digest
            .split_once(':')
            .map_or(self.digest.as_str(), |(_, v)| v);
        &value[..value.len().min(12)]
    }
}

/// Converts outcomes into diagnostic records.
///
/// Every invocation yields at least one record: when nothing was processed
/// the list holds exactly one informational "no results" entry, so callers
/// never have to special-case an empty list.
#[must_use]
pub fn report(outcomes: &[PackageOutcome]) -> Vec<Diagnostic> {
    if outcomes.is_empty() {
        return vec![Diagnostic::info("no results")];
    }

    outcomes
        .iter()
        .map(|outcome| match &outcome.error {
            Some(error) => Diagnostic::error(format!("failed to package resources: {error}")),
            None => Diagnostic::info(format!(
                "{} {} {} {}",
                outcome.short_digest(),
                outcome.package,
                outcome.kind,
                outcome.name
            )),
        })
        .collect()
}
