//! Package reference parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::OciError;

const GITHUB_REGISTRY: &str = "ghcr.io";
const GITHUB_URL: &str = "https://github.com";

/// A parsed package reference: registry host, repository path, and a tag or
/// digest.
///
/// # Examples
///
/// ```
/// use krmpack_oci::PackageReference;
///
/// let reference: PackageReference = "registry.example/test-package/test:0.1.0".parse()?;
/// assert_eq!(reference.registry, "registry.example");
/// assert_eq!(reference.repository, "test-package/test");
/// assert_eq!(reference.reference, "0.1.0");
/// # Ok::<(), krmpack_oci::OciError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    /// Registry host (optionally with port).
    pub registry: String,

    /// Repository path within the registry.
    pub repository: String,

    /// Tag or `sha256:<hex>` digest; defaults to `latest`.
    pub reference: String,

    /// True if `reference` is a digest rather than a tag.
    pub is_digest: bool,
}

impl PackageReference {
    /// Parses a reference of the form
    /// `host[/repository...][:tag | @sha256:digest]`.
    ///
    /// # Errors
    ///
    /// Returns [`OciError::InvalidReference`] when the reference has no
    /// repository component.
    pub fn parse(input: &str) -> Result<Self, OciError> {
        let invalid = || OciError::InvalidReference {
            reference: input.to_string(),
        };

        let (registry, rest) = input.split_once('/').ok_or_else(invalid)?;
        if registry.is_empty() || rest.is_empty() {
            return Err(invalid());
        }

        let (repository, reference, is_digest) = if let Some((repo, digest)) = rest.split_once('@')
        {
            (repo, digest.to_string(), true)
        } else {
            // a ':' after the last '/' separates the tag
            match rest.rsplit_once(':') {
                Some((repo, tag)) if !tag.contains('/') => (repo, tag.to_string(), false),
                _ => (rest, "latest".to_string(), false),
            }
        };

        if repository.is_empty() || reference.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            reference,
            is_digest,
        })
    }

    /// Returns the source URL the target registry implies, when known.
    ///
    /// Packages on `ghcr.io` point back at the GitHub owner; other
    /// registries imply no source.
    #[must_use]
    pub fn source_url(&self) -> Option<String> {
        if self.registry != GITHUB_REGISTRY {
            return None;
        }
        let owner = self.repository.split('/').next()?;
        Some(format!("{GITHUB_URL}/{owner}"))
    }
}

impl FromStr for PackageReference {
    type Err = OciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_digest {
            write!(f, "{}/{}@{}", self.registry, self.repository, self.reference)
        } else {
            write!(f, "{}/{}:{}", self.registry, self.repository, self.reference)
        }
    }
}
