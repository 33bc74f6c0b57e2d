//! # krmpack Filters
//!
//! Resource-list transforms for the krmpack pipeline.
//!
//! The central piece is the [`PackageFilter`] orchestrator: given a validated
//! `KRMPackage` configuration and a registry copier it either packages the
//! working set into an OCI artifact (push) or retrieves one and merges it
//! into the working set (pull). The remaining filters are small, composable
//! per-resource transforms the host chains before or after the package step:
//!
//! - [`MergeFilter`] - identity-keyed union of duplicate resources
//! - [`LocalConfigFilter`] - selects resources eligible for packaging
//! - [`GvknFileNameFilter`] / [`SingleFileFilter`] - file placement renaming
//! - [`PathFilter`] / [`SetPathFilter`] - path-prefix selection and re-rooting
//!
//! Every filter is stateless and reentrant; outcomes are returned as values
//! rather than accumulated on the filter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod file_name;
pub mod local_config;
pub mod merge;
pub mod package;
pub mod path;
pub mod report;

pub use error::FilterError;
pub use file_name::{GvknFileNameFilter, SingleFileFilter};
pub use local_config::LocalConfigFilter;
pub use merge::MergeFilter;
pub use package::PackageFilter;
pub use path::{PathFilter, SetPathFilter};
pub use report::{report, Diagnostic, PackageOutcome, Severity};
