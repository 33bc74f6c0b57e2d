//! # krmpack Core
//!
//! Core types for the krmpack resource-packaging engine.
//!
//! This crate provides the foundational data structures shared by the rest of
//! the krmpack workspace:
//!
//! - [`Resource`] - A single KRM resource document with metadata accessors
//! - [`ResourceId`] - The `(apiVersion, kind, namespace, name)` identity
//! - [`KrmMetadata`] - Typed view of a resource's KRM metadata used for the
//!   KRM ↔ OCI annotation mapping
//! - [`KrmPackage`] - The `KRMPackage` function configuration with defaulting
//!   and validation
//!
//! ## Example
//!
//! ```rust
//! use krmpack_core::Resource;
//!
//! let resource = Resource::from_yaml(
//!     "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n",
//! )?;
//!
//! assert_eq!(resource.kind(), "Service");
//! assert_eq!(resource.name(), "web");
//! assert!(resource.is_krm());
//! # Ok::<(), krmpack_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod annotations;
pub mod config;
pub mod error;
pub mod resource;


pub use annotations::KrmMetadata;
pub use config::{ConfigError, KrmPackage, KrmPackageSpec};
pub use error::{Error, Result};
pub use resource::{Resource, ResourceId};
