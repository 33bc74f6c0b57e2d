//! # krmpack OCI
//!
//! OCI artifact engine for krmpack packages.
//!
//! This crate converts serialized KRM resources into a content-addressable
//! OCI artifact (layers + config blob + manifest) and drives the copy
//! protocol against OCI-compatible registries (Docker Registry, Harbor, ECR,
//! GCR, ghcr.io, etc.) in both directions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RegistryCopier                       │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────┐   │
//! │  │ ContentStore │  │   Manifest    │  │  Transport   │   │
//! │  │  (in-memory) │  │  (builder)    │  │  (HTTP)      │   │
//! │  └──────────────┘  └───────────────┘  └──────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                      OCI Registry
//! ```
//!
//! The transport is an explicit seam ([`RegistryTransport`]): tests
//! substitute an in-memory registry without touching process-wide settings,
//! and it is the only place network I/O happens.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod copier;
mod descriptor;
mod error;
mod manifest;
mod media_type;
mod reference;
mod store;

pub use copier::{HttpTransport, ProgressCallback, RegistryAuth, RegistryCopier, RegistryTransport};
pub use descriptor::Descriptor;
pub use error::OciError;
pub use manifest::Manifest;
pub use media_type::MediaType;
pub use reference::PackageReference;
pub use store::ContentStore;
