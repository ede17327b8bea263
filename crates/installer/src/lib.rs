//! Installer Library
//!
//! This library resolves CurseForge-hosted pack entries into download URLs,
//! falling back to a mirror of the CurseForge API when the primary endpoint is
//! unavailable and reporting files that have to be downloaded by hand.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use packwiz_installer::{CurseForgeConfig, CurseForgeResolver, ModReference};
//! use std::path::Path;
//!
//! # async fn example() -> packwiz_installer::Result<()> {
//! // Loads CURSEFORGE_API_KEY (and optional endpoint overrides) from the environment
//! let config = CurseForgeConfig::from_env()?;
//! let resolver = CurseForgeResolver::new(&config)?;
//!
//! let mut entries = vec![
//!     ModReference::new("Sodium", "mods/sodium.jar").with_curseforge(4_567_890, 394_468),
//!     ModReference::new("Complementary Shaders", "shaderpacks/complementary.zip")
//!         .with_curseforge(4_912_345, 627_557),
//! ];
//!
//! let report = resolver.resolve(&mut entries, Path::new("pack")).await;
//!
//! for entry in &entries {
//!     if let Some(url) = entry.resolved_url() {
//!         println!("{} -> {}", entry.name, url);
//!     }
//! }
//! for failure in &report.failures {
//!     println!("{}", failure);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Batched lookups**: one `/mods/files` request for all distinct file IDs
//! - **Mirror fallback**: server and network errors move on to the next endpoint, client errors don't
//! - **Response reconciliation**: unexpected IDs and malformed URLs are reported per file
//! - **Manual downloads**: files excluded from the API are reported with their project page and install path

pub mod metadata;

// Re-export commonly used types for convenience
pub use metadata::{
    CurseForgeConfig, CurseForgeResolver, FailureKind, MetadataError, ModReference,
    ResolutionFailure, ResolutionReport, Result,
};
