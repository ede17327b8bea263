//! Core types used throughout metadata resolution
//!
//! This module contains the fundamental types that all other modules depend on:
//! the local entries being resolved, their CurseForge identifiers, failure
//! records and the error type.

pub mod error;
pub mod failure;

pub use error::{EndpointKind, MetadataError, Result};
pub use failure::{FailureKind, ResolutionFailure, OTHER_LABEL};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// CurseForge file ID, unique per downloadable artifact
pub type FileId = u32;

/// CurseForge project (mod) ID
pub type ProjectId = u32;

/// The `[update.curseforge]` section of a pack entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CurseForgeUpdate {
    pub file_id: FileId,
    pub project_id: ProjectId,
}

/// A local pack entry that needs a download URL
///
/// Owned by the caller. Resolution only ever writes the resolved URL, and only
/// once: later writes are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModReference {
    /// Display name of the entry
    pub name: String,
    /// Install path relative to the pack folder
    #[serde(alias = "dest")]
    pub destination: PathBuf,
    /// CurseForge update section, if the entry has one
    #[serde(default)]
    pub curseforge: Option<CurseForgeUpdate>,
    #[serde(skip)]
    resolved_url: Option<Url>,
}

impl ModReference {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(name: S, destination: P) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            curseforge: None,
            resolved_url: None,
        }
    }

    pub fn with_curseforge(mut self, file_id: FileId, project_id: ProjectId) -> Self {
        self.curseforge = Some(CurseForgeUpdate { file_id, project_id });
        self
    }

    /// The resolved download URL, once resolution succeeded
    pub fn resolved_url(&self) -> Option<&Url> {
        self.resolved_url.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_url.is_some()
    }

    /// Record the download URL; returns false if the entry was already resolved
    pub(crate) fn resolve(&mut self, url: Url) -> bool {
        if self.resolved_url.is_some() {
            return false;
        }
        self.resolved_url = Some(url);
        true
    }

    /// Absolute path this entry would be installed to under `pack_folder`
    pub fn destination_in(&self, pack_folder: &Path) -> PathBuf {
        let joined = pack_folder.join(&self.destination);
        std::path::absolute(&joined).unwrap_or(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_write_once() {
        let mut entry = ModReference::new("Sodium", "mods/sodium.jar").with_curseforge(10, 1);
        assert!(!entry.is_resolved());

        let first = Url::parse("https://edge.example/10/sodium.jar").unwrap();
        let second = Url::parse("https://edge.example/10/other.jar").unwrap();

        assert!(entry.resolve(first.clone()));
        assert!(!entry.resolve(second));
        assert_eq!(entry.resolved_url(), Some(&first));
    }

    #[test]
    fn test_destination_is_absolute() {
        let entry = ModReference::new("Sodium", "mods/sodium.jar");
        let dest = entry.destination_in(Path::new("pack"));
        assert!(dest.is_absolute());
        assert!(dest.ends_with("pack/mods/sodium.jar"));
    }

    #[test]
    fn test_deserialize_entry() {
        let json = r#"{
            "name": "Iris",
            "dest": "shaderpacks/iris.zip",
            "curseforge": { "file-id": 42, "project-id": 7 }
        }"#;
        let entry: ModReference = serde_json::from_str(json).unwrap();
        assert_eq!(entry.destination, PathBuf::from("shaderpacks/iris.zip"));
        assert_eq!(entry.curseforge, Some(CurseForgeUpdate { file_id: 42, project_id: 7 }));
        assert!(!entry.is_resolved());

        let bare: ModReference =
            serde_json::from_str(r#"{"name": "local", "destination": "mods/local.jar"}"#).unwrap();
        assert!(bare.curseforge.is_none());
    }
}
