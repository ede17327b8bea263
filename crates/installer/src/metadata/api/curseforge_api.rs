//! CurseForge API client
//!
//! Typed request/response schemas for the two batched lookups the resolver
//! needs, on top of the mirror-aware [`FallbackExecutor`]:
//! - `POST /mods/files` with `{ "fileIds": [...] }`
//! - `POST /mods` with `{ "modIds": [...] }`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metadata::config::CurseForgeConfig;
use crate::metadata::core::{FileId, MetadataError, ProjectId, Result};
use crate::metadata::fallback::{FallbackExecutor, FallbackResponse};

pub const GET_FILES_PATH: &str = "/mods/files";
pub const GET_MODS_PATH: &str = "/mods";

pub const FILE_DATA_OPERATION: &str = "file data";
pub const MOD_DATA_OPERATION: &str = "mod data";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetFilesRequest<'a> {
    file_ids: &'a [FileId],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetModsRequest<'a> {
    mod_ids: &'a [ProjectId],
}

/// `{ "data": [...] }` envelope shared by both endpoints
#[derive(Debug, Clone, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

/// A file as returned by `/mods/files`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub mod_id: ProjectId,
    /// Absent when the author disallowed third-party downloads
    #[serde(default)]
    pub download_url: Option<String>,
}

/// A project as returned by `/mods`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModRecord {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub links: Option<ModLinks>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModLinks {
    #[serde(default)]
    pub website_url: String,
}

impl ModRecord {
    /// Project page URL, or an empty string if the API omitted it
    pub fn website_url(&self) -> &str {
        self.links.as_ref().map(|l| l.website_url.as_str()).unwrap_or("")
    }

    /// Page where a human can download `file_id` by hand
    ///
    /// `websiteUrl` is used verbatim, as the API returns it.
    pub fn manual_download_url(&self, file_id: FileId) -> String {
        format!("{}/files/{}", self.website_url(), file_id)
    }
}

/// CurseForge API client
#[derive(Debug, Clone)]
pub struct CurseForgeAPI {
    executor: FallbackExecutor,
}

impl CurseForgeAPI {
    /// Create a client with a reqwest transport built from `config`
    pub fn new(config: &CurseForgeConfig) -> Result<Self> {
        Ok(Self {
            executor: FallbackExecutor::new(config)?,
        })
    }

    pub fn with_executor(executor: FallbackExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &FallbackExecutor {
        &self.executor
    }

    /// Look up a batch of files by ID
    pub async fn get_files(&self, file_ids: &[FileId]) -> Result<Vec<FileRecord>> {
        let request = GetFilesRequest { file_ids };
        let response = self
            .executor
            .execute(GET_FILES_PATH, &request, FILE_DATA_OPERATION)
            .await?;

        let files: Vec<FileRecord> = parse_data(&response, FILE_DATA_OPERATION)?;
        debug!("CurseForge returned {} of {} requested files", files.len(), file_ids.len());
        Ok(files)
    }

    /// Look up a batch of projects by ID
    pub async fn get_mods(&self, mod_ids: &[ProjectId]) -> Result<Vec<ModRecord>> {
        let request = GetModsRequest { mod_ids };
        let response = self
            .executor
            .execute(GET_MODS_PATH, &request, MOD_DATA_OPERATION)
            .await?;

        let mods: Vec<ModRecord> = parse_data(&response, MOD_DATA_OPERATION)?;
        debug!("CurseForge returned {} of {} requested projects", mods.len(), mod_ids.len());
        Ok(mods)
    }
}

fn parse_data<T: DeserializeOwned>(response: &FallbackResponse, operation: &str) -> Result<Vec<T>> {
    let envelope: DataEnvelope<T> =
        serde_json::from_slice(&response.response.body).map_err(|e| MetadataError::MalformedResponse {
            operation: operation.to_string(),
            url: response.url.clone(),
            source: e,
        })?;
    Ok(envelope.data)
}
