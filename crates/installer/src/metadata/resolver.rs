//! CurseForge metadata resolution
//!
//! Turns pack entries that reference CurseForge files into download URLs.
//! The call chain flows as follows:
//!
//! CurseForgeResolver::resolve
//! ↓
//! FileGrouping (dedup entries by file ID)
//! ↓
//! CurseForgeAPI::get_files → apply_file_records (resolve or escalate)
//! ↓
//! CurseForgeAPI::get_mods → manual_download_failures (escalated entries only)
//! ↓
//! ResolutionReport (all failures, in discovery order)
//!
//! Nothing is returned as an `Err`: every problem ends up as a
//! [`ResolutionFailure`] in the report.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

use crate::metadata::api::{CurseForgeAPI, FileRecord, ModRecord};
use crate::metadata::config::CurseForgeConfig;
use crate::metadata::core::{
    FailureKind, FileId, MetadataError, ModReference, ProjectId, ResolutionFailure, Result, OTHER_LABEL,
};

/// Entries grouped by CurseForge file ID
///
/// Built once per resolution; several entries may share one file ID, but each
/// ID is requested only once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileGrouping {
    by_file: BTreeMap<FileId, Vec<usize>>,
}

impl FileGrouping {
    /// Group `entries` by file ID
    ///
    /// Entries without a CurseForge update section can't be grouped and are
    /// returned as failures instead.
    pub fn build(entries: &[ModReference]) -> (Self, Vec<ResolutionFailure>) {
        let mut by_file: BTreeMap<FileId, Vec<usize>> = BTreeMap::new();
        let mut failures = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            match entry.curseforge {
                Some(update) => by_file.entry(update.file_id).or_default().push(index),
                None => failures.push(ResolutionFailure::new(
                    FailureKind::NoUpdateSection,
                    entry.name.clone(),
                    "Failed to resolve CurseForge metadata: no CurseForge update section",
                )),
            }
        }

        (Self { by_file }, failures)
    }

    /// Distinct file IDs, ascending
    pub fn file_ids(&self) -> Vec<FileId> {
        self.by_file.keys().copied().collect()
    }

    /// Indices of the entries that reference `file_id`
    pub fn entries_for(&self, file_id: FileId) -> Option<&[usize]> {
        self.by_file.get(&file_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    fn iter(&self) -> impl Iterator<Item = (FileId, &[usize])> {
        self.by_file.iter().map(|(id, entries)| (*id, entries.as_slice()))
    }
}

/// Files that need a project lookup, keyed by project ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Escalations {
    by_project: BTreeMap<ProjectId, Vec<FileId>>,
}

impl Escalations {
    fn add(&mut self, project_id: ProjectId, file_id: FileId) {
        let files = self.by_project.entry(project_id).or_default();
        if !files.contains(&file_id) {
            files.push(file_id);
        }
    }

    /// Distinct project IDs, ascending
    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.by_project.keys().copied().collect()
    }

    pub fn files_for(&self, project_id: ProjectId) -> Option<&[FileId]> {
        self.by_project.get(&project_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_project.is_empty()
    }

    /// Total number of escalated files
    pub fn file_count(&self) -> usize {
        self.by_project.values().map(Vec::len).sum()
    }
}

/// Outcome of the file lookup stage
#[derive(Debug, Clone, Default)]
pub(crate) struct FileStage {
    pub failures: Vec<ResolutionFailure>,
    pub escalations: Escalations,
    /// Number of entries that received a download URL
    pub resolved: usize,
}

/// Everything a resolution produced besides the in-place URL writes
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    /// All failures in discovery order
    pub failures: Vec<ResolutionFailure>,
    /// Number of entries that received a download URL
    pub resolved: usize,
}

impl ResolutionReport {
    /// Failures that only ask the user to fetch a file by hand
    pub fn manual_downloads(&self) -> impl Iterator<Item = &ResolutionFailure> {
        self.failures.iter().filter(|f| !f.is_error())
    }

    /// Hard errors
    pub fn errors(&self) -> impl Iterator<Item = &ResolutionFailure> {
        self.failures.iter().filter(|f| f.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn into_failures(self) -> Vec<ResolutionFailure> {
        self.failures
    }
}

/// Resolves CurseForge pack entries into download URLs
#[derive(Debug, Clone)]
pub struct CurseForgeResolver {
    api: CurseForgeAPI,
}

impl CurseForgeResolver {
    /// Create a resolver talking to the endpoints in `config`
    ///
    /// Fails if the configuration has no API key or no usable endpoint.
    pub fn new(config: &CurseForgeConfig) -> Result<Self> {
        Ok(Self {
            api: CurseForgeAPI::new(config)?,
        })
    }

    pub fn with_api(api: CurseForgeAPI) -> Self {
        Self { api }
    }

    /// Resolve download URLs for `entries`, writing them in place
    ///
    /// `pack_folder` is only used to tell the user where manually downloaded
    /// files belong. Every entry ends up either resolved or referenced by one
    /// of the returned failures.
    pub async fn resolve(&self, entries: &mut [ModReference], pack_folder: &Path) -> ResolutionReport {
        let (grouping, mut failures) = FileGrouping::build(entries);
        debug!(
            "Resolving {} entries ({} distinct CurseForge files, {} without update section)",
            entries.len(),
            grouping.len(),
            failures.len()
        );

        if grouping.is_empty() {
            return ResolutionReport { failures, resolved: 0 };
        }

        let stage = self.resolve_files(entries, &grouping).await;
        failures.extend(stage.failures);

        if !stage.escalations.is_empty() {
            info!(
                "{} CurseForge files have no download URL, looking up their projects",
                stage.escalations.file_count()
            );
            failures.extend(
                self.resolve_manually(entries, &grouping, &stage.escalations, pack_folder)
                    .await,
            );
        }

        let report = ResolutionReport {
            failures,
            resolved: stage.resolved,
        };
        info!(
            "Resolved {} of {} CurseForge entries ({} manual downloads, {} errors)",
            report.resolved,
            entries.len(),
            report.manual_downloads().count(),
            report.errors().count()
        );
        report
    }

    /// Batched file lookup; resolves what it can and escalates the rest
    async fn resolve_files(&self, entries: &mut [ModReference], grouping: &FileGrouping) -> FileStage {
        match self.api.get_files(&grouping.file_ids()).await {
            Ok(records) => apply_file_records(entries, grouping, &records),
            Err(e) => FileStage {
                failures: vec![batch_failure(&e)],
                ..FileStage::default()
            },
        }
    }

    /// Batched project lookup for escalated files
    async fn resolve_manually(
        &self,
        entries: &[ModReference],
        grouping: &FileGrouping,
        escalations: &Escalations,
        pack_folder: &Path,
    ) -> Vec<ResolutionFailure> {
        match self.api.get_mods(&escalations.project_ids()).await {
            Ok(mods) => manual_download_failures(entries, grouping, escalations, &mods, pack_folder),
            Err(e) => vec![batch_failure(&e)],
        }
    }
}

/// One `Other` failure standing in for a whole failed batch
fn batch_failure(error: &MetadataError) -> ResolutionFailure {
    warn!("CurseForge lookup failed: {}", error.chain_message());
    ResolutionFailure::new(FailureKind::BatchFailed, OTHER_LABEL, error.chain_message())
}

/// Parse a download URL returned by the API; only http(s) is accepted
fn parse_download_url(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported scheme '{}'", scheme)),
    }
}

/// Reconcile a `/mods/files` response against the request
///
/// Writes URLs into `entries`, reports IDs we never asked for and malformed
/// URLs, and escalates files with no URL or missing from the response.
pub(crate) fn apply_file_records(entries: &mut [ModReference], grouping: &FileGrouping, records: &[FileRecord]) -> FileStage {
    let mut stage = FileStage::default();
    let mut seen = BTreeSet::new();

    for record in records {
        let Some(indices) = grouping.entries_for(record.id) else {
            stage.failures.push(ResolutionFailure::new(
                FailureKind::UnexpectedId,
                record.id.to_string(),
                format!("Failed to find file from result: ID {}, Project ID {}", record.id, record.mod_id),
            ));
            continue;
        };

        if !seen.insert(record.id) {
            debug!("Ignoring duplicate record for file {}", record.id);
            continue;
        }

        let Some(raw_url) = record.download_url.as_deref() else {
            stage.escalations.add(record.mod_id, record.id);
            continue;
        };

        match parse_download_url(raw_url) {
            Ok(url) => {
                for &index in indices {
                    let Some(entry) = entries.get_mut(index) else {
                        continue;
                    };
                    if entry.resolve(url.clone()) {
                        stage.resolved += 1;
                    }
                }
            }
            Err(e) => stage.failures.push(ResolutionFailure::new(
                FailureKind::InvalidDownloadUrl,
                record.id.to_string(),
                format!(
                    "Failed to parse URL: {} for ID {}, Project ID {}: {}",
                    raw_url, record.id, record.mod_id, e
                ),
            )),
        }
    }

    // Some file types (e.g. shaderpacks) don't show up in the API at all
    for (file_id, indices) in grouping.iter() {
        if seen.contains(&file_id) {
            continue;
        }
        let project_id = indices
            .iter()
            .find_map(|&index| entries.get(index)?.curseforge.map(|u| u.project_id));
        if let Some(project_id) = project_id {
            debug!("File {} (project {}) missing from response", file_id, project_id);
            stage.escalations.add(project_id, file_id);
        }
    }

    stage
}

/// Turn a `/mods` response into manual-download notices for escalated files
pub(crate) fn manual_download_failures(
    entries: &[ModReference],
    grouping: &FileGrouping,
    escalations: &Escalations,
    mods: &[ModRecord],
    pack_folder: &Path,
) -> Vec<ResolutionFailure> {
    let mut failures = Vec::new();
    let mut answered = BTreeSet::new();

    for record in mods {
        let Some(file_ids) = escalations.files_for(record.id) else {
            failures.push(ResolutionFailure::new(
                FailureKind::UnexpectedId,
                record.name.clone(),
                format!("Failed to find project from result: ID {}", record.id),
            ));
            continue;
        };

        if !answered.insert(record.id) {
            continue;
        }

        for &file_id in file_ids {
            let Some(indices) = grouping.entries_for(file_id) else {
                failures.push(ResolutionFailure::new(
                    FailureKind::UnexpectedId,
                    record.name.clone(),
                    format!("Failed to find file from result: file ID {}", file_id),
                ));
                continue;
            };

            let mod_url = record.manual_download_url(file_id);
            for entry in indices.iter().filter_map(|&index| entries.get(index)) {
                failures.push(
                    ResolutionFailure::new(
                        FailureKind::ManualDownload,
                        entry.name.clone(),
                        format!(
                            "This mod is excluded from the CurseForge API and must be downloaded manually.\n\
                             Please go to {} and save this file to {}",
                            mod_url,
                            entry.destination_in(pack_folder).display()
                        ),
                    )
                    .with_url(mod_url.clone()),
                );
            }
        }
    }

    for project_id in escalations.project_ids() {
        if answered.contains(&project_id) {
            continue;
        }
        for &file_id in escalations.files_for(project_id).unwrap_or_default() {
            let indices = grouping.entries_for(file_id).unwrap_or_default();
            for entry in indices.iter().filter_map(|&index| entries.get(index)) {
                failures.push(ResolutionFailure::new(
                    FailureKind::MissingProject,
                    entry.name.clone(),
                    format!(
                        "Failed to find project from result: ID {} (file ID {})",
                        project_id, file_id
                    ),
                ));
            }
        }
    }

    failures
}
