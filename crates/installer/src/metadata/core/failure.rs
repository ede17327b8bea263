//! Failure records reported back to the caller

use std::fmt;

/// Label used for failures that concern a whole batch rather than one entry
pub const OTHER_LABEL: &str = "Other";

/// What kind of problem a `ResolutionFailure` describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Entry carries no CurseForge update section at all
    NoUpdateSection,
    /// A whole batched lookup failed (endpoints exhausted, client error, bad response)
    BatchFailed,
    /// Response contained an ID that was never requested
    UnexpectedId,
    /// A requested project never came back from the mod lookup
    MissingProject,
    /// The API returned a download URL that does not parse
    InvalidDownloadUrl,
    /// File is excluded from the API; the user has to fetch it by hand
    ManualDownload,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NoUpdateSection => "no_update_section",
            FailureKind::BatchFailed => "batch_failed",
            FailureKind::UnexpectedId => "unexpected_id",
            FailureKind::MissingProject => "missing_project",
            FailureKind::InvalidDownloadUrl => "invalid_download_url",
            FailureKind::ManualDownload => "manual_download",
        }
    }
}

/// A terminal, per-entry (or per-batch) resolution outcome that did not yield a URL
///
/// Manual downloads are expected outcomes rather than faults; use
/// [`ResolutionFailure::is_error`] to tell them apart from hard errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Entry name, file/project ID, or [`OTHER_LABEL`]
    pub label: String,
    pub message: String,
    /// Where a human can fetch the file, for manual downloads
    pub url: Option<String>,
    pub kind: FailureKind,
}

impl ResolutionFailure {
    pub fn new<L: Into<String>, M: Into<String>>(kind: FailureKind, label: L, message: M) -> Self {
        Self {
            label: label.into(),
            message: message.into(),
            url: None,
            kind,
        }
    }

    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether this is a hard error rather than a manual-download notice
    pub fn is_error(&self) -> bool {
        self.kind != FailureKind::ManualDownload
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.message)?;
        if let Some(url) = &self.url {
            write!(f, " ({})", url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_download_is_not_an_error() {
        let manual = ResolutionFailure::new(FailureKind::ManualDownload, "Foo", "download by hand")
            .with_url("https://cf/foo/files/20");
        assert!(!manual.is_error());
        assert_eq!(manual.to_string(), "Foo: download by hand (https://cf/foo/files/20)");

        let other = ResolutionFailure::new(FailureKind::BatchFailed, OTHER_LABEL, "boom");
        assert!(other.is_error());
        assert_eq!(other.url, None);
        assert_eq!(other.to_string(), "Other: boom");
    }
}
