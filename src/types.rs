//! Run results

use serde::Serialize;
use std::path::PathBuf;

/// What happened to one artifact URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    /// Fetched and committed to `path`
    Downloaded {
        /// Final artifact path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },
    /// A file already existed at `path`
    Skipped {
        /// Existing artifact path
        path: PathBuf,
    },
}

/// A committed download
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadedArtifact {
    /// Final artifact path
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// Totals for the download phase
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    /// Artifacts fetched during this run
    pub downloaded: Vec<DownloadedArtifact>,
    /// Artifacts that were already present
    pub skipped: Vec<PathBuf>,
}

impl DownloadSummary {
    /// Fold one artifact outcome into the summary
    pub fn record(&mut self, outcome: ArtifactOutcome) {
        match outcome {
            ArtifactOutcome::Downloaded { path, bytes } => {
                self.downloaded.push(DownloadedArtifact { path, bytes })
            }
            ArtifactOutcome::Skipped { path } => self.skipped.push(path),
        }
    }

    /// Bytes fetched across all downloaded artifacts
    pub fn total_bytes(&self) -> u64 {
        self.downloaded.iter().map(|a| a.bytes).sum()
    }
}

/// Result of a full mirror run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    /// Download phase totals
    pub download: DownloadSummary,
    /// Extracted directories that replaced rewritten archives
    pub rewritten: Vec<PathBuf>,
}
