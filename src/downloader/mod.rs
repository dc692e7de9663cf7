//! Artifact download engine
//!
//! Walks every artifact URL in a [`RepositoryIndex`] and materializes it under
//! the local folder:
//!
//! 1. normalize the URL and derive `local/<project>/<file>`
//! 2. skip it if that file already exists (no content check)
//! 3. otherwise stream it into `<file>.tmp` and rename into place
//!
//! Step 3 runs under [`retry_with_backoff`]. Artifacts are processed one at a
//! time and the first artifact that exhausts its retry budget aborts the run,
//! so a mirror is either complete or reported as failed.

mod artifact;


pub use artifact::{ArtifactLocation, PARTIAL_SUFFIX};

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::index::{RepositoryIndex, remote_error};
use crate::progress::{Event, ProgressReporter};
use crate::retry::retry_with_backoff;
use crate::transport::Transport;
use crate::types::{ArtifactOutcome, DownloadSummary};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads index artifacts into a local folder
pub struct DownloadEngine<'a> {
    transport: &'a dyn Transport,
    local_dir: &'a Path,
    retry: &'a RetryConfig,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> DownloadEngine<'a> {
    /// Create an engine writing under `local_dir`
    pub fn new(
        transport: &'a dyn Transport,
        local_dir: &'a Path,
        retry: &'a RetryConfig,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            transport,
            local_dir,
            retry,
            reporter,
        }
    }

    /// Materialize every artifact in the index
    ///
    /// # Errors
    /// Stops at the first artifact that cannot be downloaded.
    pub async fn sync_index(&self, index: &RepositoryIndex) -> Result<DownloadSummary> {
        let repository = self
            .transport
            .base_url()
            .as_str()
            .trim_end_matches('/')
            .to_string();

        info!(url = %repository, local_dir = ?self.local_dir, "Download started");
        self.reporter.on_event(&Event::DownloadStarted {
            repository,
            local_dir: self.local_dir.to_path_buf(),
        });

        let mut summary = DownloadSummary::default();
        for url in index.artifact_urls() {
            summary.record(self.sync_artifact(url).await?);
        }

        info!(
            downloaded = summary.downloaded.len(),
            skipped = summary.skipped.len(),
            bytes = summary.total_bytes(),
            "Download finished"
        );
        self.reporter.on_event(&Event::DownloadFinished {
            downloaded: summary.downloaded.len(),
            skipped: summary.skipped.len(),
        });

        Ok(summary)
    }

    /// Materialize a single artifact URL from the index
    pub async fn sync_artifact(&self, url: &str) -> Result<ArtifactOutcome> {
        let location = ArtifactLocation::resolve(self.transport.base_url(), url)?;
        let directory = location.directory(self.local_dir);
        let destination = location.destination(self.local_dir);
        let name = location.display_name();

        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| Error::filesystem(&directory, e))?;

        if path_exists(&destination).await? {
            debug!(artifact = %name, "Already present, skipping");
            self.reporter
                .on_event(&Event::ArtifactSkipped { artifact: name });
            return Ok(ArtifactOutcome::Skipped { path: destination });
        }

        let partial = location.partial_path(self.local_dir);
        let bytes = retry_with_backoff(self.retry, || {
            self.download_once(&location, &name, &partial, &destination)
        })
        .await
        .map_err(|source| Error::Download {
            url: location.fetch_path.clone(),
            path: destination.clone(),
            source: Box::new(source),
        })?;

        info!(artifact = %name, bytes, "Downloaded");
        self.reporter.on_event(&Event::ArtifactDownloaded {
            artifact: name,
            bytes,
        });

        Ok(ArtifactOutcome::Downloaded {
            path: destination,
            bytes,
        })
    }

    /// One attempt: fetch, stream to the partial file, rename into place
    async fn download_once(
        &self,
        location: &ArtifactLocation,
        name: &str,
        partial: &Path,
        destination: &Path,
    ) -> Result<u64> {
        let result = self.stream_to(location, name, partial).await;
        match result {
            Ok(bytes) => match tokio::fs::rename(partial, destination).await {
                Ok(()) => Ok(bytes),
                Err(e) => {
                    discard_partial(partial).await;
                    Err(Error::filesystem(destination, e))
                }
            },
            Err(e) => {
                discard_partial(partial).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, location: &ArtifactLocation, name: &str, partial: &Path) -> Result<u64> {
        let response = self.transport.fetch(&location.fetch_path).await?;
        if !response.is_success() {
            let status = response.status;
            // Best effort: the body is only used to enrich the message
            let body = response.bytes().await.unwrap_or_default();
            return Err(remote_error(status, &body));
        }

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| Error::filesystem(partial, e))?;

        let mut body = response.body;
        let mut transferred: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::filesystem(partial, e))?;
            transferred += chunk.len() as u64;
            self.reporter.on_progress(name, transferred);
        }

        file.flush().await.map_err(|e| Error::filesystem(partial, e))?;
        file.sync_all()
            .await
            .map_err(|e| Error::filesystem(partial, e))?;

        Ok(transferred)
    }
}

async fn path_exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| Error::filesystem(path, e))
}

async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!(path = ?partial, "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = ?partial, error = %e, "Failed to remove partial download"),
    }
}

/// Paths of every artifact the index would produce, without touching the network
///
/// Handy for dry runs and for checking which artifacts are still missing.
pub fn planned_destinations(
    base: &url::Url,
    index: &RepositoryIndex,
    local_dir: &Path,
) -> Result<Vec<PathBuf>> {
    index
        .artifact_urls()
        .map(|url| ArtifactLocation::resolve(base, url).map(|l| l.destination(local_dir)))
        .collect()
}
