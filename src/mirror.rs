//! Mirror facade tying index resolution, download and rewrite together

use crate::config::Config;
use crate::downloader::DownloadEngine;
use crate::error::{Error, Result};
use crate::index;
use crate::progress::{Event, NoopReporter, ProgressReporter};
use crate::rewrite::{ArchiveRewriter, Substitution};
use crate::transport::{HttpTransport, Transport};
use crate::types::{DownloadSummary, MirrorReport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Mirrors a remote chart repository into a local folder
///
/// A run resolves the remote index, downloads every artifact it lists that
/// is not already present, and then (when a substitution is configured)
/// replaces each archive with a rewritten, extracted directory.
#[derive(Clone)]
pub struct ChartMirror {
    config: Config,
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ChartMirror {
    /// Mirror over HTTP(S) as described by `config`
    ///
    /// # Errors
    /// Fails when the configuration is invalid or the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.repository)?;
        Ok(Self::from_parts(config, Arc::new(transport)))
    }

    /// Mirror through a caller-supplied transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, transport))
    }

    fn from_parts(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Send progress and phase events to `reporter`
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Full run: pull, then rewrite
    pub async fn run(&self) -> Result<MirrorReport> {
        let download = self.pull().await?;
        let rewritten = self.rewrite().await?;
        Ok(MirrorReport {
            download,
            rewritten,
        })
    }

    /// Resolve the index and download every missing artifact
    pub async fn pull(&self) -> Result<DownloadSummary> {
        let local_dir = &self.config.local_dir;
        tokio::fs::create_dir_all(local_dir)
            .await
            .map_err(|e| Error::filesystem(local_dir, e))?;

        let index = index::resolve(self.transport.as_ref()).await?;

        DownloadEngine::new(
            self.transport.as_ref(),
            local_dir,
            &self.config.retry,
            self.reporter.as_ref(),
        )
        .sync_index(&index)
        .await
    }

    /// Rewrite every archive in the local folder
    ///
    /// Does nothing when no substitution is configured.
    pub async fn rewrite(&self) -> Result<Vec<PathBuf>> {
        let rewrite = &self.config.rewrite;
        let Some(substitution) = Substitution::new(&rewrite.old, &rewrite.new)? else {
            return Ok(Vec::new());
        };

        info!(old = %rewrite.old, new = %rewrite.new, "Rewrite started");
        self.reporter.on_event(&Event::RewriteStarted {
            old: rewrite.old.clone(),
            new: rewrite.new.clone(),
        });

        let rewritten = ArchiveRewriter::new(substitution)
            .rewrite_tree(&self.config.local_dir, self.reporter.as_ref())
            .await?;

        info!(rewritten = rewritten.len(), "Rewrite finished");
        self.reporter.on_event(&Event::RewriteFinished {
            rewritten: rewritten.len(),
        });

        Ok(rewritten)
    }
}

impl std::fmt::Debug for ChartMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartMirror")
            .field("repository", &self.transport.base_url().as_str())
            .field("local_dir", &self.config.local_dir)
            .finish_non_exhaustive()
    }
}
