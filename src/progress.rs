//! Progress reporting
//!
//! The pipeline never prints directly. It reports byte counts and phase
//! events to a [`ProgressReporter`], and the embedding application decides
//! what to do with them: draw a console line, forward to a channel, or
//! ignore them.

use indicatif::HumanBytes;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Phase events emitted during a mirror run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Download phase started
    DownloadStarted {
        /// Repository base URL
        repository: String,
        /// Local mirror folder
        local_dir: PathBuf,
    },

    /// Artifact already present locally, not fetched
    ArtifactSkipped {
        /// Artifact path relative to the local folder
        artifact: String,
    },

    /// Artifact downloaded and committed to its final path
    ArtifactDownloaded {
        /// Artifact path relative to the local folder
        artifact: String,
        /// Bytes written
        bytes: u64,
    },

    /// Download phase finished
    DownloadFinished {
        /// Number of artifacts fetched
        downloaded: usize,
        /// Number of artifacts already present
        skipped: usize,
    },

    /// Archive rewriting started
    RewriteStarted {
        /// Literal being replaced
        old: String,
        /// Replacement literal
        new: String,
    },

    /// One archive was extracted and rewritten
    ArchiveRewritten {
        /// Archive path relative to the local folder
        archive: String,
    },

    /// Archive rewriting finished
    RewriteFinished {
        /// Number of archives rewritten
        rewritten: usize,
    },
}

/// Receiver of download progress and phase events
pub trait ProgressReporter: Send + Sync {
    /// Cumulative bytes transferred for `artifact`, called after each written chunk
    fn on_progress(&self, artifact: &str, transferred: u64);

    /// Phase event
    fn on_event(&self, _event: &Event) {}
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&self, _artifact: &str, _transferred: u64) {}
}

/// Reporter that draws progress on a single, repeatedly overwritten stdout line
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

// Wide enough to blank out a previous progress line
const CLEAR_WIDTH: usize = 35;

impl ConsoleReporter {
    fn line(event: &Event) -> Option<String> {
        let line = match event {
            Event::DownloadStarted {
                repository,
                local_dir,
            } => format!(
                "Repo url: {}\nLocal folder: {}\nDownload started",
                repository,
                local_dir.display()
            ),
            Event::ArtifactSkipped { .. } => return None,
            // The progress line has no newline of its own
            Event::ArtifactDownloaded { .. } => String::new(),
            Event::DownloadFinished { .. } => "Download finished".to_string(),
            Event::RewriteStarted { old, new } => format!("Replace `{}` to `{}` started", old, new),
            Event::ArchiveRewritten { archive } => format!("Replacing {} complete", archive),
            Event::RewriteFinished { .. } => "Replace finished".to_string(),
        };
        Some(line)
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_progress(&self, artifact: &str, transferred: u64) {
        let mut out = std::io::stdout().lock();
        let _ = write!(
            out,
            "\r{}\rDownloading {} ... {} complete",
            " ".repeat(CLEAR_WIDTH),
            artifact,
            HumanBytes(transferred)
        );
        let _ = out.flush();
    }

    fn on_event(&self, event: &Event) {
        if let Some(line) = Self::line(event) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
        }
    }
}

/// Forward phase events to broadcast subscribers
///
/// Byte-level progress is not forwarded; it would flood slow receivers.
impl ProgressReporter for broadcast::Sender<Event> {
    fn on_progress(&self, _artifact: &str, _transferred: u64) {}

    fn on_event(&self, event: &Event) {
        // No subscribers is fine
        let _ = self.send(event.clone());
    }
}
