//! # chart-mirror
//!
//! Mirrors a remote chart repository into a local folder.
//!
//! ## Design Philosophy
//!
//! chart-mirror is designed to be:
//! - **Resumable** - Artifacts already on disk are never fetched again
//! - **Atomic** - A file at its final path is always a complete download
//! - **Library-first** - No CLI, purely a Rust crate for embedding
//!
//! A run has two phases. The download phase fetches `index.yaml` from the
//! repository and stores every artifact it lists as
//! `<local_dir>/<project>/<file>`. The optional rewrite phase then replaces
//! every `.tgz` with an extracted directory in which one literal string has
//! been substituted for another.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chart_mirror::{ChartMirror, Config, ConsoleReporter, RewriteConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("https://charts.example.com", "./charts");
//!     config.rewrite = RewriteConfig::new("registry.old.example", "registry.new.example");
//!
//!     let report = ChartMirror::new(config)?
//!         .with_reporter(Arc::new(ConsoleReporter))
//!         .run()
//!         .await?;
//!
//!     println!("{} downloaded", report.download.downloaded.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Artifact download engine
pub mod downloader;
/// Error types
pub mod error;
/// Repository index model and resolution
pub mod index;
/// Mirror facade
pub mod mirror;
/// Progress and phase reporting
pub mod progress;
/// Retry logic with exponential backoff
pub mod retry;
/// Archive rewriting
pub mod rewrite;
/// Remote repository access
pub mod transport;
/// Run results
pub mod types;

// Re-export commonly used types
pub use config::{Config, RepositoryConfig, RetryConfig, RewriteConfig};
pub use downloader::{DownloadEngine, planned_destinations};
pub use error::{Error, Result};
pub use index::RepositoryIndex;
pub use mirror::ChartMirror;
pub use progress::{ConsoleReporter, Event, NoopReporter, ProgressReporter};
pub use rewrite::{ArchiveRewriter, Substitution};
pub use transport::{HttpTransport, RemoteResponse, Transport};
pub use types::{ArtifactOutcome, DownloadSummary, MirrorReport};
