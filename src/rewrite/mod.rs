//! Chart archive rewriting
//!
//! Replaces each `.tgz` under the mirror folder with an extracted directory
//! of the same base name, applying a literal substitution to every file on
//! the way out. Substitution works on decoded entry bytes; the compressed
//! stream cannot be searched.
//!
//! Chart archives wrap their contents in a single root folder
//! (`myapp/Chart.yaml`, ...). That root is dropped, so
//! `myapp/myapp-1.2.0.tgz` becomes `myapp/myapp-1.2.0/Chart.yaml`.

mod substitution;

pub use substitution::Substitution;

use crate::error::{Error, Result};
use crate::progress::{Event, ProgressReporter};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info};

/// Extension of chart archives
pub const ARCHIVE_EXTENSION: &str = "tgz";

/// Rewrites every chart archive under a folder
#[derive(Debug, Clone)]
pub struct ArchiveRewriter {
    substitution: Substitution,
}

impl ArchiveRewriter {
    /// Rewriter applying `substitution`
    pub fn new(substitution: Substitution) -> Self {
        Self { substitution }
    }

    /// Find every archive under `root` and rewrite it in place
    ///
    /// Returns the extracted directories, in walk order.
    pub async fn rewrite_tree(
        &self,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<PathBuf>> {
        // Collect first: rewriting mutates the tree being walked
        let archives = {
            let walk_root = root.to_path_buf();
            spawn_blocking(move || find_archives(&walk_root))
                .await
                .map_err(|e| Error::filesystem(root, std::io::Error::other(e)))??
        };

        let mut rewritten = Vec::with_capacity(archives.len());
        for archive in archives {
            let target = self.rewrite(&archive).await?;

            let name = archive
                .strip_prefix(root)
                .unwrap_or(&archive)
                .to_string_lossy()
                .into_owned();
            info!(archive = %name, target = ?target, "Archive rewritten");
            reporter.on_event(&Event::ArchiveRewritten { archive: name });

            rewritten.push(target);
        }

        Ok(rewritten)
    }

    /// Rewrite a single archive, off the async runtime
    pub async fn rewrite(&self, archive: &Path) -> Result<PathBuf> {
        let archive_owned = archive.to_path_buf();
        let substitution = self.substitution.clone();

        spawn_blocking(move || rewrite_archive(&archive_owned, &substitution))
            .await
            .map_err(|e| Error::ArchiveDecode {
                archive: archive.to_path_buf(),
                reason: format!("rewrite task panicked: {}", e),
            })?
    }
}

/// Every regular `.tgz` file below `root`, sorted by path
pub fn find_archives(root: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            Error::filesystem(path, e.into())
        })?;

        if entry.file_type().is_file()
            && entry.path().extension().and_then(|ext| ext.to_str()) == Some(ARCHIVE_EXTENSION)
        {
            archives.push(entry.into_path());
        }
    }
    debug!(count = archives.len(), ?root, "found chart archives");
    Ok(archives)
}

/// Directory an archive is extracted into: its path without the extension
pub fn extraction_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Extract `archive` next to itself with `substitution` applied, then delete it
///
/// Any previous extraction directory is replaced, never merged.
pub fn rewrite_archive(archive: &Path, substitution: &Substitution) -> Result<PathBuf> {
    let target = extraction_dir(archive);
    debug!(?archive, ?target, "rewriting archive");

    match std::fs::remove_dir_all(&target) {
        Ok(()) => debug!(?target, "removed previous extraction"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::filesystem(&target, e)),
    }
    std::fs::create_dir_all(&target).map_err(|e| Error::filesystem(&target, e))?;

    let file = std::fs::File::open(archive).map_err(|e| Error::filesystem(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    let decode_error = |reason: String| Error::ArchiveDecode {
        archive: archive.to_path_buf(),
        reason,
    };

    let entries = tar
        .entries()
        .map_err(|e| decode_error(format!("failed to read archive: {}", e)))?;

    let mut written = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| decode_error(format!("failed to read entry: {}", e)))?;
        let entry_path = entry
            .path()
            .map_err(|e| decode_error(format!("invalid entry path: {}", e)))?
            .into_owned();

        validate_entry_path(&entry_path).map_err(decode_error)?;

        let Some(relative) = strip_root(&entry_path) else {
            continue;
        };
        let dest = target.join(&relative);

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| Error::filesystem(&dest, e))?;
            continue;
        }
        if !kind.is_file() {
            debug!(path = ?entry_path, ?kind, "skipping non-regular entry");
            continue;
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }

        // The header size is untrusted; let the buffer grow with the real data
        let declared = entry.size();
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| decode_error(format!("failed to read {}: {}", entry_path.display(), e)))?;
        if content.len() as u64 != declared {
            return Err(decode_error(format!(
                "truncated entry {}: header declares {} bytes, archive holds {}",
                entry_path.display(),
                declared,
                content.len()
            )));
        }

        std::fs::write(&dest, substitution.apply(&content))
            .map_err(|e| Error::filesystem(&dest, e))?;
        written += 1;
    }

    std::fs::remove_file(archive).map_err(|e| Error::filesystem(archive, e))?;
    debug!(?archive, files = written, "archive replaced by extracted directory");

    Ok(target)
}

/// Drop the leading component of an entry path
///
/// Returns `None` for the root folder entry itself.
fn strip_root(path: &Path) -> Option<PathBuf> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
    components.next()?;
    let rest: PathBuf = components.collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Reject entry paths that would escape the extraction directory
fn validate_entry_path(path: &Path) -> std::result::Result<(), String> {
    if path.is_absolute() {
        return Err(format!("absolute entry path: {}", path.display()));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return Err(format!("path traversal in entry: {}", path.display()));
    }
    Ok(())
}
