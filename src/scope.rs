//! Scoped temporary storage for in-flight downloads
//!
//! Every pipeline run stages its files (raw stream, transcoded output,
//! artwork) inside one private [`DownloadScope`]. Releasing the scope removes
//! the whole directory in one operation; dropping it without an explicit
//! release does the same, so cleanup also happens when the owning task errors
//! out early or is cancelled.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// A private temporary directory owned by one download attempt.
///
/// No two pipeline runs ever share a scope. The directory lives under the
/// configured download root so all transient state stays on one filesystem
/// and renames inside the scope are atomic.
#[derive(Debug)]
pub struct DownloadScope {
    dir: TempDir,
}

impl DownloadScope {
    /// Create a fresh scope under `root`, creating `root` first if needed
    pub fn create_in(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = TempDir::with_prefix_in("tunebot-", root)?;
        debug!(path = ?dir.path(), "created download scope");
        Ok(Self { dir })
    }

    /// Path of the scope directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file named `name` inside the scope
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Delete the scope directory and everything in it.
    ///
    /// Removal failures are logged and swallowed: the directory will be
    /// unreachable by new runs either way, and delivery must not fail over a
    /// cleanup error.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(?path, error = %e, "failed to remove download scope");
        } else {
            debug!(?path, "released download scope");
        }
    }
}
