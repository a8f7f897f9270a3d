use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, WrapErr};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::{result::Result, types::Container};

const PREFIX: &str = "tmp_";
const TOKEN_LEN: usize = 16;

/// Hands out scratch directories under a common root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a new `tmp_<token>` directory under the root.
    ///
    /// The token is random, a name collision makes the underlying
    /// builder retry with a fresh one.
    pub fn acquire(&self) -> Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .rand_bytes(TOKEN_LEN)
            .tempdir_in(&self.root)
            .into_diagnostic()
            .wrap_err_with(|| {
                format!("Could not create a workspace in {}", self.root.display())
            })?;

        debug!("Workspace {} acquired", dir.path().display());
        Ok(Workspace { dir })
    }
}

/// A job's private scratch directory.
///
/// The directory is removed by [`Workspace::release`]. Dropping the handle
/// without releasing it also removes it, but silently.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn video_file(&self, container: Container) -> PathBuf {
        self.file("video", container)
    }

    pub fn audio_file(&self, container: Container) -> PathBuf {
        self.file("audio", container)
    }

    pub fn merged_file(&self, container: Container) -> PathBuf {
        self.file("merged", container)
    }

    fn file(&self, stem: &str, container: Container) -> PathBuf {
        self.path().join(format!("{stem}.{}", container.ext()))
    }

    /// Recursively remove the directory. Never fails, errors are only logged.
    pub fn release(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Workspace {} released", path.display()),
            Err(err) => warn!("Could not remove workspace {}: {err}", path.display()),
        }
    }
}
