use std::path::Path;

use miette::{miette, IntoDiagnostic, WrapErr};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::result::Result;

/// Move `from` to `to`, replacing `to` if it exists.
///
/// Readers of `to` only ever see the old file or the complete new one:
/// a plain rename is tried first, and when it fails (e.g. `from` is on another
/// filesystem) the data is copied into a temporary file next to `to`,
/// which is then renamed over it.
pub fn move_replace(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    debug!(
        "Renaming {} failed, falling back to copying",
        from.display()
    );
    let parent = to
        .parent()
        .ok_or_else(|| miette!("{} has no parent directory", to.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not create a temporary file in {}", parent.display()))?;
    let mut src = std::fs::File::open(from)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not open {}", from.display()))?;
    std::io::copy(&mut src, &mut tmp)
        .into_diagnostic()
        .wrap_err("Could not copy the file data")?;
    tmp.as_file()
        .sync_all()
        .into_diagnostic()
        .wrap_err("Could not flush the copied data")?;

    tmp.persist(to)
        .map_err(|err| err.error)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not replace {}", to.display()))?;

    // The source lives in a workspace that is about to be deleted anyway
    if let Err(err) = std::fs::remove_file(from) {
        debug!("Could not remove {} after copying it: {err}", from.display());
    }
    Ok(())
}
