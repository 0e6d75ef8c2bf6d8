//! File replacement helpers shared by installs and activation

use std::fs;
use std::io;
use std::path::Path;

/// Copies `from` over `to` without ever exposing a partial file at `to`.
///
/// The copy is staged in a temp file next to `to` (same filesystem), synced,
/// then persisted over the target. On Unix the source permissions are
/// carried over and the parent directory is synced.
pub(crate) fn atomic_copy(from: &Path, to: &Path) -> io::Result<()> {
    let dest_dir = to
        .parent()
        .ok_or_else(|| io::Error::other(format!("{} has no parent directory", to.display())))?;

    let mut staged = tempfile::NamedTempFile::new_in(dest_dir)?;
    let mut src = fs::File::open(from)?;
    io::copy(&mut src, &mut staged)?;
    drop(src);

    #[cfg(unix)]
    {
        let permissions = fs::metadata(from)?.permissions();
        fs::set_permissions(staged.path(), permissions)?;
    }

    staged.as_file().sync_all()?;
    staged.persist(to).map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        fs::File::open(dest_dir)?.sync_all()?;
    }

    Ok(())
}

/// Adds the executable bits on Unix; no-op elsewhere
pub(crate) fn set_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        fs::set_permissions(path, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
