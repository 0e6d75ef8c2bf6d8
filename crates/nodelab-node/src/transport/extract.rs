//! Archive extraction

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::TransportError;

/// Unpacks a `.tar.gz` into `dest_dir`; entries escaping it are rejected
pub(crate) fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), TransportError> {
    let file = fs::File::open(archive_path).map_err(|e| {
        TransportError::io(format!("open archive {}", archive_path.display()), e)
    })?;
    let failed = |e: io::Error| TransportError::Extraction {
        archive: archive_path.display().to_string(),
        reason: e.to_string(),
    };

    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    for entry in archive.entries().map_err(failed)? {
        let mut entry = entry.map_err(failed)?;
        entry.unpack_in(dest_dir).map_err(failed)?;
    }
    Ok(())
}

/// Unpacks a `.zip` into `dest_dir`, skipping entries without an enclosed
/// name. Returns the number of files written.
pub(crate) fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, TransportError> {
    let file = fs::File::open(archive_path).map_err(|e| {
        TransportError::io(format!("open archive {}", archive_path.display()), e)
    })?;
    let failed = |reason: String| TransportError::Extraction {
        archive: archive_path.display().to_string(),
        reason,
    };

    let mut archive = zip::ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| failed(e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let outpath = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| {
                TransportError::io(format!("create directory {}", outpath.display()), e)
            })?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TransportError::io(format!("create directory {}", parent.display()), e)
            })?;
        }
        let mut outfile = fs::File::create(&outpath)
            .map_err(|e| TransportError::io(format!("create file {}", outpath.display()), e))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| TransportError::io(format!("extract file {}", outpath.display()), e))?;
        written += 1;
    }

    Ok(written)
}

/// First regular file named `binary_name` below `dir`
pub(crate) fn find_binary_in_dir(dir: &Path, binary_name: &str) -> Result<PathBuf, TransportError> {
    let target = OsStr::new(binary_name);

    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            TransportError::io(format!("walk directory {}", dir.display()), io::Error::other(e))
        })?;
        if entry.file_type().is_file() && entry.file_name() == target {
            return Ok(entry.into_path());
        }
    }

    Err(TransportError::BinaryNotFound {
        binary: binary_name.to_string(),
        archive: dir.display().to_string(),
    })
}
