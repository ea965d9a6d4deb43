//! Staging and committing the two files of an archive entry.
//!
//! Both files are written to temporary files in the archive directory and then renamed into
//! place, metadata first and binary container last. Everything else in the crate treats the
//! binary container as the marker that an entry exists, so an entry only becomes visible once
//! both files are complete.

use crate::Error;

use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;
use tempfile::NamedTempFile;

/// a fresh temporary file next to the final location of `uid`'s files
pub(crate) fn stage(dir: &Path, uid: &str) -> io::Result<BufWriter<NamedTempFile>> {
    let file = tempfile::Builder::new()
        .prefix(&format!(".{uid}."))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    Ok(BufWriter::new(file))
}

/// flush a staged file, syncing it to disk when `durable` is set
pub(crate) fn seal(writer: BufWriter<NamedTempFile>, durable: bool) -> io::Result<NamedTempFile> {
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    if durable {
        file.as_file().sync_all()?;
    }
    Ok(file)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// fail with [`Error::AlreadyExists`] if a target file is already present
    NoClobber,
    Replace,
}

/// Move a sealed pair of files into place.
///
/// If the binary container cannot be moved, the metadata file that was just committed is removed
/// again so that no half entry is left behind.
pub(crate) fn commit(
    uid: &str,
    metadata: NamedTempFile,
    metadata_path: &Path,
    data: NamedTempFile,
    data_path: &Path,
    mode: Mode,
) -> Result<(), Error> {
    persist(uid, metadata, metadata_path, mode)?;

    if let Err(err) = persist(uid, data, data_path, mode) {
        if let Err(cleanup) = fs::remove_file(metadata_path) {
            tracing::error!(
                uid,
                path = %metadata_path.display(),
                error = %cleanup,
                "could not remove metadata of a failed commit"
            );
        }
        return Err(err);
    }

    tracing::debug!(uid, path = %data_path.display(), "committed");

    Ok(())
}

fn persist(uid: &str, file: NamedTempFile, target: &Path, mode: Mode) -> Result<(), Error> {
    let result = match mode {
        Mode::NoClobber => file.persist_noclobber(target),
        Mode::Replace => file.persist(target),
    };

    match result {
        Ok(_) => Ok(()),
        Err(err) if mode == Mode::NoClobber && err.error.kind() == io::ErrorKind::AlreadyExists => {
            Err(Error::AlreadyExists { uid: uid.into() })
        }
        Err(err) => Err(err.into()),
    }
}
