//! Temp-file-and-rename writes: the destination is either the previous file or
//! the complete new one, never something in between.

use monizze_core::{Error, Result};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

fn export_error(dest: &Path) -> impl Fn(io::Error) -> Error + '_ {
    move |source| Error::Export {
        path: dest.to_path_buf(),
        source,
    }
}

fn parent_dir(dest: &Path) -> &Path {
    match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn staging_file(dest: &Path) -> io::Result<NamedTempFile> {
    Builder::new()
        .prefix(".monizze-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(dest))
}

/// Check that `dest` can be written before any remote call is made.
pub fn preflight(dest: &Path) -> Result<()> {
    if dest.is_dir() {
        return Err(export_error(dest)(io::Error::other(
            "destination is a directory",
        )));
    }
    staging_file(dest).map(drop).map_err(export_error(dest))
}

/// Run `write` against a staging file next to `dest`, then move it into place.
/// On any error the staging file is removed and `dest` is left as it was.
pub fn write_atomically<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut staged = staging_file(dest).map_err(export_error(dest))?;
    {
        let mut out = BufWriter::new(staged.as_file_mut());
        write(&mut out).map_err(export_error(dest))?;
        out.flush().map_err(export_error(dest))?;
    }
    staged.as_file().sync_all().map_err(export_error(dest))?;
    staged
        .persist(dest)
        .map_err(|e| export_error(dest)(e.error))?;
    Ok(())
}
