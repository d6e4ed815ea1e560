use std::ffi::{OsStr, OsString};
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::debug;

use super::error::{Error, ErrorKind};

const OUTPUT_MARKER: &str = "unjson";
const FALLBACK_EXTENSION: &str = "tsv";

pub fn read_input(path: &Path) -> Result<String, Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| Error::from_io(err, "failed to read input file", path))?;
    debug!(path = %path.display(), bytes = text.len(), "read input");
    Ok(text)
}

/// Replace `path` with `contents`, or leave it untouched on failure.
///
/// The data goes to a temp file in the destination directory which is renamed
/// over `path` once fully written. A temp file that is never persisted is
/// removed when dropped. The replaced file keeps its permissions; a new file
/// gets `0o644` (subject to the umask) rather than the temp file's `0o600`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut builder = Builder::new();
    if let Some(permissions) = output_permissions(path) {
        builder.permissions(permissions);
    }
    let mut file = builder
        .tempfile_in(dir)
        .map_err(|err| Error::from_io(err, "failed to create temp output file", dir))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|err| Error::from_io(err, "failed to write output file", file.path()))?;
    file.persist(path)
        .map_err(|err| Error::from_io(err.error, "failed to replace output file", path))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

fn output_permissions(path: &Path) -> Option<Permissions> {
    if let Ok(metadata) = std::fs::metadata(path) {
        return Some(metadata.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// `dir/name.ext` becomes `dir/name.unjson.ext`; a path without an extension
/// gets `.unjson.tsv`.
pub fn default_output_path(input: &Path) -> Result<PathBuf, Error> {
    let stem = input.file_stem().ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("cannot derive an output file name from the input path")
            .with_hint("Pass --output explicitly.")
            .with_path(input)
    })?;
    let mut name = OsString::from(stem);
    name.push(".");
    name.push(OUTPUT_MARKER);
    name.push(".");
    name.push(input.extension().unwrap_or(OsStr::new(FALLBACK_EXTENSION)));
    Ok(input.with_file_name(name))
}
