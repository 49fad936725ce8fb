use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Files whose presence marks a project root.
const ROOT_MARKERS: [&str; 3] = [".git", "Cargo.toml", "pyproject.toml"];

/// Nearest ancestor of the working directory that contains a root marker.
///
/// Falls back to the working directory itself, or `.` when the working
/// directory is not valid UTF-8.
pub fn project_root() -> Utf8PathBuf {
    let Some(cwd) = std::env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::try_from(dir).ok())
    else {
        return Utf8PathBuf::from(".");
    };
    find_root(&cwd).unwrap_or(cwd)
}

fn find_root(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .map(Utf8Path::to_path_buf)
}

/// Absolute form of `path`; relative paths are joined to `base`, or to the
/// project root when no base is given.
pub fn resolve_path(path: impl AsRef<Utf8Path>, base: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match base {
            Some(base) => base.join(path),
            None => project_root().join(path),
        }
    };

    // Canonicalize when possible; paths that do not exist yet stay as joined.
    match joined.canonicalize_utf8() {
        Ok(canonical) => Ok(canonical),
        Err(_) if !joined.exists() => Ok(joined),
        Err(err) => Err(err).with_context(|| format!("Failed to resolve path: {}", joined)),
    }
}

/// Create `path` and its parents if missing.
pub fn ensure_dir(path: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf> {
    let path = path.as_ref();
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path))?;
    Ok(path.to_path_buf())
}
