//! Atomic file writes and JSON/YAML helpers.
//!
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so readers never observe a partial file.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

fn temp_file_beside(target: &Utf8Path) -> Result<NamedTempFile> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent))?;
    NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent))
}

/// Write `data` to `target` atomically.
pub fn safe_write(target: impl AsRef<Utf8Path>, data: &[u8]) -> Result<()> {
    let target = target.as_ref();
    let mut tmp = temp_file_beside(target)?;
    tmp.write_all(data)
        .with_context(|| format!("Failed to write temporary file for {}", target))?;
    tmp.flush()?;
    tmp.persist(target)
        .with_context(|| format!("Failed to replace {}", target))?;
    Ok(())
}

/// Copy `src` to `dest` atomically.
pub fn safe_copy(src: impl AsRef<Utf8Path>, dest: impl AsRef<Utf8Path>) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    let tmp = temp_file_beside(dest)?;
    fs::copy(src, tmp.path()).with_context(|| format!("Failed to copy {} to {}", src, dest))?;
    tmp.persist(dest)
        .with_context(|| format!("Failed to replace {}", dest))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Utf8Path>) -> Result<T> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read JSON file: {}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse JSON file: {}", path))
}

/// Write pretty JSON with a 4-space indent.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Utf8Path>, data: &T) -> Result<()> {
    let path = path.as_ref();
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)
        .with_context(|| format!("Failed to serialize JSON for {}", path))?;
    buf.push(b'\n');
    safe_write(path, &buf)
}

pub fn read_yaml<T: DeserializeOwned>(path: impl AsRef<Utf8Path>) -> Result<T> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read YAML file: {}", path))?;
    serde_yaml_ng::from_str(&contents)
        .with_context(|| format!("Failed to parse YAML file: {}", path))
}

pub fn write_yaml<T: Serialize + ?Sized>(path: impl AsRef<Utf8Path>, data: &T) -> Result<()> {
    let path = path.as_ref();
    let yaml = serde_yaml_ng::to_string(data)
        .with_context(|| format!("Failed to serialize YAML for {}", path))?;
    safe_write(path, yaml.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn create_test_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_safe_write_creates_parents_and_replaces() {
        let (_temp_dir, dir) = create_test_dir();
        let target = dir.join("dist/assets/app.css");

        safe_write(&target, b"body{}").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "body{}");

        safe_write(&target, b"main{}").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "main{}");

        // No temporary files left behind
        assert_eq!(fs::read_dir(dir.join("dist/assets")).unwrap().count(), 1);
    }

    #[test]
    fn test_safe_copy() {
        let (_temp_dir, dir) = create_test_dir();
        let src = dir.join("static/logo.svg");
        safe_write(&src, b"<svg/>").unwrap();

        let dest = dir.join("dist/static/logo.svg");
        safe_copy(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"<svg/>");
    }

    #[test]
    fn test_safe_copy_missing_source_fails() {
        let (_temp_dir, dir) = create_test_dir();
        let result = safe_copy(dir.join("nope.txt"), dir.join("out.txt"));
        assert!(result.is_err());
        assert!(!dir.join("out.txt").exists());
    }

    #[test]
    fn test_json_helpers() {
        let (_temp_dir, dir) = create_test_dir();
        let path = dir.join("manifest.json");
        let data = json!({ "name": "demo", "routes": ["/", "/about"] });

        write_json(&path, &data).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"name\": \"demo\""));

        let loaded: Value = read_json(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_yaml_helpers() {
        let (_temp_dir, dir) = create_test_dir();
        let path = dir.join("routes.yaml");
        let data = json!({ "home": "/", "about": "/about" });

        write_yaml(&path, &data).unwrap();
        let loaded: Value = read_yaml(&path).unwrap();
        assert_eq!(loaded, data);

        fs::write(&path, "home: [").unwrap();
        assert!(read_yaml::<Value>(&path).is_err());
    }
}
