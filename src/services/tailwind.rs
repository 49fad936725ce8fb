//! `tailwind.config.js` generation from a resolved [`ThemeConfig`].

use crate::errors::{ErrorKind, PySmeError, Reraise};
use crate::models::ThemeConfig;
use crate::utils::fs::safe_write;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

/// File name the Tailwind CLI looks for.
pub const TAILWIND_CONFIG_FILENAME: &str = "tailwind.config.js";

/// Render `theme` as a CommonJS `tailwind.config.js` module.
///
/// Plugins are emitted as `require(...)` calls; content globs and the theme
/// tree as JSON literals.
pub fn render_tailwind_config(theme: &ThemeConfig) -> serde_json::Result<String> {
    let content = serde_json::to_string_pretty(&theme.content)?;
    let tree = serde_json::to_string_pretty(&Value::Object(theme.theme.clone()))?;
    let plugins = theme
        .plugins
        .iter()
        .map(|plugin| serde_json::to_string(plugin).map(|quoted| format!("    require({quoted}),")))
        .collect::<serde_json::Result<Vec<_>>>()?;

    let mut out = String::from("/** @type {import('tailwindcss').Config} */\nmodule.exports = {\n");
    out.push_str(&format!("  content: {},\n", indent(&content)));
    out.push_str(&format!("  theme: {},\n", indent(&tree)));
    if plugins.is_empty() {
        out.push_str("  plugins: [],\n");
    } else {
        out.push_str("  plugins: [\n");
        for line in plugins {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("  ],\n");
    }
    out.push_str("};\n");
    Ok(out)
}

/// Write `tailwind.config.js` into `dir` atomically, returning its path.
///
/// # Errors
///
/// A `Build` error carrying the target path.
pub fn write_tailwind_config(
    theme: &ThemeConfig,
    dir: impl AsRef<Utf8Path>,
) -> Result<Utf8PathBuf, PySmeError> {
    let target = dir.as_ref().join(TAILWIND_CONFIG_FILENAME);

    Reraise::new(ErrorKind::Build)
        .detail("path", target.as_str())
        .run(|| {
            let rendered =
                render_tailwind_config(theme).context("Failed to render Tailwind config")?;
            safe_write(&target, rendered.as_bytes())?;
            tracing::info!("Wrote {}", target);
            Ok(())
        })?;

    Ok(target)
}

fn indent(block: &str) -> String {
    block.replace('\n', "\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample_theme() -> ThemeConfig {
        ThemeConfig {
            content: ["**/*.pysme".to_string()].into_iter().collect(),
            theme: json!({ "extend": { "colors": { "primary": "#3b82f6" } } })
                .as_object()
                .cloned()
                .unwrap(),
            plugins: ["@tailwindcss/forms".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_render_includes_every_section() {
        let js = render_tailwind_config(&sample_theme()).unwrap();

        assert!(js.starts_with("/** @type {import('tailwindcss').Config} */"));
        assert!(js.contains("module.exports = {"));
        assert!(js.contains("\"**/*.pysme\""));
        assert!(js.contains("\"primary\": \"#3b82f6\""));
        assert!(js.contains("require(\"@tailwindcss/forms\"),"));
        assert!(js.trim_end().ends_with("};"));
    }

    #[test]
    fn test_render_without_plugins() {
        let js = render_tailwind_config(&ThemeConfig::default()).unwrap();
        assert!(js.contains("plugins: [],"));
        assert!(js.contains("theme: {},"));
    }

    #[test]
    fn test_write_tailwind_config() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let path = write_tailwind_config(&sample_theme(), dir.join("build")).unwrap();
        assert_eq!(path, dir.join("build").join(TAILWIND_CONFIG_FILENAME));
        assert!(fs::read_to_string(&path).unwrap().contains("@tailwindcss/forms"));
    }

    #[test]
    fn test_write_failure_is_build_error() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        // A regular file where the output directory should be
        let blocker = dir.join("build");
        fs::write(&blocker, "").unwrap();

        let err = write_tailwind_config(&sample_theme(), &blocker).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
        assert_eq!(
            err.details()["path"],
            blocker.join(TAILWIND_CONFIG_FILENAME).as_str()
        );
        assert!(err.cause().is_some());
    }
}
