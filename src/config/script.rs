//! Config script execution.
//!
//! A config script is a YAML document whose top-level keys are bindings.
//! Executing it parses the document, expands anchors and merge keys (`<<`),
//! and binds every top-level name into a fresh [`Namespace`]. Values tagged
//! `!BuildConfig`, `!ThemeConfig` or `!TailwindConfig` are constructed as
//! typed records while executing; everything else stays plain data.
//!
//! ```yaml
//! _shared: &shared
//!   output_dir: dist
//!
//! build_config: !BuildConfig
//!   <<: *shared
//!   optimization_level: debug
//!
//! tailwind_config:
//!   content: ["**/*.pysme"]
//!   theme: { extend: { colors: { primary: "#3b82f6" } } }
//!
//! debug: true
//! ```

use crate::models::theme::value_kind;
use crate::models::{BuildConfig, ThemeConfig};
use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use serde_yaml_ng::Value as YamlValue;
use std::fs;

/// Binding holding the build configuration.
pub const BUILD_CONFIG_VAR: &str = "build_config";
/// Binding holding the Tailwind theme configuration.
pub const THEME_CONFIG_VAR: &str = "tailwind_config";
/// Optional binding holding the debug flag.
pub const DEBUG_VAR: &str = "debug";

const THEME_FIELDS: [&str; 3] = ["content", "theme", "plugins"];

/// A value bound by a config script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Build(BuildConfig),
    Theme(ThemeConfig),
    Data(Value),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Build(_) => "BuildConfig",
            Self::Theme(_) => "ThemeConfig",
            Self::Data(value) => value_kind(value),
        }
    }

    /// Plain-data view of the value; records become mappings.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Build(config) => Value::Object(config.to_mapping()),
            Self::Theme(config) => Value::Object(config.to_mapping()),
            Self::Data(value) => value.clone(),
        }
    }

    /// Truthiness: null, false, zero and empty strings/collections are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Build(_) | Self::Theme(_) => true,
            Self::Data(Value::Null) => false,
            Self::Data(Value::Bool(b)) => *b,
            Self::Data(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::Data(Value::String(s)) => !s.is_empty(),
            Self::Data(Value::Array(items)) => !items.is_empty(),
            Self::Data(Value::Object(map)) => !map.is_empty(),
        }
    }
}

/// Top-level bindings produced by one script execution, in source order.
pub type Namespace = IndexMap<String, ScriptValue>;

/// Read and execute the script at `path`.
pub fn execute(path: &Utf8Path) -> Result<Namespace> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config script: {}", path))?;
    evaluate(&source).with_context(|| format!("Failed to execute config script: {}", path))
}

/// Execute script source into a fresh namespace.
pub fn evaluate(source: &str) -> Result<Namespace> {
    let mut document: YamlValue =
        serde_yaml_ng::from_str(source).context("Config script is not valid YAML")?;
    document
        .apply_merge()
        .context("Failed to expand merge keys")?;

    let bindings = match document {
        YamlValue::Null => return Ok(Namespace::new()),
        YamlValue::Mapping(bindings) => bindings,
        other => bail!(
            "Config script must bind names at the top level, found {}",
            yaml_kind(&other)
        ),
    };

    let mut namespace = Namespace::with_capacity(bindings.len());
    for (key, value) in bindings {
        let YamlValue::String(name) = key else {
            bail!("Binding names must be strings, found {}", yaml_kind(&key));
        };
        let bound = bind(value).with_context(|| format!("Failed to evaluate `{}`", name))?;
        namespace.insert(name, bound);
    }

    tracing::debug!("Config script bound {} names", namespace.len());
    Ok(namespace)
}

fn bind(value: YamlValue) -> Result<ScriptValue> {
    let tagged = match value {
        YamlValue::Tagged(tagged) => tagged,
        plain => return Ok(ScriptValue::Data(to_data(&plain)?)),
    };

    let tag = tagged.tag.to_string();
    let fields = match to_data(&tagged.value)? {
        Value::Null => Map::new(),
        Value::Object(fields) => fields,
        other => bail!("{} expects a mapping of fields, found {}", tag, value_kind(&other)),
    };

    match tag.trim_start_matches('!') {
        "BuildConfig" => build_record(fields).map(ScriptValue::Build),
        "ThemeConfig" | "TailwindConfig" => theme_record(fields).map(ScriptValue::Theme),
        _ => bail!("Unknown record type {}", tag),
    }
}

fn build_record(fields: Map<String, Value>) -> Result<BuildConfig> {
    reject_unknown("BuildConfig", &fields, &BuildConfig::FIELDS)?;
    Ok(BuildConfig::from_mapping(&fields)?)
}

// Absent fields keep the record defaults, unlike ThemeConfig::from_mapping.
fn theme_record(fields: Map<String, Value>) -> Result<ThemeConfig> {
    reject_unknown("ThemeConfig", &fields, &THEME_FIELDS)?;
    let parsed = ThemeConfig::from_mapping(&fields)?;

    let mut record = ThemeConfig::default();
    if fields.contains_key("content") {
        record.content = parsed.content;
    }
    if fields.contains_key("theme") {
        record.theme = parsed.theme;
    }
    if fields.contains_key("plugins") {
        record.plugins = parsed.plugins;
    }
    Ok(record)
}

fn reject_unknown(record: &str, fields: &Map<String, Value>, allowed: &[&str]) -> Result<()> {
    if let Some(unknown) = fields.keys().find(|key| !allowed.contains(&key.as_str())) {
        bail!("{} got an unexpected field `{}`", record, unknown);
    }
    Ok(())
}

fn to_data(value: &YamlValue) -> Result<Value> {
    reject_nested_tags(value)?;
    serde_json::to_value(value).context("Value cannot be represented as plain data")
}

// Tags construct records only on a top-level binding; anywhere else they
// would serialize as a `"!Tag"` key.
fn reject_nested_tags(value: &YamlValue) -> Result<()> {
    match value {
        YamlValue::Tagged(tagged) => bail!(
            "Tag {} is only allowed on a top-level binding",
            tagged.tag
        ),
        YamlValue::Sequence(items) => items.iter().try_for_each(reject_nested_tags),
        YamlValue::Mapping(mapping) => mapping.iter().try_for_each(|(key, value)| {
            reject_nested_tags(key)?;
            reject_nested_tags(value)
        }),
        _ => Ok(()),
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "boolean",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "list",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, PySmeError};
    use crate::models::OptimizationLevel;
    use camino::Utf8PathBuf;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_plain_bindings_keep_source_order() {
        let ns = evaluate(
            r#"
build_config:
  optimization_level: debug
site_name: Demo
_private: 1
debug: false
"#,
        )
        .unwrap();

        let names: Vec<&str> = ns.keys().map(String::as_str).collect();
        assert_eq!(names, ["build_config", "site_name", "_private", "debug"]);
        assert_eq!(
            ns["build_config"],
            ScriptValue::Data(json!({ "optimization_level": "debug" }))
        );
        assert_eq!(ns["site_name"].type_name(), "string");
    }

    #[test]
    fn test_empty_script_binds_nothing() {
        assert!(evaluate("").unwrap().is_empty());
        assert!(evaluate("# nothing configured yet\n").unwrap().is_empty());
    }

    #[test]
    fn test_tagged_build_record() {
        let ns = evaluate(
            r#"
build_config: !BuildConfig
  output_dir: out
  optimization_level: debug
  tree_shaking: true
"#,
        )
        .unwrap();

        let ScriptValue::Build(config) = &ns[BUILD_CONFIG_VAR] else {
            panic!("expected a BuildConfig record, got {:?}", ns[BUILD_CONFIG_VAR]);
        };
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.optimization_level, OptimizationLevel::Debug);
        assert!(config.tree_shaking);
        assert_eq!(config.static_dir, "static");
    }

    #[test]
    fn test_tagged_theme_record_keeps_record_defaults() {
        let ns = evaluate(
            r#"
tailwind_config: !TailwindConfig
  plugins: ["@tailwindcss/forms"]
"#,
        )
        .unwrap();

        let ScriptValue::Theme(config) = &ns[THEME_CONFIG_VAR] else {
            panic!("expected a ThemeConfig record");
        };
        assert_eq!(config.content, ThemeConfig::default().content);
        assert!(config.plugins.contains("@tailwindcss/forms"));
    }

    #[test]
    fn test_merge_keys_are_expanded() {
        let ns = evaluate(
            r#"
_base: &base
  output_dir: dist
  wasm_target: bundler
build_config:
  <<: *base
  optimization_level: debug
"#,
        )
        .unwrap();

        assert_eq!(
            ns["build_config"].to_value(),
            json!({ "output_dir": "dist", "wasm_target": "bundler", "optimization_level": "debug" })
        );
    }

    #[test]
    fn test_record_with_unknown_field_fails() {
        let err = evaluate("build_config: !BuildConfig\n  minify: true\n").unwrap_err();
        assert!(format!("{:#}", err).contains("unexpected field `minify`"));
    }

    #[test]
    fn test_record_with_invalid_level_fails_with_validation_error() {
        let err = evaluate("build_config: !BuildConfig\n  optimization_level: turbo\n").unwrap_err();
        let validation = err.downcast_ref::<PySmeError>().expect("validation error in chain");
        assert_eq!(validation.kind(), ErrorKind::ConfigValidation);
    }

    #[test]
    fn test_structural_failures() {
        assert!(evaluate("- just\n- a list\n").is_err());
        assert!(evaluate("1: one\n").is_err());
        assert!(evaluate("x: !Mystery {}\n").is_err());
        assert!(evaluate("build_config: [unclosed\n").is_err());
    }

    #[test]
    fn test_nested_tags_fail() {
        let err = evaluate("tailwind_config:\n  theme: { colors: !Foo { a: 1 } }\n").unwrap_err();
        assert!(format!("{:#}", err).contains("only allowed on a top-level binding"));

        assert!(evaluate("routes: [!BuildConfig {}]\n").is_err());
        assert!(evaluate("build_config: !BuildConfig\n  output_dir: !Foo dist\n").is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(!ScriptValue::Data(Value::Null).is_truthy());
        assert!(!ScriptValue::Data(json!(0)).is_truthy());
        assert!(!ScriptValue::Data(json!("")).is_truthy());
        assert!(ScriptValue::Data(json!(1)).is_truthy());
        assert!(ScriptValue::Data(json!("yes")).is_truthy());
        assert!(ScriptValue::Build(BuildConfig::default()).is_truthy());
    }

    #[test]
    fn test_execute_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let path = dir.join("pysme.config.yaml");
        fs::write(&path, "debug: true\n").unwrap();

        let ns = execute(&path).unwrap();
        assert!(ns[DEBUG_VAR].is_truthy());

        let missing = execute(&dir.join("missing.yaml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read config script"));
    }
}
