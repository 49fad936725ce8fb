use crate::errors::{Details, PySmeError, config_validation_error};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Theme extension tree: string keys to arbitrarily nested JSON-like values.
pub type ThemeTree = Map<String, Value>;

/// Recursively merge `b` into a copy of `a`.
///
/// Keys holding a mapping on both sides merge further; any other overlap is
/// won by `b`. The result shares no structure with either input.
pub fn deep_merge(a: &ThemeTree, b: &ThemeTree) -> ThemeTree {
    let mut result = a.clone();
    for (key, incoming) in b {
        match (result.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                *existing = deep_merge(existing, incoming);
            }
            _ => {
                result.insert(key.clone(), incoming.clone());
            }
        }
    }
    result
}

/// CSS utility-framework (Tailwind) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Glob patterns of files scanned for class names.
    pub content: IndexSet<String>,
    pub theme: ThemeTree,
    pub plugins: IndexSet<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            content: ["**/*.pysme", "**/*.py"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            theme: ThemeTree::new(),
            plugins: IndexSet::new(),
        }
    }
}

impl ThemeConfig {
    /// Combine two configs into a new one; neither input is touched.
    ///
    /// Content globs and plugins are de-duplicated unions, the theme trees
    /// are [`deep_merge`]d with `other` winning conflicts.
    pub fn merge(&self, other: &ThemeConfig) -> ThemeConfig {
        ThemeConfig {
            content: self.content.union(&other.content).cloned().collect(),
            theme: deep_merge(&self.theme, &other.theme),
            plugins: self.plugins.union(&other.plugins).cloned().collect(),
        }
    }

    /// Build a config from a plain mapping. Absent keys become empty
    /// collections.
    pub fn from_mapping(mapping: &Map<String, Value>) -> Result<Self, PySmeError> {
        let mut errors = Details::new();

        let content = string_set(mapping, "content", &mut errors);
        let plugins = string_set(mapping, "plugins", &mut errors);
        let theme = match mapping.get("theme") {
            None | Some(Value::Null) => ThemeTree::new(),
            Some(Value::Object(tree)) => tree.clone(),
            Some(other) => {
                errors.insert(
                    "theme".to_string(),
                    format!("expected a mapping, found {}", value_kind(other)).into(),
                );
                ThemeTree::new()
            }
        };

        if !errors.is_empty() {
            return Err(config_validation_error(errors));
        }

        Ok(Self {
            content,
            theme,
            plugins,
        })
    }

    pub fn to_mapping(&self) -> Map<String, Value> {
        let mut mapping = Map::new();
        mapping.insert(
            "content".into(),
            self.content.iter().cloned().map(Value::String).collect(),
        );
        mapping.insert("theme".into(), Value::Object(self.theme.clone()));
        mapping.insert(
            "plugins".into(),
            self.plugins.iter().cloned().map(Value::String).collect(),
        );
        mapping
    }
}

fn string_set(
    mapping: &Map<String, Value>,
    key: &str,
    errors: &mut Details,
) -> IndexSet<String> {
    match mapping.get(key) {
        None | Some(Value::Null) => IndexSet::new(),
        Some(Value::Array(items)) => {
            let mut set = IndexSet::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => {
                        set.insert(s.clone());
                    }
                    other => {
                        errors.insert(
                            key.to_string(),
                            format!("expected strings, found {}", value_kind(other)).into(),
                        );
                    }
                }
            }
            set
        }
        Some(other) => {
            errors.insert(
                key.to_string(),
                format!("expected a list, found {}", value_kind(other)).into(),
            );
            IndexSet::new()
        }
    }
}

/// Human name of a JSON value's type, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
