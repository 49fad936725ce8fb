use crate::errors::{Details, ErrorKind, PySmeError, config_validation_error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Recognized values for [`BuildConfig::optimization_level`].
pub const VALID_OPT_LEVELS: [&str; 2] = ["release", "debug"];

/// Optimization level of a WASM build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptimizationLevel {
    #[default]
    Release,
    Debug,
}

impl OptimizationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationLevel {
    type Err = PySmeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(Self::Release),
            "debug" => Ok(Self::Debug),
            other => Err(PySmeError::new(ErrorKind::ConfigValidation)
                .with_message(format!(
                    "Invalid optimization_level={other:?}. Valid values: {}",
                    VALID_OPT_LEVELS.join(", ")
                ))
                .with_detail("optimization_level", other)),
        }
    }
}

impl TryFrom<String> for OptimizationLevel {
    type Error = PySmeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptimizationLevel> for String {
    fn from(level: OptimizationLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Build settings for compiling an app to WASM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub entry_point: String,
    pub output_dir: String,
    pub static_dir: String,
    pub wasm_target: String,
    pub optimization_level: OptimizationLevel,
    pub bundle_splitting: bool,
    pub tree_shaking: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry_point: "pages/index.component.pysme".to_string(),
            output_dir: "dist".to_string(),
            static_dir: "static".to_string(),
            wasm_target: "web".to_string(),
            optimization_level: OptimizationLevel::Release,
            bundle_splitting: false,
            tree_shaking: false,
        }
    }
}

impl BuildConfig {
    /// Field names accepted by [`BuildConfig::from_mapping`].
    pub const FIELDS: [&'static str; 7] = [
        "entry_point",
        "output_dir",
        "static_dir",
        "wasm_target",
        "optimization_level",
        "bundle_splitting",
        "tree_shaking",
    ];

    /// Build a config from a plain mapping.
    ///
    /// Unrecognized keys are dropped without complaint; absent keys take
    /// their defaults. A bad optimization level or a mistyped value is a
    /// `ConfigValidation` error.
    pub fn from_mapping(mapping: &serde_json::Map<String, Value>) -> Result<Self, PySmeError> {
        let filtered: serde_json::Map<String, Value> = mapping
            .iter()
            .filter(|(key, _)| Self::FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        // The level gets its own check so the error names the bad value.
        if let Some(Value::String(level)) = filtered.get("optimization_level") {
            level.parse::<OptimizationLevel>()?;
        }

        serde_json::from_value(Value::Object(filtered)).map_err(|err| {
            let mut errors = Details::new();
            errors.insert("build_config".to_string(), Value::String(err.to_string()));
            config_validation_error(errors)
        })
    }

    pub fn to_mapping(&self) -> serde_json::Map<String, Value> {
        let mut mapping = serde_json::Map::new();
        mapping.insert("entry_point".into(), self.entry_point.clone().into());
        mapping.insert("output_dir".into(), self.output_dir.clone().into());
        mapping.insert("static_dir".into(), self.static_dir.clone().into());
        mapping.insert("wasm_target".into(), self.wasm_target.clone().into());
        mapping.insert(
            "optimization_level".into(),
            self.optimization_level.as_str().into(),
        );
        mapping.insert("bundle_splitting".into(), self.bundle_splitting.into());
        mapping.insert("tree_shaking".into(), self.tree_shaking.into());
        mapping
    }
}
