//! Environment variable overrides.
//!
//! Every recognized `PYSME_*` variable maps to one config field and one
//! parser. A variable that is unset, empty or unparseable leaves its field
//! alone; nothing here ever fails.

use crate::models::{BuildConfig, OptimizationLevel, ThemeConfig, ThemeTree};
use serde_json::Value;
use std::collections::HashMap;

pub const ENV_ENTRY_POINT: &str = "PYSME_ENTRY_POINT";
pub const ENV_OUTPUT_DIR: &str = "PYSME_OUTPUT_DIR";
pub const ENV_STATIC_DIR: &str = "PYSME_STATIC_DIR";
pub const ENV_WASM_TARGET: &str = "PYSME_WASM_TARGET";
pub const ENV_OPT_LEVEL: &str = "PYSME_OPT_LEVEL";
pub const ENV_BUNDLE_SPLITTING: &str = "PYSME_BUNDLE_SPLITTING";
pub const ENV_TREE_SHAKING: &str = "PYSME_TREE_SHAKING";
pub const ENV_TAILWIND_CONTENT: &str = "PYSME_TAILWIND_CONTENT";
pub const ENV_TAILWIND_THEME: &str = "PYSME_TAILWIND_THEME";
pub const ENV_TAILWIND_PLUGINS: &str = "PYSME_TAILWIND_PLUGINS";
pub const ENV_DEBUG: &str = "PYSME_DEBUG";
pub const ENV_LOG_LEVEL: &str = "PYSME_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "PYSME_LOG_JSON";

/// Where environment variables are read from.
#[cfg_attr(test, mockall::automock)]
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// Parse a boolean flag: `1/true/yes/on` or `0/false/no/off`, any case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated list, trimming items and dropping empty ones.
pub fn parse_list(value: &str) -> Option<Vec<String>> {
    if value.is_empty() {
        return None;
    }
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Parse a JSON object. Invalid JSON or a non-object is logged and ignored.
pub fn parse_json_object(value: &str) -> Option<ThemeTree> {
    if value.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(value) {
        Ok(Value::Object(tree)) => Some(tree),
        Ok(_) => {
            tracing::warn!("Expected a JSON object in env var: {:?}", value);
            None
        }
        Err(err) => {
            tracing::warn!("Invalid JSON in env var: {:?} ({})", value, err);
            None
        }
    }
}

fn parse_opt_level(value: &str) -> Option<OptimizationLevel> {
    match value.parse() {
        Ok(level) => Some(level),
        Err(err) => {
            tracing::warn!("Ignoring {}: {}", ENV_OPT_LEVEL, err);
            None
        }
    }
}

/// Mutable view of the two records an override may touch.
pub struct Targets<'a> {
    pub build: &'a mut BuildConfig,
    pub theme: &'a mut ThemeConfig,
}

/// Apply one raw value to its field; returns whether anything changed.
pub type Apply = fn(&mut Targets<'_>, &str) -> bool;

fn set_entry_point(t: &mut Targets<'_>, v: &str) -> bool {
    t.build.entry_point = v.to_string();
    true
}

fn set_output_dir(t: &mut Targets<'_>, v: &str) -> bool {
    t.build.output_dir = v.to_string();
    true
}

fn set_static_dir(t: &mut Targets<'_>, v: &str) -> bool {
    t.build.static_dir = v.to_string();
    true
}

fn set_wasm_target(t: &mut Targets<'_>, v: &str) -> bool {
    t.build.wasm_target = v.to_string();
    true
}

fn set_opt_level(t: &mut Targets<'_>, v: &str) -> bool {
    let Some(level) = parse_opt_level(v) else {
        return false;
    };
    t.build.optimization_level = level;
    true
}

fn set_bundle_splitting(t: &mut Targets<'_>, v: &str) -> bool {
    let Some(flag) = parse_bool(v) else {
        return false;
    };
    t.build.bundle_splitting = flag;
    true
}

fn set_tree_shaking(t: &mut Targets<'_>, v: &str) -> bool {
    let Some(flag) = parse_bool(v) else {
        return false;
    };
    t.build.tree_shaking = flag;
    true
}

fn set_content(t: &mut Targets<'_>, v: &str) -> bool {
    let Some(list) = parse_list(v) else {
        return false;
    };
    t.theme.content = list.into_iter().collect();
    true
}

// Replaces the tree wholesale; only ThemeConfig::merge deep-merges.
fn set_theme(t: &mut Targets<'_>, v: &str) -> bool {
    let Some(tree) = parse_json_object(v) else {
        return false;
    };
    t.theme.theme = tree;
    true
}

fn set_plugins(t: &mut Targets<'_>, v: &str) -> bool {
    let Some(list) = parse_list(v) else {
        return false;
    };
    t.theme.plugins = list.into_iter().collect();
    true
}

/// Variable name to field setter, applied in this order.
pub const ENV_OVERRIDES: [(&str, Apply); 10] = [
    (ENV_ENTRY_POINT, set_entry_point),
    (ENV_OUTPUT_DIR, set_output_dir),
    (ENV_STATIC_DIR, set_static_dir),
    (ENV_WASM_TARGET, set_wasm_target),
    (ENV_OPT_LEVEL, set_opt_level),
    (ENV_BUNDLE_SPLITTING, set_bundle_splitting),
    (ENV_TREE_SHAKING, set_tree_shaking),
    (ENV_TAILWIND_CONTENT, set_content),
    (ENV_TAILWIND_THEME, set_theme),
    (ENV_TAILWIND_PLUGINS, set_plugins),
];

/// Apply every recognized override from `env` onto the two configs.
///
/// Returns the names of the variables that took effect.
pub fn apply_env_overrides(
    build: &mut BuildConfig,
    theme: &mut ThemeConfig,
    env: &impl EnvSource,
) -> Vec<&'static str> {
    let mut targets = Targets { build, theme };
    let mut applied = Vec::new();

    for (name, apply) in ENV_OVERRIDES {
        let Some(raw) = env.var(name).filter(|v| !v.is_empty()) else {
            continue;
        };
        if apply(&mut targets, &raw) {
            applied.push(name);
        }
    }

    if !applied.is_empty() {
        tracing::debug!("Applied env overrides: {}", applied.join(", "));
    }
    applied
}

/// Debug flag from `PYSME_DEBUG`, if set to a recognized boolean.
pub fn debug_from_env(env: &impl EnvSource) -> Option<bool> {
    env.var(ENV_DEBUG).as_deref().and_then(parse_bool)
}
