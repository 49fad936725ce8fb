//! Configuration resolution.
//!
//! Resolution turns a user config script plus `PYSME_*` environment
//! variables into a [`LoadedConfigs`] bundle:
//!
//! 1. Execute the script in a fresh namespace (a missing script means defaults)
//! 2. Extract `build_config` and `tailwind_config` as typed records
//! 3. Layer environment overrides on top
//! 4. Reconfigure logging from the `debug` binding or `PYSME_DEBUG`
//!
//! Only a mistyped `build_config`/`tailwind_config` binding is fatal. A
//! script that fails to execute is logged and degrades to defaults so a dev
//! or build loop keeps running.

pub mod env;
pub mod script;

use crate::errors::{ErrorKind, PySmeError, Reraise, config_validation_error};
use crate::logging::{LogSettings, configure_logging, debug_dump};
use crate::models::{BuildConfig, ThemeConfig};
use crate::utils::paths::project_root;
use camino::{Utf8Path, Utf8PathBuf};
use env::{EnvSource, ProcessEnv, apply_env_overrides, debug_from_env};
use script::{BUILD_CONFIG_VAR, DEBUG_VAR, Namespace, ScriptValue, THEME_CONFIG_VAR};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

/// Conventional name of the config script.
pub const DEFAULT_CONFIG_FILENAME: &str = "pysme.config.yaml";

/// Logical module identity under which script executions are cached.
pub const MODULE_NAME: &str = "pysme_user_config";

/// Lifecycle of a [`ConfigLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    NotLoaded,
    Resolving,
    Resolved,
    /// A binding had the wrong type; the last resolve returned an error.
    Failed,
}

/// Result of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfigs {
    build: BuildConfig,
    theme: ThemeConfig,
    raw: Option<Namespace>,
    debug: Option<bool>,
}

impl LoadedConfigs {
    fn defaults() -> Self {
        Self {
            build: BuildConfig::default(),
            theme: ThemeConfig::default(),
            raw: None,
            debug: None,
        }
    }

    pub fn build(&self) -> &BuildConfig {
        &self.build
    }

    pub fn theme(&self) -> &ThemeConfig {
        &self.theme
    }

    /// Public (non `_`-prefixed) script bindings, `None` when no script ran.
    pub fn raw(&self) -> Option<&Namespace> {
        self.raw.as_ref()
    }

    /// Debug flag in effect: the script's `debug` binding, else `PYSME_DEBUG`.
    pub fn debug(&self) -> Option<bool> {
        self.debug
    }

    pub fn into_parts(self) -> (BuildConfig, ThemeConfig, Option<Namespace>) {
        (self.build, self.theme, self.raw)
    }
}

#[derive(Debug)]
struct CachedModule {
    path: Utf8PathBuf,
    namespace: Namespace,
}

/// Resolves config scripts and keeps the last execution cached.
///
/// Not safe to share between concurrent resolutions: logging is a
/// process-wide side effect. Use [`load_pysme_config`] for a serialized,
/// process-wide loader.
#[derive(Debug)]
pub struct ConfigLoader<E: EnvSource = ProcessEnv> {
    env: E,
    modules: HashMap<String, CachedModule>,
    state: ResolveState,
}

impl ConfigLoader<ProcessEnv> {
    pub fn new() -> Self {
        Self::with_env(ProcessEnv)
    }
}

impl Default for ConfigLoader<ProcessEnv> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EnvSource> ConfigLoader<E> {
    pub fn with_env(env: E) -> Self {
        Self {
            env,
            modules: HashMap::new(),
            state: ResolveState::NotLoaded,
        }
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    /// Namespace of the last successful execution, with the script path.
    pub fn cached_module(&self) -> Option<(&Utf8Path, &Namespace)> {
        self.modules
            .get(MODULE_NAME)
            .map(|module| (module.path.as_path(), &module.namespace))
    }

    /// Resolve the config script at `path`.
    ///
    /// # Errors
    ///
    /// A `ConfigValidation` error when `build_config` or `tailwind_config`
    /// is bound to something that is neither its record type nor a mapping,
    /// or a mapping that fails validation. Every other problem degrades to
    /// defaults.
    pub fn resolve(
        &mut self,
        path: impl AsRef<Utf8Path>,
        apply_env: bool,
    ) -> Result<LoadedConfigs, PySmeError> {
        let path = path.as_ref();
        self.state = ResolveState::Resolving;

        if !path.exists() {
            tracing::info!("No {} found, using default config", path);
            let mut configs = LoadedConfigs::defaults();
            if apply_env {
                apply_env_overrides(&mut configs.build, &mut configs.theme, &self.env);
            }
            configs.debug = debug_from_env(&self.env);
            self.configure_logging(configs.debug);
            self.state = ResolveState::Resolved;
            return Ok(configs);
        }

        if self.modules.remove(MODULE_NAME).is_some() {
            tracing::debug!("Discarded cached {} before executing {}", MODULE_NAME, path);
        }

        let executed = Reraise::new(ErrorKind::ConfigLoad)
            .message(format!("Failed to load config at {}", path))
            .detail("path", path.as_str())
            .run(|| script::execute(path));

        let namespace = match executed {
            Ok(namespace) => namespace,
            Err(err) => {
                let trace = err.to_body(true).traceback.unwrap_or_default();
                tracing::error!(
                    code = err.code(),
                    trace = ?trace,
                    "Error executing config file {}: {}",
                    path,
                    err.cause().map_or_else(|| err.to_string(), ToString::to_string)
                );
                self.state = ResolveState::Resolved;
                return Ok(LoadedConfigs::defaults());
            }
        };

        let extracted = extract_build(namespace.get(BUILD_CONFIG_VAR)).and_then(|build| {
            extract_theme(namespace.get(THEME_CONFIG_VAR)).map(|theme| (build, theme))
        });
        let (mut build, mut theme) = match extracted {
            Ok(configs) => configs,
            Err(err) => {
                self.state = ResolveState::Failed;
                return Err(err.with_detail("path", path.as_str()));
            }
        };

        if apply_env {
            apply_env_overrides(&mut build, &mut theme, &self.env);
        }

        let debug = match namespace.get(DEBUG_VAR) {
            None | Some(ScriptValue::Data(Value::Null)) => debug_from_env(&self.env),
            Some(flag) => Some(flag.is_truthy()),
        };
        self.configure_logging(debug);

        let raw: Namespace = namespace
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        self.modules.insert(
            MODULE_NAME.to_string(),
            CachedModule {
                path: path.to_path_buf(),
                namespace,
            },
        );

        tracing::info!("Loaded config from {}", path);
        debug_dump(&build, "Build config");
        debug_dump(&theme, "Tailwind config");
        self.state = ResolveState::Resolved;
        Ok(LoadedConfigs {
            build,
            theme,
            raw: Some(raw),
            debug,
        })
    }

    /// Re-read a changed script. Nothing from an earlier execution is reused.
    pub fn reload(
        &mut self,
        path: impl AsRef<Utf8Path>,
        apply_env: bool,
    ) -> Result<LoadedConfigs, PySmeError> {
        self.resolve(path, apply_env)
    }

    // Best-effort: a failure falls back to default settings and never
    // aborts resolution.
    fn configure_logging(&self, debug: Option<bool>) {
        let settings = LogSettings::resolve(None, debug, None, &self.env);
        if let Err(err) = configure_logging(&settings) {
            tracing::warn!("Failed to configure logging ({:#}), using defaults", err);
            if let Err(err) = configure_logging(&LogSettings::default()) {
                tracing::debug!("Default logging configuration unavailable: {:#}", err);
            }
        }
    }
}

fn type_mismatch(variable: &str, expected: &str, found: &str) -> PySmeError {
    let mut errors = crate::errors::Details::new();
    errors.insert("variable".to_string(), variable.into());
    errors.insert("expected".to_string(), expected.into());
    errors.insert("found".to_string(), found.into());
    config_validation_error(errors).with_message(format!(
        "{variable} in {DEFAULT_CONFIG_FILENAME} must be {expected}, found {found}"
    ))
}

fn extract_build(value: Option<&ScriptValue>) -> Result<BuildConfig, PySmeError> {
    match value {
        None | Some(ScriptValue::Data(Value::Null)) => Ok(BuildConfig::default()),
        Some(ScriptValue::Build(config)) => Ok(config.clone()),
        Some(ScriptValue::Data(Value::Object(mapping))) => BuildConfig::from_mapping(mapping),
        Some(other) => Err(type_mismatch(
            BUILD_CONFIG_VAR,
            "BuildConfig or mapping",
            other.type_name(),
        )),
    }
}

fn extract_theme(value: Option<&ScriptValue>) -> Result<ThemeConfig, PySmeError> {
    match value {
        None | Some(ScriptValue::Data(Value::Null)) => Ok(ThemeConfig::default()),
        Some(ScriptValue::Theme(config)) => Ok(config.clone()),
        Some(ScriptValue::Data(Value::Object(mapping))) => ThemeConfig::from_mapping(mapping),
        Some(other) => Err(type_mismatch(
            THEME_CONFIG_VAR,
            "ThemeConfig or mapping",
            other.type_name(),
        )),
    }
}

static LOADER: LazyLock<Mutex<ConfigLoader>> = LazyLock::new(|| Mutex::new(ConfigLoader::new()));

/// Resolve `config_path` with the process-wide loader.
///
/// Calls are serialized, so overlapping file-watch reloads cannot interleave
/// their logging reconfiguration.
pub fn load_pysme_config(
    config_path: impl AsRef<Utf8Path>,
    apply_env: bool,
) -> Result<LoadedConfigs, PySmeError> {
    LOADER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .resolve(config_path, apply_env)
}

/// Re-read a changed config script with the process-wide loader.
pub fn reload_pysme_config(
    config_path: impl AsRef<Utf8Path>,
    apply_env: bool,
) -> Result<LoadedConfigs, PySmeError> {
    LOADER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .reload(config_path, apply_env)
}

/// `pysme.config.yaml` at the project root.
pub fn default_config_path() -> Utf8PathBuf {
    project_root().join(DEFAULT_CONFIG_FILENAME)
}
