// PySme config - configuration resolution engine for the PySme framework
//
// Loads a user config script, extracts typed build and Tailwind configs,
// layers PYSME_* environment overrides on top, and reports failures through
// the shared error taxonomy.

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{
    ConfigLoader, DEFAULT_CONFIG_FILENAME, LoadedConfigs, ResolveState, load_pysme_config,
    reload_pysme_config,
};
pub use errors::{ErrorKind, PySmeError, Reraise};
pub use models::{BuildConfig, OptimizationLevel, ThemeConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
