//! Structured configuration records.
//!
//! - [`BuildConfig`]: WASM build settings (entry point, output dirs, optimization level)
//! - [`ThemeConfig`]: Tailwind content globs, theme extension tree and plugins
//!
//! Both records validate on construction from a mapping, so an invalid
//! optimization level or a mistyped field never makes it into a resolved
//! configuration.

pub mod build;
pub mod theme;

pub use build::{BuildConfig, OptimizationLevel, VALID_OPT_LEVELS};
pub use theme::{ThemeConfig, ThemeTree, deep_merge};
