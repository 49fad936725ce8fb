//! Services that consume resolved configuration.
//!
//! # Modules
//!
//! - [`tailwind`]: Emits `tailwind.config.js` for the CSS pipeline from a
//!   resolved [`ThemeConfig`](crate::models::ThemeConfig)
//!
//! # Typical Flow
//!
//! ```ignore
//! use pysme_config::config::load_pysme_config;
//! use pysme_config::services::tailwind::write_tailwind_config;
//!
//! let configs = load_pysme_config("pysme.config.yaml", true)?;
//! let path = write_tailwind_config(configs.theme(), &configs.build().output_dir)?;
//! ```

pub mod tailwind;

pub use tailwind::{TAILWIND_CONFIG_FILENAME, render_tailwind_config, write_tailwind_config};
