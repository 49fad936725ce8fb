//! Filesystem helpers shared by the build pipeline and config resolution.

pub mod fs;
pub mod paths;

pub use fs::{read_json, read_yaml, safe_copy, safe_write, write_json, write_yaml};
pub use paths::{ensure_dir, project_root, resolve_path};
