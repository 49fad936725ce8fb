//! Error taxonomy shared by every PySme subsystem.
//!
//! Every failure is a [`PySmeError`]: one record shape (code, message,
//! details, hint, cause) plus HTTP status and a `safe` flag. The variants of
//! [`ErrorKind`] differ only in their default field values, so any error can
//! be serialized the same way and an HTTP boundary applies a single
//! redaction rule keyed on `safe`.
//!
//! # Examples
//!
//! ```
//! use pysme_config::errors::{ErrorKind, PySmeError};
//!
//! let err = PySmeError::new(ErrorKind::NotFound).with_message("No such page");
//! assert_eq!(err.to_string(), "PSME:API:404 - No such page");
//! assert!(err.safe());
//! ```

mod response;
mod wrap;

pub use response::{
    ErrorBody, GENERIC_ERROR_CODE, GENERIC_PUBLIC_MESSAGE, UNKNOWN_ERROR_CODE, convert_generic,
    map_to_response,
};
pub use wrap::Reraise;

use http::StatusCode;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Structured, non-user-facing debugging details attached to an error.
pub type Details = serde_json::Map<String, Value>;

/// The variants of the taxonomy. Each carries its own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Generic,
    Config,
    ConfigLoad,
    ConfigValidation,
    Build,
    Parser,
    Runtime,
    NotFound,
    Auth,
    Validation,
    Database,
}

impl ErrorKind {
    /// Stable machine-readable code, `DOMAIN:CATEGORY:NUMBER`.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Generic => "PSME:GEN:000",
            Self::Config => "PSME:CFG:001",
            Self::ConfigLoad => "PSME:CFG:002",
            Self::ConfigValidation => "PSME:CFG:003",
            Self::Build => "PSME:BLD:001",
            Self::Parser => "PSME:PAR:001",
            Self::Runtime => "PSME:RTE:001",
            Self::NotFound => "PSME:API:404",
            Self::Auth => "PSME:API:401",
            Self::Validation => "PSME:VAL:001",
            Self::Database => "PSME:DB:001",
        }
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Generic => "An unknown PySme error occurred",
            Self::Config => "Configuration error",
            Self::ConfigLoad => "Failed to load configuration file",
            Self::ConfigValidation => "Configuration validation failed",
            Self::Build => "Build/compile error",
            Self::Parser => "Parser error",
            Self::Runtime => "Runtime error in component",
            Self::NotFound => "Not found",
            Self::Auth => "Authentication / Authorization error",
            Self::Validation => "Validation error",
            Self::Database => "Database error",
        }
    }

    pub const fn default_hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigLoad => {
                Some("Check pysme.config.yaml for syntax errors or missing keys")
            }
            Self::ConfigValidation => Some("Fix the invalid configuration fields"),
            _ => None,
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Self::ConfigValidation | Self::Parser | Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Generic
            | Self::Config
            | Self::ConfigLoad
            | Self::Build
            | Self::Runtime
            | Self::Database => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether messages of this kind may be shown to end users verbatim.
    pub const fn safe(self) -> bool {
        matches!(
            self,
            Self::ConfigValidation
                | Self::Parser
                | Self::NotFound
                | Self::Auth
                | Self::Validation
        )
    }
}

/// The original failure that triggered a [`PySmeError`].
///
/// Kept for diagnostics only; it never takes part in equality.
pub struct Cause {
    type_name: Cow<'static, str>,
    error: Box<dyn StdError + Send + Sync + 'static>,
    backtrace: Option<String>,
}

impl Cause {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            type_name: Cow::Borrowed(short_type_name::<E>()),
            error: Box::new(error),
            backtrace: captured(&Backtrace::capture()),
        }
    }

    /// Capture an [`anyhow::Error`], keeping the backtrace anyhow recorded.
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        let type_name = anyhow_type_name(&error);
        let backtrace = captured(error.backtrace());
        Self {
            type_name: Cow::Borrowed(type_name),
            error: error.into(),
            backtrace,
        }
    }

    /// Short name of the failure's type, e.g. `Error` for `std::io::Error`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Formatted trace: the failure, its source chain, then the backtrace
    /// when one was captured.
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.type_name, self.error)];
        let mut source = self.error.source();
        while let Some(err) = source {
            lines.push(format!("Caused by: {err}"));
            source = err.source();
        }
        if let Some(backtrace) = &self.backtrace {
            lines.extend(backtrace.lines().map(str::to_string));
        }
        lines
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cause")
            .field("type_name", &self.type_name)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl StdError for Cause {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

/// A failure of the PySme taxonomy.
#[derive(Debug, Error)]
#[error("{code} - {message}")]
pub struct PySmeError {
    kind: ErrorKind,
    code: Cow<'static, str>,
    message: String,
    details: Details,
    hint: Option<String>,
    status: StatusCode,
    safe: bool,
    #[source]
    cause: Option<Cause>,
}

impl PySmeError {
    /// Create an error carrying all of `kind`'s defaults.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            code: Cow::Borrowed(kind.code()),
            message: kind.default_message().to_string(),
            details: Details::new(),
            hint: kind.default_hint().map(str::to_string),
            status: kind.status(),
            safe: kind.safe(),
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn safe(&self) -> bool {
        self.safe
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Merge `extra` into the details; keys in `extra` win.
    pub fn merge_details(&mut self, extra: Details) {
        self.details.extend(extra);
    }
}

impl PartialEq for PySmeError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.code == other.code
            && self.message == other.message
            && self.details == other.details
            && self.hint == other.hint
            && self.status == other.status
            && self.safe == other.safe
    }
}

/// Error raised when a config file exists but cannot be loaded.
pub fn config_load_error(path: &str, cause: Option<Cause>) -> PySmeError {
    let err = PySmeError::new(ErrorKind::ConfigLoad)
        .with_message(format!("Failed to load config at {path}"))
        .with_detail("path", path);
    match cause {
        Some(cause) => err.with_cause(cause),
        None => err,
    }
}

/// Error raised when configuration values are structurally invalid.
pub fn config_validation_error(errors: Details) -> PySmeError {
    PySmeError::new(ErrorKind::ConfigValidation)
        .with_message("Config validation failed")
        .with_details(errors)
}

fn captured(backtrace: &Backtrace) -> Option<String> {
    (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string())
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// anyhow erases the concrete type; recover the common ones for diagnostics.
fn anyhow_type_name(error: &anyhow::Error) -> &'static str {
    if error.is::<std::io::Error>() {
        short_type_name::<std::io::Error>()
    } else if error.is::<serde_yaml_ng::Error>() {
        "YamlError"
    } else if error.is::<serde_json::Error>() {
        "JsonError"
    } else if error.is::<PySmeError>() {
        "PySmeError"
    } else {
        "Error"
    }
}
