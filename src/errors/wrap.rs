use super::{Cause, Details, ErrorKind, PySmeError};
use serde_json::Value;

/// Scoped wrap-and-reraise.
///
/// Runs an operation and converts any failure outside the taxonomy into a
/// [`PySmeError`] of the configured kind, keeping the original as its cause.
/// A failure that already is a [`PySmeError`] keeps propagating as-is, with
/// the scope's details merged into it.
///
/// ```
/// use pysme_config::errors::{ErrorKind, Reraise};
///
/// let result: Result<String, _> = Reraise::new(ErrorKind::ConfigLoad)
///     .detail("path", "missing.yaml")
///     .run(|| Ok(std::fs::read_to_string("missing.yaml")?));
///
/// let err = result.unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::ConfigLoad);
/// assert_eq!(err.details()["path"], "missing.yaml");
/// ```
#[derive(Debug, Clone)]
pub struct Reraise {
    kind: ErrorKind,
    message: Option<String>,
    details: Details,
}

impl Reraise {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            details: Details::new(),
        }
    }

    /// Message for wrapped errors. Without one, the original failure's
    /// message is used.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn details(mut self, details: Details) -> Self {
        self.details.extend(details);
        self
    }

    pub fn run<T, F>(&self, op: F) -> Result<T, PySmeError>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        op().map_err(|err| self.reraise(err))
    }

    fn reraise(&self, error: anyhow::Error) -> PySmeError {
        match error.downcast::<PySmeError>() {
            Ok(mut known) => {
                if !self.details.is_empty() {
                    known.merge_details(self.details.clone());
                }
                known
            }
            Err(foreign) => {
                let message = self.message.clone().unwrap_or_else(|| foreign.to_string());
                PySmeError::new(self.kind)
                    .with_message(message)
                    .with_details(self.details.clone())
                    .with_cause(Cause::from_anyhow(foreign))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, bail};

    #[test]
    fn test_success_passes_through() {
        let value = Reraise::new(ErrorKind::Build).run(|| Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_foreign_failure_is_wrapped() {
        let err = Reraise::new(ErrorKind::Build)
            .detail("target", "web")
            .run(|| -> anyhow::Result<()> { bail!("linker exited with 1") })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Build);
        assert_eq!(err.code(), "PSME:BLD:001");
        assert_eq!(err.message(), "linker exited with 1");
        assert_eq!(err.details()["target"], "web");
        assert_eq!(err.cause().unwrap().to_string(), "linker exited with 1");
    }

    #[test]
    fn test_message_override() {
        let err = Reraise::new(ErrorKind::ConfigLoad)
            .message("Failed to load config at app.yaml")
            .run(|| -> anyhow::Result<()> {
                Err(std::io::Error::other("permission denied")).context("reading app.yaml")
            })
            .unwrap_err();

        assert_eq!(err.message(), "Failed to load config at app.yaml");
        let trace = err.cause().unwrap().trace();
        assert_eq!(trace[0], "Error: reading app.yaml");
        assert_eq!(trace[1], "Caused by: permission denied");
    }

    #[test]
    fn test_taxonomy_failure_keeps_identity_and_merges_details() {
        let err = Reraise::new(ErrorKind::ConfigLoad)
            .detail("path", "pysme.config.yaml")
            .run(|| -> anyhow::Result<()> {
                Err(PySmeError::new(ErrorKind::ConfigValidation)
                    .with_message("bad level")
                    .with_detail("field", "optimization_level")
                    .into())
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigValidation);
        assert_eq!(err.message(), "bad level");
        assert!(err.cause().is_none());
        assert_eq!(err.details()["field"], "optimization_level");
        assert_eq!(err.details()["path"], "pysme.config.yaml");
    }

    #[test]
    fn test_nested_scopes_do_not_double_wrap() {
        let inner = Reraise::new(ErrorKind::Parser);
        let outer = Reraise::new(ErrorKind::Build).detail("stage", "compile");

        let err = outer
            .run(|| -> anyhow::Result<()> {
                inner.run(|| -> anyhow::Result<()> { bail!("unexpected `}}`") })?;
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Parser);
        assert_eq!(err.details()["stage"], "compile");
    }
}
