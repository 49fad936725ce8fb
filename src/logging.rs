use crate::config::env::{ENV_LOG_JSON, ENV_LOG_LEVEL, EnvSource, parse_bool};
use anyhow::{Context, Result, anyhow};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*, reload};

type FormatLayer = Box<dyn Layer<Registry> + Send + Sync>;
type FormatHandle = reload::Handle<FormatLayer, Registry>;
type LevelHandle = reload::Handle<EnvFilter, Layered<reload::Layer<FormatLayer, Registry>, Registry>>;

struct Handles {
    format: FormatHandle,
    level: LevelHandle,
}

// Set by the first successful configure_logging call.
static HANDLES: Mutex<Option<Handles>> = Mutex::new(None);

/// Resolved logging options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Structured JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            json: false,
        }
    }
}

impl LogSettings {
    /// Resolve settings from explicit arguments, falling back to the
    /// environment.
    ///
    /// Level precedence: `level` → `debug` (`true` → DEBUG, `false` → INFO)
    /// → `PYSME_LOG_LEVEL` → INFO. JSON mode: `json` → `PYSME_LOG_JSON` → off.
    pub fn resolve(
        level: Option<&str>,
        debug: Option<bool>,
        json: Option<bool>,
        env: &impl EnvSource,
    ) -> Self {
        let level = match (level, debug) {
            (Some(name), _) => parse_level(name),
            (None, Some(true)) => LevelFilter::DEBUG,
            (None, Some(false)) => LevelFilter::INFO,
            (None, None) => env
                .var(ENV_LOG_LEVEL)
                .filter(|name| !name.is_empty())
                .map_or(LevelFilter::INFO, |name| parse_level(&name)),
        };

        let json = json
            .or_else(|| env.var(ENV_LOG_JSON).as_deref().and_then(parse_bool))
            .unwrap_or(false);

        Self { level, json }
    }
}

/// Parse a level name, any case. Unknown names mean INFO.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        "OFF" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn format_layer(json: bool) -> FormatLayer {
    if json {
        fmt::layer::<Registry>()
            .json()
            .with_target(true)
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer::<Registry>()
            .with_target(true)
            .with_writer(std::io::stdout)
            .boxed()
    }
}

fn level_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::new(level.to_string())
}

/// Configure process-wide logging to stdout.
///
/// The first call installs the global subscriber; later calls swap level and
/// formatter in place, so calling this on every config resolution is safe.
///
/// # Errors
///
/// Fails if another global subscriber was installed first, or if a reload
/// handle outlived its subscriber.
pub fn configure_logging(settings: &LogSettings) -> Result<()> {
    let mut handles = HANDLES.lock().unwrap_or_else(PoisonError::into_inner);

    match handles.as_ref() {
        Some(existing) => {
            existing
                .format
                .reload(format_layer(settings.json))
                .map_err(|err| anyhow!("Failed to reload log formatter: {}", err))?;
            existing
                .level
                .reload(level_filter(settings.level))
                .map_err(|err| anyhow!("Failed to reload log level: {}", err))?;
        }
        None => {
            let (format, format_handle) = reload::Layer::new(format_layer(settings.json));
            let (level, level_handle) = reload::Layer::new(level_filter(settings.level));

            tracing_subscriber::registry()
                .with(format)
                .with(level)
                .try_init()
                .context("Failed to install the global log subscriber")?;

            *handles = Some(Handles {
                format: format_handle,
                level: level_handle,
            });
        }
    }

    tracing::debug!(
        "Logging configured: level={}, json={}",
        settings.level,
        settings.json
    );
    Ok(())
}

/// Pretty-print `value` at DEBUG level under `label`.
pub fn debug_dump<T: Debug + ?Sized>(value: &T, label: &str) {
    tracing::debug!("{}:\n{:#?}", label, value);
}
